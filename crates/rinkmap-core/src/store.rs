//! Placed markers for the four rink-diagram boxes.
//!
//! The store keeps each marker's image-relative position as the source
//! of truth and a derived [`ContainerPlacement`] for rendering, which
//! [`MarkerStore::reposition`] recomputes whenever layouts change.

use std::collections::HashMap;

use crate::geometry::{BoxLayout, percent_to_container_percent};
use crate::marker::{Marker, MarkerColor, MarkerRecord, Zone};
use crate::storage::{Storage, StorageError, load_json, save_json};
use crate::types::{BoxId, ContainerPlacement, ImagePoint};

/// Identifier of a placed marker, unique for the store's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(u64);

impl MarkerId {
    /// Raw numeric id, for DOM keys.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// A marker as rendered into a box.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedMarker {
    /// Store-assigned id.
    pub id: MarkerId,
    /// The marker data.
    pub marker: Marker,
    /// Whether clicking the marker removes it.
    pub interactive: bool,
    /// Container-relative placement, `None` until the box has a layout.
    pub placement: Option<ContainerPlacement>,
}

/// Parameters for [`MarkerStore::create`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewMarker {
    /// Target box.
    pub box_id: BoxId,
    /// Requested position; clamped on insertion.
    pub position: ImagePoint,
    /// Palette colour.
    pub color: MarkerColor,
    /// Owning player.
    pub player: Option<String>,
    /// Filtering zone.
    pub zone: Zone,
    /// Whether clicking the marker removes it.
    pub interactive: bool,
}

/// Summary of a [`MarkerStore::restore`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Markers reconstructed.
    pub restored: usize,
    /// Entries dropped as malformed.
    pub skipped: usize,
    /// Entries whose zone had to be derived.
    pub migrated: usize,
}

/// Markers per box.
#[derive(Debug, Clone, Default)]
pub struct MarkerStore {
    boxes: [Vec<PlacedMarker>; 4],
    next_id: u64,
}

impl MarkerStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a marker. Coordinates are clamped to [0, 100] and the
    /// container placement is computed when `layout` is known.
    pub fn create(&mut self, new: NewMarker, layout: Option<&BoxLayout>) -> MarkerId {
        let position = ImagePoint::clamped(new.position.x, new.position.y);
        let id = MarkerId(self.next_id);
        self.next_id += 1;

        let placement = layout.map(|l| percent_to_container_percent(position, l));
        self.boxes[new.box_id.index()].push(PlacedMarker {
            id,
            marker: Marker {
                position,
                color: new.color,
                player: new.player,
                zone: new.zone,
            },
            interactive: new.interactive,
            placement,
        });
        log::debug!(
            "marker {} placed in {} at ({:.2}, {:.2}) {:?}",
            id.0,
            new.box_id,
            position.x,
            position.y,
            new.color
        );
        id
    }

    /// Remove an interactive marker by id. Returns the removed marker,
    /// or `None` if the id is unknown or the marker is not interactive.
    pub fn remove(&mut self, id: MarkerId) -> Option<(BoxId, Marker)> {
        for box_id in BoxId::ALL {
            let list = &mut self.boxes[box_id.index()];
            if let Some(pos) = list.iter().position(|m| m.id == id) {
                if !list[pos].interactive {
                    log::debug!("marker {} is not interactive, ignoring removal", id.0);
                    return None;
                }
                let removed = list.remove(pos);
                return Some((box_id, removed.marker));
            }
        }
        None
    }

    /// Make every marker read-only.
    pub fn lock(&mut self) {
        for placed in self.boxes.iter_mut().flatten() {
            placed.interactive = false;
        }
    }

    /// Remove every marker.
    pub fn clear(&mut self) {
        for list in &mut self.boxes {
            list.clear();
        }
    }

    /// Markers placed in `box_id`, in insertion order.
    #[must_use]
    pub fn markers(&self, box_id: BoxId) -> &[PlacedMarker] {
        &self.boxes[box_id.index()]
    }

    /// Look up a marker by id.
    #[must_use]
    pub fn get(&self, id: MarkerId) -> Option<(BoxId, &PlacedMarker)> {
        BoxId::ALL.into_iter().find_map(|box_id| {
            self.boxes[box_id.index()]
                .iter()
                .find(|m| m.id == id)
                .map(|m| (box_id, m))
        })
    }

    /// Total marker count across all boxes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boxes.iter().map(Vec::len).sum()
    }

    /// Whether no box holds a marker.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boxes.iter().all(Vec::is_empty)
    }

    /// Persisted shape: one record array per box, in box order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Vec<MarkerRecord>> {
        self.boxes
            .iter()
            .map(|list| list.iter().map(|m| m.marker.to_record()).collect())
            .collect()
    }

    /// Write all markers to `key`.
    ///
    /// # Errors
    ///
    /// Propagates [`StorageError`] from the backend.
    pub fn persist(&self, storage: &mut impl Storage, key: &str) -> Result<(), StorageError> {
        save_json(storage, key, &self.snapshot())
    }

    /// Replace the current markers with those persisted under `key`.
    ///
    /// Malformed entries are skipped. Entries without a zone get one
    /// derived via [`classify_zone`](crate::marker::classify_zone) and
    /// the store is written back so the migration sticks. Restored
    /// markers are interactive; placements are left for
    /// [`reposition`](Self::reposition).
    ///
    /// # Errors
    ///
    /// Only the write-back after a migration can fail.
    pub fn restore(
        &mut self,
        storage: &mut impl Storage,
        key: &str,
        threshold: f64,
        malformed_epsilon: f64,
    ) -> Result<RestoreReport, StorageError> {
        self.clear();
        let mut report = RestoreReport::default();
        let Some(raw) = load_json::<Vec<Vec<serde_json::Value>>>(storage, key) else {
            return Ok(report);
        };

        for (index, entries) in raw.into_iter().enumerate() {
            let Some(box_id) = BoxId::from_index(index) else {
                log::warn!("ignoring {} markers for unknown box {index}", entries.len());
                report.skipped += entries.len();
                continue;
            };
            for entry in entries {
                let record = match serde_json::from_value::<MarkerRecord>(entry) {
                    Ok(record) if !record.is_malformed(malformed_epsilon) => record,
                    Ok(record) => {
                        log::warn!("skipping malformed marker in {box_id}: {record:?}");
                        report.skipped += 1;
                        continue;
                    }
                    Err(e) => {
                        log::warn!("skipping undecodable marker in {box_id}: {e}");
                        report.skipped += 1;
                        continue;
                    }
                };
                let (marker, migrated) = record.into_marker(box_id, threshold);
                if migrated {
                    report.migrated += 1;
                }
                self.push_restored(box_id, marker);
                report.restored += 1;
            }
        }

        if report.migrated > 0 {
            log::info!("derived zones for {} legacy markers", report.migrated);
            self.persist(storage, key)?;
        }
        Ok(report)
    }

    fn push_restored(&mut self, box_id: BoxId, marker: Marker) {
        let id = MarkerId(self.next_id);
        self.next_id += 1;
        self.boxes[box_id.index()].push(PlacedMarker {
            id,
            marker,
            interactive: true,
            placement: None,
        });
    }

    /// Recompute container placements from image positions. Boxes
    /// without a layout keep no placement.
    pub fn reposition(&mut self, layouts: &HashMap<BoxId, BoxLayout>) {
        for box_id in BoxId::ALL {
            let layout = layouts.get(&box_id);
            for placed in &mut self.boxes[box_id.index()] {
                placed.placement = layout.map(|l| percent_to_container_percent(placed.marker.position, l));
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::container_percent_to_image_percent;
    use crate::storage::MemoryStorage;
    use crate::types::{Rect, Size};

    const KEY: &str = "goalMapMarkers";

    fn new_marker(box_id: BoxId, x: f64, y: f64) -> NewMarker {
        NewMarker {
            box_id,
            position: ImagePoint::new(x, y),
            color: MarkerColor::Scored,
            player: Some("Diego Warth".into()),
            zone: Zone::Green,
            interactive: true,
        }
    }

    #[test]
    fn create_clamps_coordinates() {
        let mut store = MarkerStore::new();
        let id = store.create(new_marker(BoxId::OffenseField, -5.0, 150.0), None);
        let (_, placed) = store.get(id).unwrap();
        assert!((placed.marker.position.x - 0.0).abs() < f64::EPSILON);
        assert!((placed.marker.position.y - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn remove_only_touches_interactive_markers() {
        let mut store = MarkerStore::new();
        let a = store.create(new_marker(BoxId::OffenseField, 10.0, 10.0), None);
        let b = store.create(
            NewMarker {
                interactive: false,
                ..new_marker(BoxId::OffenseGoal, 20.0, 20.0)
            },
            None,
        );
        assert!(store.remove(b).is_none());
        let (box_id, removed) = store.remove(a).unwrap();
        assert_eq!(box_id, BoxId::OffenseField);
        assert!((removed.position.x - 10.0).abs() < f64::EPSILON);
        assert_eq!(store.len(), 1);
        assert!(store.remove(a).is_none());
    }

    #[test]
    fn persist_restore_round_trip() {
        let mut storage = MemoryStorage::new();
        let mut store = MarkerStore::new();
        store.create(new_marker(BoxId::OffenseField, 40.0, 30.0), None);
        store.create(new_marker(BoxId::DefenseGoal, 55.0, 45.0), None);
        store.persist(&mut storage, KEY).unwrap();

        let mut restored = MarkerStore::new();
        let report = restored.restore(&mut storage, KEY, 50.0, 0.01).unwrap();
        assert_eq!(report, RestoreReport {
            restored: 2,
            skipped: 0,
            migrated: 0
        });
        assert_eq!(restored.snapshot(), store.snapshot());
    }

    #[test]
    fn restore_skips_malformed_and_migrates_legacy() {
        let mut storage = MemoryStorage::new();
        let legacy = r#"[
            [
                {"xPct": 40, "yPct": 70, "color": "grey"},
                {"xPct": 0, "yPct": 0, "color": "green", "zone": "green"},
                {"xPct": "oops", "yPct": 3},
                {"xPct": 20, "yPct": 20, "color": "green", "player": "A", "zone": "green"}
            ],
            [],
            [{"xPct": 50, "yPct": 50, "color": "red"}],
            []
        ]"#;
        storage.set(KEY, legacy).unwrap();

        let mut store = MarkerStore::new();
        let report = store.restore(&mut storage, KEY, 50.0, 0.01).unwrap();
        assert_eq!(report.restored, 3);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.migrated, 2);

        let field = store.markers(BoxId::OffenseField);
        assert_eq!(field[0].marker.zone, Zone::Red);
        assert_eq!(field[1].marker.player.as_deref(), Some("A"));
        // Offense goal box keeps its fixed zone even with a red colour.
        assert_eq!(store.markers(BoxId::OffenseGoal)[0].marker.zone, Zone::Green);

        // The migration was written back with explicit zones.
        let rewritten: Vec<Vec<MarkerRecord>> =
            serde_json::from_str(&storage.get(KEY).unwrap()).unwrap();
        assert!(rewritten.iter().flatten().all(|r| r.zone.is_some()));
        assert_eq!(rewritten.iter().map(Vec::len).sum::<usize>(), 3);
    }

    #[test]
    fn restore_treats_corrupt_json_as_empty() {
        let mut storage = MemoryStorage::new();
        storage.set(KEY, "[[{").unwrap();
        let mut store = MarkerStore::new();
        store.create(new_marker(BoxId::OffenseField, 1.0, 1.0), None);
        let report = store.restore(&mut storage, KEY, 50.0, 0.01).unwrap();
        assert_eq!(report, RestoreReport::default());
        assert!(store.is_empty());
    }

    #[test]
    fn reposition_tracks_layout_changes() {
        let mut store = MarkerStore::new();
        let natural = Some(Size::new(300.0, 200.0));
        let before = BoxLayout::uniform(natural, Rect::new(0.0, 0.0, 900.0, 300.0));
        let id = store.create(new_marker(BoxId::OffenseField, 40.0, 30.0), Some(&before));
        let first = store.get(id).unwrap().1.placement.unwrap();

        let after = BoxLayout {
            natural,
            image_rect: Rect::new(0.0, 0.0, 300.0, 900.0),
            container_rect: Rect::new(0.0, 0.0, 320.0, 940.0),
        };
        let layouts = HashMap::from([(BoxId::OffenseField, after)]);
        store.reposition(&layouts);
        let second = store.get(id).unwrap().1.placement.unwrap();
        assert_ne!(first, second);

        let recovered = container_percent_to_image_percent(second, &after);
        assert!((recovered.x - 40.0).abs() <= 0.5);
        assert!((recovered.y - 30.0).abs() <= 0.5);
    }

    #[test]
    fn locked_markers_cannot_be_removed() {
        let mut store = MarkerStore::new();
        let id = store.create(new_marker(BoxId::OffenseGoal, 50.0, 50.0), None);
        store.lock();
        assert!(!store.get(id).unwrap().1.interactive);
        assert!(store.remove(id).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn reposition_without_layout_clears_placement() {
        let mut store = MarkerStore::new();
        let layout = BoxLayout::uniform(None, Rect::new(0.0, 0.0, 100.0, 100.0));
        let id = store.create(new_marker(BoxId::DefenseField, 10.0, 90.0), Some(&layout));
        store.reposition(&HashMap::new());
        assert!(store.get(id).unwrap().1.placement.is_none());
    }
}
