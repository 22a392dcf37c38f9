//! Season-level accumulation of game data.
//!
//! Exporting a game merges its markers into the season set with
//! near-duplicate suppression, so repeated exports of the same game are
//! idempotent for markers. Time counts are added, so re-exporting a
//! game counts its buckets twice. Momentum (per-period bucket totals
//! across players) is always derived fresh from the merged ledger.

use std::cell::Cell;

use crate::ledger::{PeriodTotals, TimeLedger};
use crate::storage::{Key, Namespace, Storage, StorageError, save_json};
use crate::store::{MarkerStore, NewMarker};
use crate::types::BoxId;

/// Storage keys of the season record for one team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonKeys {
    /// Season markers, one array per box.
    pub markers: String,
    /// Momentum, flat per-period totals.
    pub time_data: String,
    /// Per-player bucket counts.
    pub time_data_with_players: String,
}

impl SeasonKeys {
    /// Keys for the team selected by `namespace`.
    #[must_use]
    pub fn new(namespace: &Namespace) -> Self {
        Self {
            markers: namespace.key(Key::SeasonMapMarkers),
            time_data: namespace.key(Key::SeasonMapTimeData),
            time_data_with_players: namespace.key(Key::SeasonMapTimeDataWithPlayers),
        }
    }
}

/// Season markers and counts, as loaded for display.
#[derive(Debug, Clone, Default)]
pub struct SeasonData {
    /// Accumulated markers.
    pub markers: MarkerStore,
    /// Accumulated per-player counts.
    pub ledger: TimeLedger,
    /// Per-period totals derived from `ledger`.
    pub momentum: PeriodTotals,
}

/// What an export changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Game markers appended to the season.
    pub added: usize,
    /// Game markers dropped as near-duplicates.
    pub duplicates: usize,
    /// Persisted season markers dropped while loading.
    pub skipped: usize,
    /// Counts added to the season ledger.
    pub tallies: u32,
}

/// Per-period bucket totals across all players.
#[must_use]
pub fn momentum(ledger: &TimeLedger) -> PeriodTotals {
    ledger.flatten()
}

/// Append every marker of `game` not already present in `season`.
/// Returns `(added, duplicates)`.
///
/// A marker is a duplicate when an existing one in the same box lies
/// within `epsilon` on both axes with equal colour, player and zone.
pub fn merge_markers(season: &mut MarkerStore, game: &MarkerStore, epsilon: f64) -> (usize, usize) {
    let mut added = 0;
    let mut duplicates = 0;
    for box_id in BoxId::ALL {
        for placed in game.markers(box_id) {
            let candidate = &placed.marker;
            let exists = season
                .markers(box_id)
                .iter()
                .any(|m| m.marker.is_duplicate_of(candidate, epsilon));
            if exists {
                duplicates += 1;
                continue;
            }
            season.create(
                NewMarker {
                    box_id,
                    position: candidate.position,
                    color: candidate.color,
                    player: candidate.player.clone(),
                    zone: candidate.zone,
                    interactive: false,
                },
                None,
            );
            added += 1;
        }
    }
    (added, duplicates)
}

/// Merges games into the season record.
///
/// Holds an in-progress flag: a call made while another is running is
/// dropped with a warning rather than queued.
#[derive(Debug)]
pub struct SeasonAccumulator {
    in_progress: Cell<bool>,
    zone_threshold: f64,
    dedup_epsilon: f64,
    malformed_epsilon: f64,
}

/// Clears the in-progress flag on drop.
#[derive(Debug)]
pub struct SeasonGuard<'a>(&'a Cell<bool>);

impl Drop for SeasonGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl SeasonAccumulator {
    /// Create an accumulator.
    #[must_use]
    pub const fn new(zone_threshold: f64, dedup_epsilon: f64, malformed_epsilon: f64) -> Self {
        Self {
            in_progress: Cell::new(false),
            zone_threshold,
            dedup_epsilon,
            malformed_epsilon,
        }
    }

    /// Take the in-progress flag, or `None` if it is already held.
    #[must_use]
    pub fn try_begin(&self) -> Option<SeasonGuard<'_>> {
        if self.in_progress.replace(true) {
            return None;
        }
        Some(SeasonGuard(&self.in_progress))
    }

    /// Whether a season operation is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_progress.get()
    }

    /// Load the season record. Also returns how many persisted markers
    /// were dropped as malformed.
    ///
    /// # Errors
    ///
    /// Only a zone migration write-back can fail.
    pub fn load(
        &self,
        storage: &mut impl Storage,
        keys: &SeasonKeys,
    ) -> Result<(SeasonData, usize), StorageError> {
        let mut markers = MarkerStore::new();
        let report = markers.restore(storage, &keys.markers, self.zone_threshold, self.malformed_epsilon)?;
        markers.lock();
        let ledger = TimeLedger::load(storage, &keys.time_data_with_players);
        let momentum = momentum(&ledger);
        Ok((
            SeasonData {
                markers,
                ledger,
                momentum,
            },
            report.skipped,
        ))
    }

    /// Merge a game into the season and persist all three season keys.
    /// Returns `None` if another season operation is in progress.
    ///
    /// # Errors
    ///
    /// Propagates [`StorageError`] from the backend.
    pub fn export_to_season(
        &self,
        game_markers: &MarkerStore,
        game_ledger: &TimeLedger,
        storage: &mut impl Storage,
        keys: &SeasonKeys,
    ) -> Result<Option<ExportReport>, StorageError> {
        let Some(_guard) = self.try_begin() else {
            log::warn!("season export skipped: another season update is in progress");
            return Ok(None);
        };

        let (mut season, skipped) = self.load(storage, keys)?;
        let (added, duplicates) = merge_markers(&mut season.markers, game_markers, self.dedup_epsilon);
        season.ledger.merge_additive(game_ledger);

        season.markers.persist(storage, &keys.markers)?;
        season
            .ledger
            .save(storage, &keys.time_data_with_players, &keys.time_data)?;

        let report = ExportReport {
            added,
            duplicates,
            skipped,
            tallies: game_ledger.grand_total(),
        };
        log::info!(
            "exported game to season: {} markers added, {} duplicates, {} counts",
            report.added,
            report.duplicates,
            report.tallies
        );
        Ok(Some(report))
    }

    /// Reload the season record for display and re-save the momentum
    /// derived from it. Returns `None` if another season operation is in
    /// progress.
    ///
    /// # Errors
    ///
    /// Propagates [`StorageError`] from the backend.
    pub fn recompute(
        &self,
        storage: &mut impl Storage,
        keys: &SeasonKeys,
    ) -> Result<Option<SeasonData>, StorageError> {
        let Some(_guard) = self.try_begin() else {
            log::warn!("season recompute skipped: already in progress");
            return Ok(None);
        };
        let (season, _) = self.load(storage, keys)?;
        save_json(storage, &keys.time_data, &season.momentum)?;
        log::debug!(
            "season recomputed: {} markers, {} counts",
            season.markers.len(),
            season.ledger.grand_total()
        );
        Ok(Some(season))
    }

    /// Delete the season record.
    pub fn reset_season(&self, storage: &mut impl Storage, keys: &SeasonKeys) {
        storage.remove(&keys.markers);
        storage.remove(&keys.time_data);
        storage.remove(&keys.time_data_with_players);
        log::info!("season data reset");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ledger::BucketKey;
    use crate::marker::{MarkerColor, Zone};
    use crate::storage::MemoryStorage;
    use crate::types::ImagePoint;

    fn accumulator() -> SeasonAccumulator {
        SeasonAccumulator::new(50.0, 0.01, 0.01)
    }

    fn keys() -> SeasonKeys {
        SeasonKeys::new(&Namespace::default())
    }

    fn add(store: &mut MarkerStore, box_id: BoxId, x: f64, y: f64, player: &str) {
        store.create(
            NewMarker {
                box_id,
                position: ImagePoint::new(x, y),
                color: MarkerColor::Scored,
                player: Some(player.into()),
                zone: Zone::Green,
                interactive: true,
            },
            None,
        );
    }

    fn game() -> (MarkerStore, TimeLedger) {
        let mut markers = MarkerStore::new();
        add(&mut markers, BoxId::OffenseField, 40.0, 30.0, "Diego Warth");
        add(&mut markers, BoxId::OffenseGoal, 50.0, 50.0, "Diego Warth");
        let mut ledger = TimeLedger::new();
        ledger.increment(&"p1_1".parse::<BucketKey>().unwrap(), "Diego Warth");
        (markers, ledger)
    }

    #[test]
    fn keys_follow_namespace() {
        let k = SeasonKeys::new(&Namespace::for_team(Some("U13")));
        assert_eq!(k.markers, "U13:seasonMapMarkers");
        assert_eq!(k.time_data, "U13:seasonMapTimeData");
        assert_eq!(keys().time_data_with_players, "seasonMapTimeDataWithPlayers");
    }

    #[test]
    fn marker_export_is_idempotent() {
        let acc = accumulator();
        let mut storage = MemoryStorage::new();
        let (markers, ledger) = game();

        let first = acc
            .export_to_season(&markers, &ledger, &mut storage, &keys())
            .unwrap()
            .unwrap();
        assert_eq!((first.added, first.duplicates), (2, 0));

        let second = acc
            .export_to_season(&markers, &ledger, &mut storage, &keys())
            .unwrap()
            .unwrap();
        assert_eq!((second.added, second.duplicates), (0, 2));

        let (season, _) = acc.load(&mut storage, &keys()).unwrap();
        assert_eq!(season.markers.len(), 2);
        assert!(
            BoxId::ALL
                .into_iter()
                .flat_map(|b| season.markers.markers(b))
                .all(|m| !m.interactive)
        );
        // Counts are additive across exports.
        assert_eq!(season.ledger.total(&"p1_1".parse().unwrap()), 2);
        assert_eq!(season.momentum["p1"][1], 2);
    }

    #[test]
    fn different_games_add_only_new_markers() {
        let acc = accumulator();
        let mut storage = MemoryStorage::new();
        let (markers, ledger) = game();
        acc.export_to_season(&markers, &ledger, &mut storage, &keys()).unwrap();

        let mut other = MarkerStore::new();
        add(&mut other, BoxId::OffenseField, 40.005, 30.005, "Diego Warth");
        add(&mut other, BoxId::OffenseField, 40.0, 30.0, "Sam");
        add(&mut other, BoxId::DefenseField, 40.0, 30.0, "Diego Warth");
        let report = acc
            .export_to_season(&other, &TimeLedger::new(), &mut storage, &keys())
            .unwrap()
            .unwrap();
        assert_eq!((report.added, report.duplicates), (2, 1));
    }

    #[test]
    fn reentrant_calls_are_dropped() {
        let acc = accumulator();
        let mut storage = MemoryStorage::new();
        let (markers, ledger) = game();

        let guard = acc.try_begin().unwrap();
        assert!(acc.is_busy());
        assert!(acc.recompute(&mut storage, &keys()).unwrap().is_none());
        assert!(
            acc.export_to_season(&markers, &ledger, &mut storage, &keys())
                .unwrap()
                .is_none()
        );
        assert!(storage.is_empty());
        drop(guard);

        assert!(!acc.is_busy());
        assert!(acc.recompute(&mut storage, &keys()).unwrap().is_some());
    }

    #[test]
    fn recompute_rewrites_momentum() {
        let acc = accumulator();
        let mut storage = MemoryStorage::new();
        storage
            .set("seasonMapTimeDataWithPlayers", r#"{"p2_5":{"Kim":2,"Lee":1},"bogus":{"x":1}}"#)
            .unwrap();
        storage.set("seasonMapTimeData", "stale").unwrap();

        let season = acc.recompute(&mut storage, &keys()).unwrap().unwrap();
        assert_eq!(season.momentum["p2"][5], 3);
        assert_eq!(storage.get("seasonMapTimeData").unwrap(), r#"{"p2":[0,0,0,0,0,3,0,0]}"#);
    }

    #[test]
    fn reset_clears_all_season_keys() {
        let acc = accumulator();
        let mut storage = MemoryStorage::new();
        let (markers, ledger) = game();
        acc.export_to_season(&markers, &ledger, &mut storage, &keys()).unwrap();
        assert_eq!(storage.len(), 3);
        acc.reset_season(&mut storage, &keys());
        assert!(storage.is_empty());
    }
}
