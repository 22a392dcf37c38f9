//! The goal map: every engine component wired to one storage backend.
//!
//! [`GoalMap`] is what the UI talks to. It owns the marker store, the
//! workflow, the gesture recognizer, the ledger, the filters and the
//! colour samplers, routes pointer and bucket input through them, and
//! persists after every mutation. Anything the UI has to do in response
//! (change page, show an alert) comes back as an [`Effect`].

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::config::GoalMapConfig;
use crate::filter::{FilterState, GoalieFilter, ScorerFilter};
use crate::geometry::{BoxLayout, to_image_percent};
use crate::gesture::{Gesture, GestureEvent, GestureRecognizer};
use crate::ledger::{BUCKETS_PER_PERIOD, BucketKey, Row, TimeLedger, UNASSIGNED_PLAYER};
use crate::marker::{MarkerColor, Zone};
use crate::roster::{Roster, StatCategory, StatIncrement};
use crate::sampler::{ColorSampler, ImageKey, SamplerCache, SamplerError};
use crate::season::{ExportReport, SeasonAccumulator, SeasonData, SeasonKeys};
use crate::storage::{CURRENT_TEAM_KEY, Key, Namespace, Storage, StorageError, load_json};
use crate::store::{MarkerId, MarkerStore, NewMarker, PlacedMarker, RestoreReport};
use crate::types::{BoxId, ImagePoint};
use crate::workflow::{Click, EventType, Progress, Rejection, StepAction, Workflow, WorkflowStatus};

/// Alert shown when a defense-zone action needs a goalie and none is
/// selected.
pub const NO_GOALIE_ALERT: &str = "Select a single goalie before recording against the defense.";

/// Pages the app can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    /// Per-player stats table.
    Stats,
    /// Rink diagram and time buckets.
    GoalMap,
    /// Season totals.
    Season,
}

impl Page {
    /// Page name used for navigation.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Stats => "stats",
            Self::GoalMap => "goalMap",
            Self::Season => "season",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Something the UI must do after an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Show `page` after `delay_ms`.
    Navigate {
        /// Target page.
        page: Page,
        /// Delay before switching, so the last marker is seen.
        delay_ms: u64,
    },
    /// Show a blocking message; the action did not happen.
    Alert(String),
}

/// Result of an input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Effects to perform, in order.
    pub effects: Vec<Effect>,
    /// Whether engine state changed and the view must be refreshed.
    pub changed: bool,
}

impl Outcome {
    fn updated() -> Self {
        Self {
            effects: Vec::new(),
            changed: true,
        }
    }

    fn alert(message: impl Into<String>) -> Self {
        Self {
            effects: vec![Effect::Alert(message.into())],
            changed: false,
        }
    }

    fn merge(&mut self, other: Self) {
        self.effects.extend(other.effects);
        self.changed |= other.changed;
    }

    fn storage_failed(&mut self, err: &StorageError) {
        log::error!("failed to save goal map state: {err}");
        self.effects
            .push(Effect::Alert(format!("Could not save goal map data: {err}")));
    }

    /// Whether nothing happened.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        !self.changed && self.effects.is_empty()
    }
}

/// Direction of a bucket click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketAction {
    /// Add one.
    Increment,
    /// Remove one, stopping at zero.
    Decrement,
}

fn interior_check(
    config: &GoalMapConfig,
    samplers: &SamplerCache,
    images: &HashMap<BoxId, ImageKey>,
    box_id: BoxId,
    point: ImagePoint,
) -> Result<bool, SamplerError> {
    let Some(check) = config.interior_check(box_id) else {
        return Ok(true);
    };
    let key = images.get(&box_id).ok_or(SamplerError::Unavailable)?;
    Ok(samplers.get(key)?.passes(check, point))
}

/// The live goal map for the current team.
#[derive(Debug)]
pub struct GoalMap<S: Storage> {
    config: GoalMapConfig,
    storage: S,
    namespace: Namespace,
    store: MarkerStore,
    workflow: Workflow,
    gestures: GestureRecognizer,
    ledger: TimeLedger,
    filters: FilterState,
    samplers: SamplerCache,
    images: HashMap<BoxId, ImageKey>,
    layouts: HashMap<BoxId, BoxLayout>,
    season: SeasonAccumulator,
}

impl<S: Storage> GoalMap<S> {
    /// Create an empty goal map for the team recorded in `storage`.
    /// Call [`load`](Self::load) to restore persisted state.
    #[must_use]
    pub fn new(config: GoalMapConfig, storage: S) -> Self {
        let namespace = Namespace::current(&storage);
        let workflow = Workflow::new(config.zone_threshold);
        let gestures = GestureRecognizer::new(&config.timing);
        let season = SeasonAccumulator::new(
            config.zone_threshold,
            config.dedup_epsilon,
            config.malformed_epsilon,
        );
        Self {
            config,
            storage,
            namespace,
            store: MarkerStore::new(),
            workflow,
            gestures,
            ledger: TimeLedger::new(),
            filters: FilterState::default(),
            samplers: SamplerCache::new(),
            images: HashMap::new(),
            layouts: HashMap::new(),
            season,
        }
    }

    /// Restore markers, ledger and filters from storage. Any workflow or
    /// pending gesture is dropped.
    ///
    /// # Errors
    ///
    /// Fails only if a migration write-back fails.
    pub fn load(&mut self) -> Result<RestoreReport, StorageError> {
        self.workflow.cancel();
        self.gestures.reset();

        let markers_key = self.namespace.key(Key::GoalMapMarkers);
        let report = self.store.restore(
            &mut self.storage,
            &markers_key,
            self.config.zone_threshold,
            self.config.malformed_epsilon,
        )?;
        self.store.reposition(&self.layouts);

        self.ledger = self.load_ledger()?;
        self.filters = FilterState::load(
            &self.storage,
            &self.namespace.key(Key::PlayerFilter),
            &self.namespace.key(Key::ActiveGoalie),
        );

        log::info!(
            "goal map loaded for {}: {} markers ({} skipped, {} migrated), {} counts",
            self.namespace.team().unwrap_or("default team"),
            report.restored,
            report.skipped,
            report.migrated,
            self.ledger.grand_total()
        );
        Ok(report)
    }

    /// Per-player counts, or the legacy flat totals credited to
    /// [`UNASSIGNED_PLAYER`] when only those exist.
    fn load_ledger(&mut self) -> Result<TimeLedger, StorageError> {
        let players_key = self.namespace.key(Key::TimeDataWithPlayers);
        if self.storage.get(&players_key).is_some() {
            return Ok(TimeLedger::load(&self.storage, &players_key));
        }

        let totals_key = self.namespace.key(Key::TimeData);
        let Some(totals) = load_json::<HashMap<String, Vec<u32>>>(&self.storage, &totals_key) else {
            return Ok(TimeLedger::new());
        };
        let mut ledger = TimeLedger::new();
        for (period, counts) in totals {
            for (index, count) in (0..BUCKETS_PER_PERIOD).zip(counts) {
                if count == 0 {
                    continue;
                }
                match BucketKey::new(period.as_str(), index) {
                    Ok(key) => {
                        ledger.add(&key, UNASSIGNED_PLAYER, count);
                    }
                    Err(e) => log::warn!("dropping legacy time data: {e}"),
                }
            }
        }
        log::info!("migrated {} legacy bucket counts", ledger.grand_total());
        ledger.save(&mut self.storage, &players_key, &totals_key)?;
        Ok(ledger)
    }

    /// Switch to another team and load its data. `None` or `"default"`
    /// selects the default team.
    ///
    /// # Errors
    ///
    /// Propagates [`StorageError`] from the backend.
    pub fn set_team(&mut self, team: Option<&str>) -> Result<RestoreReport, StorageError> {
        self.namespace = Namespace::for_team(team);
        match self.namespace.team() {
            Some(team) => {
                let team = team.to_owned();
                self.storage.set(CURRENT_TEAM_KEY, &team)?;
            }
            None => self.storage.remove(CURRENT_TEAM_KEY),
        }
        self.load()
    }

    /// Engine configuration.
    #[must_use]
    pub const fn config(&self) -> &GoalMapConfig {
        &self.config
    }

    /// Storage backend.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Mutable storage backend.
    pub const fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Key namespace of the current team.
    #[must_use]
    pub const fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// All markers, unfiltered.
    #[must_use]
    pub const fn markers(&self) -> &MarkerStore {
        &self.store
    }

    /// Live bucket counts, unfiltered.
    #[must_use]
    pub const fn ledger(&self) -> &TimeLedger {
        &self.ledger
    }

    /// Current filters.
    #[must_use]
    pub const fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// Status-indicator snapshot.
    #[must_use]
    pub fn status(&self) -> WorkflowStatus {
        self.workflow.status()
    }

    /// Whether a goal or shot is being recorded.
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.workflow.is_active()
    }

    /// Team roster.
    #[must_use]
    pub fn roster(&self) -> Roster {
        Roster::load(&self.storage, &self.namespace.key(Key::Roster))
    }

    /// Persist the team roster.
    ///
    /// # Errors
    ///
    /// Propagates [`StorageError`] from the backend.
    pub fn save_roster(&mut self, roster: &Roster) -> Result<(), StorageError> {
        let key = self.namespace.key(Key::Roster);
        roster.save(&mut self.storage, &key)
    }

    /// A stats-table cell changed. `+1` on Goals or Shot starts the
    /// matching workflow for that player and asks for the goal map page.
    pub fn on_stat_increment(&mut self, increment: &StatIncrement, roster: &Roster) -> Outcome {
        if increment.delta != 1 {
            return Outcome::default();
        }
        let event_type = match increment.category {
            StatCategory::Goals => EventType::Goal,
            StatCategory::Shot => EventType::Shot,
            StatCategory::Other(_) => return Outcome::default(),
        };
        if !roster.entries.is_empty() && !roster.contains(&increment.player) {
            log::warn!("ignoring stat increment for unknown player {:?}", increment.player);
            return Outcome::default();
        }
        self.gestures.reset();
        self.workflow.start(increment.player.as_str(), event_type);
        Outcome {
            effects: vec![Effect::Navigate {
                page: Page::GoalMap,
                delay_ms: 0,
            }],
            changed: true,
        }
    }

    /// Abandon the workflow in progress.
    pub fn cancel_workflow(&mut self) -> Outcome {
        if !self.workflow.is_active() {
            return Outcome::default();
        }
        self.workflow.cancel();
        Outcome::updated()
    }

    /// Record the rendered geometry of a box and re-place its markers.
    pub fn set_layout(&mut self, box_id: BoxId, layout: BoxLayout) {
        self.layouts.insert(box_id, layout);
        self.store.reposition(&self.layouts);
    }

    /// Rendered geometry of a box, if known.
    #[must_use]
    pub fn layout(&self, box_id: BoxId) -> Option<&BoxLayout> {
        self.layouts.get(&box_id)
    }

    /// Re-place every marker from its image position.
    pub fn reposition(&mut self) {
        self.store.reposition(&self.layouts);
    }

    /// Associate `box_id` with an image resource and, the first time
    /// that resource is seen, its rasterisation result.
    pub fn register_sampler(
        &mut self,
        box_id: BoxId,
        key: ImageKey,
        sampler: Result<ColorSampler, SamplerError>,
    ) {
        self.images.insert(box_id, key.clone());
        self.samplers.insert(key, sampler);
    }

    /// Associate `box_id` with an image resource, rasterising it with
    /// `build` only the first time that resource is seen.
    pub fn register_image(
        &mut self,
        box_id: BoxId,
        key: ImageKey,
        build: impl FnOnce() -> Result<ColorSampler, SamplerError>,
    ) {
        // Build failures are cached and logged by the cache.
        let _ = self.samplers.get_or_build(&key, build);
        self.images.insert(box_id, key);
    }

    /// Whether a sampler for `key` still has to be built.
    #[must_use]
    pub fn needs_sampler(&self, key: &ImageKey) -> bool {
        !self.samplers.contains(key)
    }

    fn hit(&self, box_id: BoxId, client_x: f64, client_y: f64) -> Option<ImagePoint> {
        let Some(layout) = self.layouts.get(&box_id) else {
            log::debug!("{box_id} has no layout yet, ignoring pointer");
            return None;
        };
        let hit = to_image_percent(client_x, client_y, layout, self.config.hit_tolerance_px);
        if hit.inside {
            Some(hit.point)
        } else {
            log::debug!("{box_id}: {}", Rejection::OutsideImage);
            None
        }
    }

    /// Pointer went down at client pixel coordinates over `box_id`.
    ///
    /// Coordinates are mapped through the last [`set_layout`](Self::set_layout)
    /// for the box; callers re-measure before each pointer event.
    pub fn press(&mut self, now: Duration, box_id: BoxId, client_x: f64, client_y: f64) -> Outcome {
        let Some(point) = self.hit(box_id, client_x, client_y) else {
            return self.leave(now);
        };
        let eligible = box_id == BoxId::OffenseField
            && !self.workflow.is_active()
            && Zone::from_position(point.y, self.config.zone_threshold) == Zone::Red;
        let events = self.gestures.press(now, box_id, point, eligible);
        self.dispatch(events)
    }

    /// Pointer came up at client pixel coordinates over `box_id`.
    pub fn release(&mut self, now: Duration, box_id: BoxId, client_x: f64, client_y: f64) -> Outcome {
        let Some(point) = self.hit(box_id, client_x, client_y) else {
            return self.leave(now);
        };
        let events = self.gestures.release(now, box_id, point);
        self.dispatch(events)
    }

    /// Pointer left the box or the touch was cancelled.
    pub fn leave(&mut self, now: Duration) -> Outcome {
        let events = self.gestures.leave(now);
        self.dispatch(events)
    }

    /// Timer wake-up; commits gestures whose deadline has passed.
    pub fn tick(&mut self, now: Duration) -> Outcome {
        let events = self.gestures.tick(now);
        self.dispatch(events)
    }

    /// When [`tick`](Self::tick) should next be called.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.gestures.next_deadline()
    }

    fn dispatch(&mut self, events: Vec<GestureEvent>) -> Outcome {
        let mut outcome = Outcome::default();
        for event in events {
            outcome.merge(self.click_box(event.box_id, event.point, event.gesture));
        }
        outcome
    }

    /// Handle a recognised gesture at an image-relative point.
    pub fn click_box(&mut self, box_id: BoxId, point: ImagePoint, gesture: Gesture) -> Outcome {
        let point = ImagePoint::clamped(point.x, point.y);
        match gesture {
            Gesture::LongPress => self.long_press(box_id, point),
            Gesture::Single | Gesture::Double if self.workflow.is_active() => {
                self.workflow_click(Click::Box { box_id, point })
            }
            Gesture::Single => self.freeform(box_id, point, false),
            Gesture::Double => self.freeform(box_id, point, true),
        }
    }

    fn long_press(&mut self, box_id: BoxId, point: ImagePoint) -> Outcome {
        let zone = Zone::of_click(box_id, point, self.config.zone_threshold);
        if box_id != BoxId::OffenseField || zone != Zone::Red || self.workflow.is_active() {
            log::debug!("long-press on {box_id} ({zone} zone) ignored");
            return Outcome::default();
        }
        let Some(goalie) = self.filters.active_goalie().map(str::to_owned) else {
            return Outcome::alert(NO_GOALIE_ALERT);
        };
        self.workflow.start(goalie, EventType::Goal);
        Outcome::updated()
    }

    fn workflow_click(&mut self, click: Click<'_>) -> Outcome {
        let config = &self.config;
        let samplers = &self.samplers;
        let images = &self.images;
        let progress = match self.workflow.accept(click, |box_id, point| {
            interior_check(config, samplers, images, box_id, point)
        }) {
            Ok(progress) => progress,
            Err(rejection) => {
                log::debug!("click rejected: {rejection}");
                return Outcome::default();
            }
        };

        let mut outcome = Outcome::updated();
        let (action, completion) = match progress {
            Progress::Advanced(action) => (action, None),
            Progress::Completed(action, completion) => (action, Some(completion)),
        };
        self.apply(action, &mut outcome);
        if completion.is_some_and(|c| c.navigates_back()) {
            outcome.effects.push(Effect::Navigate {
                page: Page::Stats,
                delay_ms: self.config.timing.navigate_delay_ms,
            });
        }
        outcome
    }

    fn apply(&mut self, action: StepAction, outcome: &mut Outcome) {
        match action {
            StepAction::Place {
                box_id,
                position,
                color,
                zone,
                player,
            } => {
                self.place(
                    NewMarker {
                        box_id,
                        position,
                        color,
                        player: Some(player),
                        zone,
                        interactive: true,
                    },
                    outcome,
                );
            }
            StepAction::Tally { key, player } => {
                self.ledger.increment(&key, &player);
                self.save_ledger(outcome);
            }
        }
    }

    fn freeform(&mut self, box_id: BoxId, point: ImagePoint, double: bool) -> Outcome {
        match interior_check(&self.config, &self.samplers, &self.images, box_id, point) {
            Ok(true) => {}
            Ok(false) => {
                log::debug!("{box_id}: {}", Rejection::NotInterior);
                return Outcome::default();
            }
            Err(e) => {
                log::debug!("{box_id}: {}", Rejection::SamplerUnavailable(e));
                return Outcome::default();
            }
        }

        let zone = Zone::of_click(box_id, point, self.config.zone_threshold);
        let color = if double && box_id.is_field() {
            MarkerColor::Neutral
        } else {
            MarkerColor::for_zone(zone)
        };
        let player = match zone {
            Zone::Green => self.filters.scorer.player().map(str::to_owned),
            Zone::Red => match self.filters.active_goalie() {
                Some(goalie) => Some(goalie.to_owned()),
                None if color == MarkerColor::Neutral => None,
                None => return Outcome::alert(NO_GOALIE_ALERT),
            },
        };

        let mut outcome = Outcome::updated();
        self.place(
            NewMarker {
                box_id,
                position: point,
                color,
                player,
                zone,
                interactive: true,
            },
            &mut outcome,
        );
        outcome
    }

    fn place(&mut self, new: NewMarker, outcome: &mut Outcome) {
        let layout = self.layouts.get(&new.box_id);
        self.store.create(new, layout);
        self.save_markers(outcome);
    }

    /// Click on a time bucket.
    pub fn click_bucket(&mut self, key: &BucketKey, action: BucketAction) -> Outcome {
        if self.workflow.is_active() {
            if action == BucketAction::Decrement {
                log::debug!("bucket {key} decrement ignored while recording");
                return Outcome::default();
            }
            return self.workflow_click(Click::Bucket(key));
        }

        let player = match key.row() {
            Row::Scored => self.filters.scorer.player(),
            Row::Conceded => self.filters.active_goalie(),
        }
        .unwrap_or(UNASSIGNED_PLAYER)
        .to_owned();

        match action {
            BucketAction::Increment => {
                self.ledger.increment(key, &player);
            }
            BucketAction::Decrement => {
                if self.ledger.count(key, &player) == 0 {
                    log::debug!("bucket {key} has nothing for {player}");
                    return Outcome::default();
                }
                self.ledger.decrement(key, &player);
            }
        }
        let mut outcome = Outcome::updated();
        self.save_ledger(&mut outcome);
        outcome
    }

    /// Click on a marker: removes it if it is interactive. Ignored while
    /// a workflow is recording, since its markers belong to that event.
    pub fn click_marker(&mut self, id: MarkerId) -> Outcome {
        if self.workflow.is_active() {
            log::debug!("marker click ignored while recording");
            return Outcome::default();
        }
        let Some((box_id, marker)) = self.store.remove(id) else {
            return Outcome::default();
        };
        log::debug!(
            "removed {:?} marker from {box_id} at ({:.2}, {:.2})",
            marker.color,
            marker.position.x,
            marker.position.y
        );
        let mut outcome = Outcome::updated();
        self.save_markers(&mut outcome);
        outcome
    }

    fn save_markers(&mut self, outcome: &mut Outcome) {
        let key = self.namespace.key(Key::GoalMapMarkers);
        if let Err(e) = self.store.persist(&mut self.storage, &key) {
            outcome.storage_failed(&e);
        }
    }

    fn save_ledger(&mut self, outcome: &mut Outcome) {
        let players_key = self.namespace.key(Key::TimeDataWithPlayers);
        let totals_key = self.namespace.key(Key::TimeData);
        if let Err(e) = self.ledger.save(&mut self.storage, &players_key, &totals_key) {
            outcome.storage_failed(&e);
        }
    }

    fn save_filters(&mut self) -> Result<(), StorageError> {
        let scorer_key = self.namespace.key(Key::PlayerFilter);
        let goalie_key = self.namespace.key(Key::ActiveGoalie);
        self.filters.save(&mut self.storage, &scorer_key, &goalie_key)
    }

    /// Select whose green-zone markers and scored buckets are shown.
    ///
    /// # Errors
    ///
    /// Propagates [`StorageError`] from the backend.
    pub fn set_scorer_filter(&mut self, filter: ScorerFilter) -> Result<(), StorageError> {
        self.filters.scorer = filter;
        self.save_filters()
    }

    /// Select whose red-zone markers and conceded buckets are shown.
    ///
    /// # Errors
    ///
    /// Propagates [`StorageError`] from the backend.
    pub fn set_goalie_filter(&mut self, filter: GoalieFilter) -> Result<(), StorageError> {
        self.filters.goalie = filter;
        self.save_filters()
    }

    /// Markers of `box_id` that pass the filters.
    pub fn visible_markers(&self, box_id: BoxId) -> impl Iterator<Item = &PlacedMarker> {
        self.store
            .markers(box_id)
            .iter()
            .filter(|placed| self.filters.is_visible(&placed.marker))
    }

    /// Count shown for a bucket under the filters.
    #[must_use]
    pub fn bucket_display(&self, key: &BucketKey) -> u32 {
        self.filters.display_count(&self.ledger, key)
    }

    /// Merge this game into the season. Returns `None` if a season
    /// update was already running.
    ///
    /// # Errors
    ///
    /// Propagates [`StorageError`] from the backend.
    pub fn export_to_season(&mut self) -> Result<Option<ExportReport>, StorageError> {
        let keys = SeasonKeys::new(&self.namespace);
        self.season
            .export_to_season(&self.store, &self.ledger, &mut self.storage, &keys)
    }

    /// Season record for display, with momentum re-derived. Returns
    /// `None` if a season update was already running.
    ///
    /// # Errors
    ///
    /// Propagates [`StorageError`] from the backend.
    pub fn season_data(&mut self) -> Result<Option<SeasonData>, StorageError> {
        let keys = SeasonKeys::new(&self.namespace);
        self.season.recompute(&mut self.storage, &keys)
    }

    /// Delete the season record.
    pub fn reset_season(&mut self) {
        let keys = SeasonKeys::new(&self.namespace);
        self.season.reset_season(&mut self.storage, &keys);
    }

    /// Clear the live game: markers, counts and any workflow.
    pub fn reset_game(&mut self) -> Outcome {
        self.workflow.cancel();
        self.gestures.reset();
        self.store.clear();
        self.ledger.clear();
        let mut outcome = Outcome::updated();
        self.save_markers(&mut outcome);
        self.save_ledger(&mut outcome);
        log::info!("game reset");
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::types::Rect;

    fn map() -> GoalMap<MemoryStorage> {
        GoalMap::new(GoalMapConfig::default(), MemoryStorage::new())
    }

    fn key(s: &str) -> BucketKey {
        s.parse().unwrap()
    }

    #[test]
    fn freeform_field_clicks_follow_zone() {
        let mut m = map();
        m.set_scorer_filter(ScorerFilter::Player("Sam".into())).unwrap();

        let out = m.click_box(BoxId::OffenseField, ImagePoint::new(20.0, 20.0), Gesture::Single);
        assert!(out.changed);
        let placed = &m.markers().markers(BoxId::OffenseField)[0];
        assert_eq!(placed.marker.color, MarkerColor::Scored);
        assert_eq!(placed.marker.player.as_deref(), Some("Sam"));

        let out = m.click_box(BoxId::OffenseField, ImagePoint::new(20.0, 80.0), Gesture::Single);
        assert_eq!(out.effects, vec![Effect::Alert(NO_GOALIE_ALERT.into())]);
        assert_eq!(m.markers().len(), 1);

        m.set_goalie_filter(GoalieFilter::single("Kim")).unwrap();
        m.click_box(BoxId::OffenseField, ImagePoint::new(20.0, 80.0), Gesture::Single);
        let placed = &m.markers().markers(BoxId::OffenseField)[1];
        assert_eq!(placed.marker.color, MarkerColor::Conceded);
        assert_eq!(placed.marker.player.as_deref(), Some("Kim"));
    }

    #[test]
    fn double_click_places_grey_without_goalie() {
        let mut m = map();
        let out = m.click_box(BoxId::OffenseField, ImagePoint::new(20.0, 80.0), Gesture::Double);
        assert!(out.changed);
        let placed = &m.markers().markers(BoxId::OffenseField)[0];
        assert_eq!(placed.marker.color, MarkerColor::Neutral);
        assert_eq!(placed.marker.zone, Zone::Red);
    }

    #[test]
    fn goal_box_freeform_needs_sampler() {
        let mut m = map();
        let out = m.click_box(BoxId::OffenseGoal, ImagePoint::new(50.0, 50.0), Gesture::Single);
        assert!(out.is_noop());
        assert!(m.markers().is_empty());
    }

    #[test]
    fn freeform_bucket_credits_filters_or_unknown() {
        let mut m = map();
        m.click_bucket(&key("p1_0"), BucketAction::Increment);
        assert_eq!(m.ledger().count(&key("p1_0"), UNASSIGNED_PLAYER), 1);

        m.set_goalie_filter(GoalieFilter::single("Kim")).unwrap();
        m.click_bucket(&key("p1_4"), BucketAction::Increment);
        assert_eq!(m.ledger().count(&key("p1_4"), "Kim"), 1);

        assert!(m.click_bucket(&key("p1_5"), BucketAction::Decrement).is_noop());
        m.click_bucket(&key("p1_4"), BucketAction::Decrement);
        assert_eq!(m.ledger().total(&key("p1_4")), 0);
        assert_eq!(
            m.storage().get("timeData").unwrap(),
            r#"{"p1":[1,0,0,0,0,0,0,0]}"#
        );
    }

    #[test]
    fn shared_image_is_rasterised_once() {
        let mut m = map();
        let mut builds = 0;
        for box_id in [BoxId::OffenseGoal, BoxId::DefenseGoal] {
            m.register_image(box_id, ImageKey::new("net.svg"), || {
                builds += 1;
                Err(SamplerError::Tainted("SecurityError".into()))
            });
        }
        assert_eq!(builds, 1);
        assert!(!m.needs_sampler(&ImageKey::new("net.svg")));
        // Both boxes resolve to the cached failure and fail closed.
        let check = interior_check(
            &m.config,
            &m.samplers,
            &m.images,
            BoxId::DefenseGoal,
            ImagePoint::new(50.0, 50.0),
        );
        assert_eq!(check, Err(SamplerError::Tainted("SecurityError".into())));
    }

    #[test]
    fn marker_click_removes_and_persists() {
        let mut m = map();
        m.click_box(BoxId::OffenseField, ImagePoint::new(20.0, 20.0), Gesture::Single);
        let id = m.markers().markers(BoxId::OffenseField)[0].id;
        assert!(m.click_marker(id).changed);
        assert!(m.markers().is_empty());
        assert_eq!(m.storage().get("goalMapMarkers").unwrap(), "[[],[],[],[]]");
        assert!(m.click_marker(id).is_noop());
    }

    #[test]
    fn pointer_input_goes_through_layout() {
        let mut m = map();
        let ms = Duration::from_millis;
        // No layout yet: ignored.
        assert!(m.release(ms(0), BoxId::OffenseField, 50.0, 50.0).is_noop());

        m.set_layout(
            BoxId::OffenseField,
            BoxLayout::uniform(None, Rect::new(0.0, 0.0, 200.0, 100.0)),
        );
        assert!(m.release(ms(0), BoxId::OffenseField, 300.0, 50.0).is_noop());
        assert!(m.release(ms(10), BoxId::OffenseField, 100.0, 20.0).is_noop());
        assert_eq!(m.next_deadline(), Some(ms(310)));
        let out = m.tick(ms(310));
        assert!(out.changed);
        let placed = &m.markers().markers(BoxId::OffenseField)[0];
        assert!((placed.marker.position.x - 50.0).abs() < 1e-9);
        assert!((placed.marker.position.y - 20.0).abs() < 1e-9);
        assert!(placed.placement.is_some());
    }

    #[test]
    fn team_switch_uses_prefixed_keys() {
        let mut m = map();
        m.click_box(BoxId::OffenseField, ImagePoint::new(20.0, 20.0), Gesture::Single);
        m.set_team(Some("U13")).unwrap();
        assert!(m.markers().is_empty());
        m.click_box(BoxId::OffenseField, ImagePoint::new(30.0, 30.0), Gesture::Single);
        assert!(m.storage().get("U13:goalMapMarkers").is_some());
        assert_eq!(m.storage().get(CURRENT_TEAM_KEY).as_deref(), Some("U13"));

        m.set_team(None).unwrap();
        assert_eq!(m.markers().len(), 1);
        assert!(m.storage().get(CURRENT_TEAM_KEY).is_none());
    }

    #[test]
    fn legacy_flat_time_data_is_migrated() {
        let mut storage = MemoryStorage::new();
        storage.set("timeData", r#"{"p2":[0,3,0,0,0,0,1,0]}"#).unwrap();
        let mut m = GoalMap::new(GoalMapConfig::default(), storage);
        m.load().unwrap();
        assert_eq!(m.ledger().count(&key("p2_1"), UNASSIGNED_PLAYER), 3);
        assert_eq!(m.ledger().total(&key("p2_6")), 1);
        assert!(m.storage().get("timeDataWithPlayers").is_some());
    }

    #[test]
    fn stat_increment_starts_workflow() {
        let mut m = map();
        let roster = Roster::default();
        let shot = StatIncrement {
            player: "Sam".into(),
            category: StatCategory::Shot,
            delta: 1,
        };
        let out = m.on_stat_increment(&shot, &roster);
        assert_eq!(
            out.effects,
            vec![Effect::Navigate {
                page: Page::GoalMap,
                delay_ms: 0
            }]
        );
        assert_eq!(m.status().to_string(), "Shot · Sam · 0/1");

        let undo = StatIncrement { delta: -1, ..shot };
        assert!(m.on_stat_increment(&undo, &roster).is_noop());
        let pim = StatIncrement {
            player: "Sam".into(),
            category: StatCategory::Other("PIM".into()),
            delta: 1,
        };
        assert!(m.on_stat_increment(&pim, &roster).is_noop());
        assert!(m.cancel_workflow().changed);
        assert!(!m.is_recording());
    }
}
