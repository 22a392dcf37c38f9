//! Scorer and goalie visibility masks.
//!
//! The two filters are orthogonal: the scorer filter only ever hides
//! green-zone markers and scored-row buckets, the goalie filter only
//! red-zone markers and conceded-row buckets. Neither mutates stored
//! markers or counts.

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::ledger::{BucketKey, Row, TimeLedger};
use crate::marker::{Marker, Zone};
use crate::storage::{Storage, StorageError, load_json, save_json};

/// Which scorer's green-zone markers are shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScorerFilter {
    /// Show every green-zone marker.
    #[default]
    All,
    /// Show only markers owned by this player.
    Player(String),
}

impl ScorerFilter {
    /// Whether a marker owned by `player` passes.
    #[must_use]
    pub fn admits(&self, player: Option<&str>) -> bool {
        match self {
            Self::All => true,
            Self::Player(selected) => player == Some(selected.as_str()),
        }
    }

    /// The selected player, if any.
    #[must_use]
    pub fn player(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Player(name) => Some(name.as_str()),
        }
    }
}

/// Which goalies' red-zone markers are shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GoalieFilter {
    /// Show every red-zone marker.
    #[default]
    All,
    /// Show only markers owned by one of these goalies.
    Goalies(BTreeSet<String>),
}

impl GoalieFilter {
    /// Filter for a single goalie.
    #[must_use]
    pub fn single(name: impl Into<String>) -> Self {
        Self::Goalies(BTreeSet::from([name.into()]))
    }

    /// Whether a marker owned by `player` passes.
    #[must_use]
    pub fn admits(&self, player: Option<&str>) -> bool {
        match self {
            Self::All => true,
            Self::Goalies(set) => player.is_some_and(|p| set.contains(p)),
        }
    }
}

/// Both filters together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    /// Mask over green-zone markers and scored-row buckets.
    pub scorer: ScorerFilter,
    /// Mask over red-zone markers and conceded-row buckets.
    pub goalie: GoalieFilter,
}

/// `goalMapActiveGoalie` is a JSON array of names; older builds stored a
/// bare string.
#[derive(Deserialize)]
#[serde(untagged)]
enum GoalieWire {
    Many(Vec<String>),
    One(String),
}

impl FilterState {
    /// Whether `marker` is shown under the current filters.
    #[must_use]
    pub fn is_visible(&self, marker: &Marker) -> bool {
        let player = marker.player.as_deref();
        match marker.zone {
            Zone::Green => self.scorer.admits(player),
            Zone::Red => self.goalie.admits(player),
        }
    }

    /// Count shown for a bucket: the scored row honours the scorer
    /// filter, the conceded row the goalie filter.
    #[must_use]
    pub fn display_count(&self, ledger: &TimeLedger, key: &BucketKey) -> u32 {
        match key.row() {
            Row::Scored => match &self.scorer {
                ScorerFilter::All => ledger.total(key),
                ScorerFilter::Player(name) => ledger.count(key, name),
            },
            Row::Conceded => match &self.goalie {
                GoalieFilter::All => ledger.total(key),
                GoalieFilter::Goalies(set) => ledger.total_where(key, |p| set.contains(p)),
            },
        }
    }

    /// Goalie credited with defense-zone actions: present only when
    /// exactly one goalie is selected.
    #[must_use]
    pub fn active_goalie(&self) -> Option<&str> {
        match &self.goalie {
            GoalieFilter::Goalies(set) if set.len() == 1 => set.iter().next().map(String::as_str),
            _ => None,
        }
    }

    /// Load both filters. Absent or corrupt values mean "All".
    #[must_use]
    pub fn load(storage: &impl Storage, scorer_key: &str, goalie_key: &str) -> Self {
        let scorer = load_json::<String>(storage, scorer_key)
            .filter(|name| !name.is_empty())
            .map_or(ScorerFilter::All, ScorerFilter::Player);

        let goalies: BTreeSet<String> = match load_json::<GoalieWire>(storage, goalie_key) {
            Some(GoalieWire::Many(names)) => names.into_iter().filter(|n| !n.is_empty()).collect(),
            Some(GoalieWire::One(name)) if !name.is_empty() => BTreeSet::from([name]),
            _ => BTreeSet::new(),
        };
        let goalie = if goalies.is_empty() {
            GoalieFilter::All
        } else {
            GoalieFilter::Goalies(goalies)
        };
        Self { scorer, goalie }
    }

    /// Persist both filters; "All" removes the key.
    ///
    /// # Errors
    ///
    /// Propagates [`StorageError`] from the backend.
    pub fn save(
        &self,
        storage: &mut impl Storage,
        scorer_key: &str,
        goalie_key: &str,
    ) -> Result<(), StorageError> {
        match &self.scorer {
            ScorerFilter::All => storage.remove(scorer_key),
            ScorerFilter::Player(name) => save_json(storage, scorer_key, name)?,
        }
        match &self.goalie {
            GoalieFilter::All => storage.remove(goalie_key),
            GoalieFilter::Goalies(set) => save_json(storage, goalie_key, set)?,
        }
        Ok(())
    }
}
