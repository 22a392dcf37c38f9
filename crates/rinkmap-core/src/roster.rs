//! Roster, stat increments and the goal-value function.

use serde::{Deserialize, Serialize};

use crate::config::GoalValueWeights;
use crate::ledger::{BucketKey, Row, TimeLedger};
use crate::storage::{Storage, StorageError, load_json, save_json};

/// Roster position marking a goalie.
pub const GOALIE_POSITION: &str = "G";

/// One player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Display name, also the key markers and ledger entries refer to.
    pub name: String,
    /// Free-form position; `"G"` is a goalie.
    #[serde(default)]
    pub position: String,
}

impl RosterEntry {
    /// Create an entry.
    #[must_use]
    pub fn new(name: impl Into<String>, position: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: position.into(),
        }
    }

    /// Whether this player is a goalie.
    #[must_use]
    pub fn is_goalie(&self) -> bool {
        self.position.trim().eq_ignore_ascii_case(GOALIE_POSITION)
    }
}

/// Ordered team roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster {
    /// Players in display order.
    pub entries: Vec<RosterEntry>,
}

impl Roster {
    /// Create a roster.
    #[must_use]
    pub const fn new(entries: Vec<RosterEntry>) -> Self {
        Self { entries }
    }

    /// Goalie names in roster order.
    pub fn goalies(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| e.is_goalie())
            .map(|e| e.name.as_str())
    }

    /// Non-goalie names in roster order.
    pub fn skaters(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| !e.is_goalie())
            .map(|e| e.name.as_str())
    }

    /// Whether `name` is on the roster.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// Add a player. Blank or duplicate names are ignored; returns
    /// whether the roster changed.
    pub fn add(&mut self, entry: RosterEntry) -> bool {
        let name = entry.name.trim();
        if name.is_empty() || self.contains(name) {
            return false;
        }
        self.entries.push(RosterEntry::new(name, entry.position.trim()));
        true
    }

    /// Remove a player by name. Markers and ledger entries naming them
    /// are left alone.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.name != name);
        self.entries.len() != before
    }

    /// Load from storage; absent or corrupt data is an empty roster.
    #[must_use]
    pub fn load(storage: &impl Storage, key: &str) -> Self {
        load_json(storage, key).unwrap_or_default()
    }

    /// Persist to storage.
    ///
    /// # Errors
    ///
    /// Propagates [`StorageError`] from the backend.
    pub fn save(&self, storage: &mut impl Storage, key: &str) -> Result<(), StorageError> {
        save_json(storage, key, self)
    }
}

/// A stats-table column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatCategory {
    /// Goals column; `+1` starts a goal workflow.
    Goals,
    /// Shots column; `+1` starts a shot workflow.
    Shot,
    /// Any other column.
    Other(String),
}

impl StatCategory {
    /// Column name as shown in the stats table.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Goals => "Goals",
            Self::Shot => "Shot",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for StatCategory {
    fn from(name: &str) -> Self {
        match name {
            "Goals" => Self::Goals,
            "Shot" => Self::Shot,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// A change to one stats-table cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatIncrement {
    /// Player whose row changed.
    pub player: String,
    /// Column that changed.
    pub category: StatCategory,
    /// Signed change.
    pub delta: i32,
}

/// Weight of one goal recorded in `key`. Conceded-row buckets are worth
/// nothing.
#[must_use]
pub fn goal_value(key: &BucketKey, weights: &GoalValueWeights) -> f64 {
    if key.row() != Row::Scored {
        return 0.0;
    }
    let base = weights.bucket[usize::from(key.slot())];
    if key.period().starts_with("ot") {
        base * weights.overtime
    } else {
        base
    }
}

/// Weighted goal total for `player` over every bucket in `ledger`.
#[must_use]
pub fn player_goal_value(ledger: &TimeLedger, player: &str, weights: &GoalValueWeights) -> f64 {
    ledger
        .buckets()
        .map(|key| f64::from(ledger.count(key, player)) * goal_value(key, weights))
        .sum()
}
