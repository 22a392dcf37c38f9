//! Key-value persistence boundary.
//!
//! The engine never talks to the browser directly. It reads and writes
//! JSON strings through the [`Storage`] trait; `rinkmap-io` implements
//! it on top of `localStorage`, tests use [`MemoryStorage`].

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Errors raised while writing persisted state.
///
/// Reads never fail: a missing or corrupt value is treated as absent.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The value could not be serialized to JSON.
    #[error("failed to serialize value: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The storage backend rejected the write (e.g. quota exceeded).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// String key-value store.
pub trait Storage {
    /// Read the raw value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if the backend rejects the write.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key` if present.
    fn remove(&mut self, key: &str);
}

/// In-memory [`Storage`] backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStorage {
    values: BTreeMap<String, String>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }
}

/// Logical persisted records, each mapped to a storage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Live game markers, one array per box.
    GoalMapMarkers,
    /// Live game bucket totals per period (legacy flat shape).
    TimeData,
    /// Live game bucket counts per player.
    TimeDataWithPlayers,
    /// Season markers.
    SeasonMapMarkers,
    /// Season momentum (bucket totals per period).
    SeasonMapTimeData,
    /// Season bucket counts per player.
    SeasonMapTimeDataWithPlayers,
    /// Selected scorer filter.
    PlayerFilter,
    /// Selected goalie filter.
    ActiveGoalie,
    /// Team roster.
    Roster,
}

impl Key {
    /// Unprefixed storage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::GoalMapMarkers => "goalMapMarkers",
            Self::TimeData => "timeData",
            Self::TimeDataWithPlayers => "timeDataWithPlayers",
            Self::SeasonMapMarkers => "seasonMapMarkers",
            Self::SeasonMapTimeData => "seasonMapTimeData",
            Self::SeasonMapTimeDataWithPlayers => "seasonMapTimeDataWithPlayers",
            Self::PlayerFilter => "goalMapPlayerFilter",
            Self::ActiveGoalie => "goalMapActiveGoalie",
            Self::Roster => "roster",
        }
    }
}

/// Storage key holding the selected team id. Never namespaced.
pub const CURRENT_TEAM_KEY: &str = "currentTeam";

/// Maps logical keys to storage keys for the current team.
///
/// The default team uses the bare key names so data written before
/// teams existed stays readable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespace {
    team: Option<String>,
}

impl Namespace {
    /// Namespace for `team`; empty or `"default"` map to bare keys.
    #[must_use]
    pub fn for_team(team: Option<&str>) -> Self {
        let team = team
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != "default")
            .map(str::to_owned);
        Self { team }
    }

    /// Read the current team from storage.
    #[must_use]
    pub fn current(storage: &impl Storage) -> Self {
        Self::for_team(storage.get(CURRENT_TEAM_KEY).as_deref())
    }

    /// The team id, `None` for the default team.
    #[must_use]
    pub fn team(&self) -> Option<&str> {
        self.team.as_deref()
    }

    /// Full storage key for `key`.
    #[must_use]
    pub fn key(&self, key: Key) -> String {
        match &self.team {
            Some(team) => format!("{team}:{}", key.name()),
            None => key.name().to_owned(),
        }
    }
}

/// Read and decode a JSON value. Missing keys and corrupt JSON both
/// yield `None`; corruption is logged.
#[must_use]
pub fn load_json<T: DeserializeOwned>(storage: &impl Storage, key: &str) -> Option<T> {
    let raw = storage.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("ignoring corrupt value under {key:?}: {e}");
            None
        }
    }
}

/// Encode a value as JSON and store it.
///
/// # Errors
///
/// Returns [`StorageError::Serialize`] if encoding fails and
/// [`StorageError::Backend`] if the write is rejected.
pub fn save_json<T: Serialize + ?Sized>(
    storage: &mut impl Storage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let json = serde_json::to_string(value)?;
    storage.set(key, &json)
}
