//! Time-bucket counters.
//!
//! Each period has eight buckets. Indices 0-3 form the scored row (time
//! slices of the period in which the team scored), 4-7 the conceded row.
//! Every bucket keeps a count per contributing player.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::storage::{Storage, StorageError, load_json, save_json};

/// Buckets per period.
pub const BUCKETS_PER_PERIOD: u8 = 8;

/// Buckets per row.
pub const BUCKETS_PER_ROW: u8 = BUCKETS_PER_PERIOD / 2;

/// Player name used for counts nobody was selected for.
pub const UNASSIGNED_PLAYER: &str = "Unknown";

/// Which half of a period's bucket grid an index belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Row {
    /// Indices 0-3.
    Scored,
    /// Indices 4-7.
    Conceded,
}

/// Errors parsing a [`BucketKey`] from its `${period}_${index}` form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BucketKeyError {
    /// No `_` separator.
    #[error("bucket key {0:?} has no '_' separator")]
    MissingSeparator(String),

    /// Empty period or a period containing `_`.
    #[error("invalid period id in bucket key {0:?}")]
    InvalidPeriod(String),

    /// Index is not a number below [`BUCKETS_PER_PERIOD`].
    #[error("invalid bucket index in bucket key {0:?}")]
    InvalidIndex(String),
}

/// Address of one bucket: a period id and an index below 8.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    period: String,
    index: u8,
}

impl BucketKey {
    /// Create a key.
    ///
    /// # Errors
    ///
    /// Returns [`BucketKeyError::InvalidPeriod`] for an empty period or
    /// one containing `_`, and [`BucketKeyError::InvalidIndex`] for an
    /// index of 8 or more.
    pub fn new(period: impl Into<String>, index: u8) -> Result<Self, BucketKeyError> {
        let period = period.into();
        if period.is_empty() || period.contains('_') {
            return Err(BucketKeyError::InvalidPeriod(format!("{period}_{index}")));
        }
        if index >= BUCKETS_PER_PERIOD {
            return Err(BucketKeyError::InvalidIndex(format!("{period}_{index}")));
        }
        Ok(Self { period, index })
    }

    /// Period id.
    #[must_use]
    pub fn period(&self) -> &str {
        &self.period
    }

    /// Bucket index within the period.
    #[must_use]
    pub const fn index(&self) -> u8 {
        self.index
    }

    /// Row this bucket belongs to.
    #[must_use]
    pub const fn row(&self) -> Row {
        row_of(self.index)
    }

    /// Position within the row (0-3).
    #[must_use]
    pub const fn slot(&self) -> u8 {
        self.index % BUCKETS_PER_ROW
    }
}

/// Row of a bucket index.
#[must_use]
pub const fn row_of(index: u8) -> Row {
    if index < BUCKETS_PER_ROW {
        Row::Scored
    } else {
        Row::Conceded
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.period, self.index)
    }
}

impl FromStr for BucketKey {
    type Err = BucketKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (period, index) = s
            .rsplit_once('_')
            .ok_or_else(|| BucketKeyError::MissingSeparator(s.to_owned()))?;
        let index = index
            .parse::<u8>()
            .map_err(|_| BucketKeyError::InvalidIndex(s.to_owned()))?;
        Self::new(period, index)
    }
}

/// Wire shape of a ledger: `"p1_3"` -> player -> count.
pub type LedgerWire = BTreeMap<String, BTreeMap<String, u32>>;

/// Flat per-period totals: period -> eight bucket sums.
pub type PeriodTotals = BTreeMap<String, [u32; BUCKETS_PER_PERIOD as usize]>;

/// Counts per bucket per player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeLedger {
    entries: BTreeMap<BucketKey, BTreeMap<String, u32>>,
}

impl TimeLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one to `player`'s count in `key`. Returns the new count.
    pub fn increment(&mut self, key: &BucketKey, player: &str) -> u32 {
        self.add(key, player, 1)
    }

    /// Add `amount` to `player`'s count in `key`. Returns the new count.
    pub fn add(&mut self, key: &BucketKey, player: &str, amount: u32) -> u32 {
        let count = self
            .entries
            .entry(key.clone())
            .or_default()
            .entry(player.to_owned())
            .or_default();
        *count = count.saturating_add(amount);
        *count
    }

    /// Subtract one from `player`'s count in `key`, never going below
    /// zero. Empty entries are pruned. Returns the new count.
    pub fn decrement(&mut self, key: &BucketKey, player: &str) -> u32 {
        let Some(players) = self.entries.get_mut(key) else {
            return 0;
        };
        let Some(count) = players.get_mut(player) else {
            return 0;
        };
        *count = count.saturating_sub(1);
        let remaining = *count;
        if remaining == 0 {
            players.remove(player);
            if players.is_empty() {
                self.entries.remove(key);
            }
        }
        remaining
    }

    /// `player`'s count in `key`.
    #[must_use]
    pub fn count(&self, key: &BucketKey, player: &str) -> u32 {
        self.entries
            .get(key)
            .and_then(|players| players.get(player))
            .copied()
            .unwrap_or(0)
    }

    /// Sum over all players in `key`.
    #[must_use]
    pub fn total(&self, key: &BucketKey) -> u32 {
        self.entries
            .get(key)
            .map_or(0, |players| players.values().sum())
    }

    /// Sum in `key` over players accepted by `include`.
    #[must_use]
    pub fn total_where(&self, key: &BucketKey, include: impl Fn(&str) -> bool) -> u32 {
        self.entries.get(key).map_or(0, |players| {
            players
                .iter()
                .filter(|(name, _)| include(name))
                .map(|(_, count)| count)
                .sum()
        })
    }

    /// Per-player counts in `key`.
    pub fn players(&self, key: &BucketKey) -> impl Iterator<Item = (&str, u32)> {
        self.entries
            .get(key)
            .into_iter()
            .flat_map(|players| players.iter().map(|(name, count)| (name.as_str(), *count)))
    }

    /// Every non-empty bucket.
    pub fn buckets(&self) -> impl Iterator<Item = &BucketKey> {
        self.entries.keys()
    }

    /// Whether every count is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every count.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Add every count of `other` into `self`.
    pub fn merge_additive(&mut self, other: &Self) {
        for (key, players) in &other.entries {
            for (player, &count) in players {
                if count > 0 {
                    self.add(key, player, count);
                }
            }
        }
    }

    /// Sum of all counts.
    #[must_use]
    pub fn grand_total(&self) -> u32 {
        self.entries.values().flat_map(BTreeMap::values).sum()
    }

    /// Wire shape for the per-player storage keys.
    #[must_use]
    pub fn to_wire(&self) -> LedgerWire {
        self.entries
            .iter()
            .map(|(key, players)| (key.to_string(), players.clone()))
            .collect()
    }

    /// Rebuild from the wire shape. Unparsable keys and zero counts are
    /// dropped.
    #[must_use]
    pub fn from_wire(wire: LedgerWire) -> Self {
        let mut ledger = Self::new();
        for (raw_key, players) in wire {
            let key = match raw_key.parse::<BucketKey>() {
                Ok(key) => key,
                Err(e) => {
                    log::warn!("dropping time data entry: {e}");
                    continue;
                }
            };
            for (player, count) in players {
                if count > 0 {
                    ledger.add(&key, &player, count);
                }
            }
        }
        ledger
    }

    /// Load the per-player ledger stored under `key`. Absent or corrupt
    /// data is an empty ledger.
    #[must_use]
    pub fn load(storage: &impl Storage, key: &str) -> Self {
        load_json::<LedgerWire>(storage, key).map_or_else(Self::new, Self::from_wire)
    }

    /// Store the per-player ledger under `players_key` and the flat
    /// per-period totals under `totals_key`.
    ///
    /// # Errors
    ///
    /// Propagates [`StorageError`] from the backend.
    pub fn save(
        &self,
        storage: &mut impl Storage,
        players_key: &str,
        totals_key: &str,
    ) -> Result<(), StorageError> {
        save_json(storage, players_key, &self.to_wire())?;
        save_json(storage, totals_key, &self.flatten())
    }

    /// Bucket totals per period across all players (the legacy
    /// `timeData` shape, also used as season momentum).
    #[must_use]
    pub fn flatten(&self) -> PeriodTotals {
        let mut totals = PeriodTotals::new();
        for (key, players) in &self.entries {
            let row = totals.entry(key.period.clone()).or_default();
            row[usize::from(key.index)] += players.values().sum::<u32>();
        }
        totals
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn key(s: &str) -> BucketKey {
        s.parse().unwrap()
    }

    #[test]
    fn bucket_key_parses_and_displays() {
        let k = key("p1_3");
        assert_eq!(k.period(), "p1");
        assert_eq!(k.index(), 3);
        assert_eq!(k.to_string(), "p1_3");
        assert_eq!(k.row(), Row::Scored);
        assert_eq!(key("ot_6").row(), Row::Conceded);
        assert_eq!(key("ot_6").slot(), 2);
    }

    #[test]
    fn bucket_key_rejects_bad_input() {
        assert!(matches!(
            "p1".parse::<BucketKey>(),
            Err(BucketKeyError::MissingSeparator(_))
        ));
        assert!(matches!(
            "p1_8".parse::<BucketKey>(),
            Err(BucketKeyError::InvalidIndex(_))
        ));
        assert!(matches!(
            "p1_x".parse::<BucketKey>(),
            Err(BucketKeyError::InvalidIndex(_))
        ));
        assert!(matches!(
            "_2".parse::<BucketKey>(),
            Err(BucketKeyError::InvalidPeriod(_))
        ));
        assert!(matches!(
            BucketKey::new("p_1", 2),
            Err(BucketKeyError::InvalidPeriod(_))
        ));
    }

    #[test]
    fn increment_and_decrement_per_player() {
        let mut ledger = TimeLedger::new();
        let k = key("p1_1");
        assert_eq!(ledger.increment(&k, "Diego Warth"), 1);
        assert_eq!(ledger.increment(&k, "Diego Warth"), 2);
        assert_eq!(ledger.increment(&k, "Sam"), 1);
        assert_eq!(ledger.total(&k), 3);
        assert_eq!(ledger.decrement(&k, "Diego Warth"), 1);
        assert_eq!(ledger.count(&k, "Diego Warth"), 1);
    }

    #[test]
    fn decrement_saturates_and_prunes() {
        let mut ledger = TimeLedger::new();
        let k = key("p2_5");
        assert_eq!(ledger.decrement(&k, "Nobody"), 0);
        ledger.increment(&k, "Goalie");
        assert_eq!(ledger.decrement(&k, "Goalie"), 0);
        assert_eq!(ledger.decrement(&k, "Goalie"), 0);
        assert!(ledger.is_empty());
    }

    #[test]
    fn total_where_filters_players() {
        let mut ledger = TimeLedger::new();
        let k = key("p3_6");
        ledger.increment(&k, "G1");
        ledger.increment(&k, "G2");
        ledger.increment(&k, "G2");
        assert_eq!(ledger.total_where(&k, |p| p == "G2"), 2);
        assert_eq!(ledger.total_where(&k, |_| false), 0);
    }

    #[test]
    fn wire_round_trip_drops_bad_keys() {
        let wire: LedgerWire = serde_json::from_str(
            r#"{"p1_1": {"Diego Warth": 2}, "bogus": {"X": 1}, "p2_9": {"Y": 1}, "p2_4": {"Z": 0}}"#,
        )
        .unwrap();
        let ledger = TimeLedger::from_wire(wire);
        assert_eq!(ledger.grand_total(), 2);
        let back = ledger.to_wire();
        assert_eq!(back.len(), 1);
        assert_eq!(back["p1_1"]["Diego Warth"], 2);
    }

    #[test]
    fn flatten_sums_players_per_period() {
        let mut ledger = TimeLedger::new();
        ledger.increment(&key("p1_0"), "A");
        ledger.increment(&key("p1_0"), "B");
        ledger.increment(&key("p1_7"), "G");
        ledger.increment(&key("ot_2"), "A");
        let flat = ledger.flatten();
        assert_eq!(flat["p1"], [2, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(flat["ot"], [0, 0, 1, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn additive_merge_double_counts() {
        let mut season = TimeLedger::new();
        let mut game = TimeLedger::new();
        game.increment(&key("p1_1"), "A");
        season.merge_additive(&game);
        season.merge_additive(&game);
        assert_eq!(season.count(&key("p1_1"), "A"), 2);
    }

    #[test]
    fn save_writes_both_shapes() {
        let mut storage = crate::storage::MemoryStorage::new();
        let mut ledger = TimeLedger::new();
        ledger.increment(&key("p2_6"), "Kim");
        ledger.save(&mut storage, "timeDataWithPlayers", "timeData").unwrap();

        assert_eq!(TimeLedger::load(&storage, "timeDataWithPlayers"), ledger);
        assert_eq!(
            storage.get("timeData").unwrap(),
            r#"{"p2":[0,0,0,0,0,0,1,0]}"#
        );
        assert!(TimeLedger::load(&storage, "missing").is_empty());
    }
}
