//! Tunable constants for the goal map engine.
//!
//! Everything the engine treats as a magic number lives here with a
//! default matching the shipped rink graphics. The whole config is
//! serde-friendly so the app can persist overrides.

use serde::{Deserialize, Serialize};

use crate::types::BoxId;

/// Pixel-colour test used to decide whether a goal-box click landed on
/// the interior of the net graphic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum InteriorCheck {
    /// Every channel must be at least `threshold`.
    White {
        /// Minimum per-channel value.
        threshold: u8,
    },
    /// Brightest channel at least `threshold` and the channel spread
    /// at most `max_spread` (rejects tinted near-white pixels).
    #[serde(rename_all = "camelCase")]
    NeutralWhite {
        /// Minimum value of the brightest channel.
        threshold: u8,
        /// Maximum allowed `max - min` across channels.
        max_spread: u8,
    },
}

/// Timer durations for deferred UI decisions, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    /// Window in which a second click counts as a double click.
    pub double_click_ms: u64,
    /// Hold duration that turns a press into a long-press.
    pub long_press_ms: u64,
    /// Debounce applied to window resize before repositioning.
    pub resize_debounce_ms: u64,
    /// Delay before navigating back to the stats page after completion,
    /// so the final marker is visible first.
    pub navigate_delay_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            double_click_ms: 300,
            long_press_ms: 600,
            resize_debounce_ms: 100,
            navigate_delay_ms: 300,
        }
    }
}

/// Weights used by the goal-value function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalValueWeights {
    /// Weight per scored-row bucket (indices 0-3, early to late).
    pub bucket: [f64; 4],
    /// Multiplier for periods whose id starts with `ot`.
    pub overtime: f64,
}

impl Default for GoalValueWeights {
    fn default() -> Self {
        Self {
            bucket: [1.0, 1.0, 1.25, 1.5],
            overtime: 1.5,
        }
    }
}

/// Configuration for a goal map session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalMapConfig {
    /// Vertical split of the field diagrams in percent. Points above
    /// (smaller `y`) are in the green zone.
    pub zone_threshold: f64,

    /// Slack in pixels around the rendered image rectangle that still
    /// counts as a hit.
    pub hit_tolerance_px: f64,

    /// Two markers closer than this on both axes (in percent points)
    /// are duplicates when merging into the season.
    pub dedup_epsilon: f64,

    /// Persisted markers with both coordinates within this distance of
    /// zero are treated as corrupted and skipped on restore.
    pub malformed_epsilon: f64,

    /// Interior test for the offense goal graphic.
    pub offense_goal_check: InteriorCheck,

    /// Interior test for the defense goal graphic.
    pub defense_goal_check: InteriorCheck,

    /// Timer durations.
    pub timing: Timing,

    /// Period identifiers shown in the time-bucket grid, in order.
    pub periods: Vec<String>,

    /// Goal-value weighting.
    pub goal_value: GoalValueWeights,
}

impl Default for GoalMapConfig {
    fn default() -> Self {
        Self {
            zone_threshold: 50.0,
            hit_tolerance_px: 2.0,
            dedup_epsilon: 0.01,
            malformed_epsilon: 0.01,
            offense_goal_check: InteriorCheck::White { threshold: 220 },
            defense_goal_check: InteriorCheck::NeutralWhite {
                threshold: 200,
                max_spread: 30,
            },
            timing: Timing::default(),
            periods: ["p1", "p2", "p3", "ot"].map(String::from).to_vec(),
            goal_value: GoalValueWeights::default(),
        }
    }
}

impl GoalMapConfig {
    /// Interior check for a goal box, `None` for field boxes.
    #[must_use]
    pub const fn interior_check(&self, box_id: BoxId) -> Option<InteriorCheck> {
        match box_id {
            BoxId::OffenseGoal => Some(self.offense_goal_check),
            BoxId::DefenseGoal => Some(self.defense_goal_check),
            BoxId::OffenseField | BoxId::DefenseField => None,
        }
    }
}
