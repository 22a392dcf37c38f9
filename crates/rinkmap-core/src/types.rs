//! Shared geometric types for the goal map engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lower bound of the percent coordinate space.
pub const PERCENT_MIN: f64 = 0.0;

/// Upper bound of the percent coordinate space.
pub const PERCENT_MAX: f64 = 100.0;

/// A point in image-relative percent space.
///
/// Both axes run from 0 (left/top edge of the natural image content)
/// to 100 (right/bottom edge). This is the single source of truth for
/// marker positions; container placement is always derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImagePoint {
    /// Horizontal position in percent of the image width.
    pub x: f64,
    /// Vertical position in percent of the image height.
    pub y: f64,
}

impl ImagePoint {
    /// Create a new point without clamping.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Create a point with both coordinates clamped to [0, 100].
    ///
    /// Non-finite inputs clamp to 0.
    #[must_use]
    pub fn clamped(x: f64, y: f64) -> Self {
        Self {
            x: clamp_percent(x),
            y: clamp_percent(y),
        }
    }

    /// Returns `true` if both coordinates are finite.
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Clamp a single percent value to [0, 100], mapping NaN to 0.
#[must_use]
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        return PERCENT_MIN;
    }
    value.clamp(PERCENT_MIN, PERCENT_MAX)
}

/// Natural pixel dimensions of an image resource.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Size {
    /// Create a new size.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns `true` if both dimensions are finite and positive.
    #[must_use]
    pub fn is_usable(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// An axis-aligned rectangle in client (viewport) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    #[must_use]
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Right edge.
    #[must_use]
    pub fn right(self) -> f64 {
        self.left + self.width
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(self) -> f64 {
        self.top + self.height
    }

    /// Returns `true` if the point lies inside the rectangle grown by
    /// `tolerance` pixels on every side.
    #[must_use]
    pub fn contains_with_tolerance(self, x: f64, y: f64, tolerance: f64) -> bool {
        x >= self.left - tolerance
            && x <= self.right() + tolerance
            && y >= self.top - tolerance
            && y <= self.bottom() + tolerance
    }
}

/// Placement of a marker relative to its container element, in percent
/// of the container's width and height (CSS `left`/`top`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContainerPlacement {
    /// CSS `left` in percent of the container width.
    pub left_pct: f64,
    /// CSS `top` in percent of the container height.
    pub top_pct: f64,
}

/// One of the four rink-diagram surfaces markers are placed on.
///
/// The discriminant order is the persisted box index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BoxId {
    /// Field diagram used for scoring-side events and workflows.
    OffenseField,
    /// Second field diagram, used for freeform annotation.
    DefenseField,
    /// Net graphic for goals scored.
    OffenseGoal,
    /// Net graphic for goals conceded.
    DefenseGoal,
}

impl BoxId {
    /// All boxes in persisted order.
    pub const ALL: [Self; 4] = [
        Self::OffenseField,
        Self::DefenseField,
        Self::OffenseGoal,
        Self::DefenseGoal,
    ];

    /// Persisted array index of this box.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::OffenseField => 0,
            Self::DefenseField => 1,
            Self::OffenseGoal => 2,
            Self::DefenseGoal => 3,
        }
    }

    /// Box for a persisted array index.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::OffenseField),
            1 => Some(Self::DefenseField),
            2 => Some(Self::OffenseGoal),
            3 => Some(Self::DefenseGoal),
            _ => None,
        }
    }

    /// Returns `true` for the two field diagrams.
    #[must_use]
    pub const fn is_field(self) -> bool {
        matches!(self, Self::OffenseField | Self::DefenseField)
    }

    /// Returns `true` for the two net graphics.
    #[must_use]
    pub const fn is_goal(self) -> bool {
        matches!(self, Self::OffenseGoal | Self::DefenseGoal)
    }

    /// DOM-friendly identifier.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OffenseField => "offense-field",
            Self::DefenseField => "defense-field",
            Self::OffenseGoal => "offense-goal",
            Self::DefenseGoal => "defense-goal",
        }
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
