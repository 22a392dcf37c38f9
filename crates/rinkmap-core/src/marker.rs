//! Marker entity, its persisted record shape, and zone classification.
//!
//! Live markers carry zone, colour and player as first-class fields.
//! Persisted records may predate the zone tag or store colours as CSS
//! strings, so decoding goes through [`MarkerRecord`] and the layered
//! [`classify_zone`] fallback.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{BoxId, ImagePoint};

/// Closed marker palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerColor {
    /// Green: a goal or shot for the team.
    #[serde(rename = "green")]
    Scored,
    /// Red: a goal or shot against the team.
    #[serde(rename = "red")]
    Conceded,
    /// Grey: part of a multi-step workflow, or a manual override.
    #[serde(rename = "grey")]
    Neutral,
}

impl MarkerColor {
    /// CSS colour used when rendering.
    #[must_use]
    pub const fn css(self) -> &'static str {
        match self {
            Self::Scored => "#00c853",
            Self::Conceded => "#e53935",
            Self::Neutral => "#9e9e9e",
        }
    }

    /// Colour a freeform click in `zone` produces.
    #[must_use]
    pub const fn for_zone(zone: Zone) -> Self {
        match zone {
            Zone::Green => Self::Scored,
            Zone::Red => Self::Conceded,
        }
    }

    /// Decode a colour as written by any version of the app: palette
    /// names, `#rgb` / `#rrggbb` hex, or `rgb()` / `rgba()` functions.
    ///
    /// Hex and functional colours are classified by their dominant
    /// channel. Returns `None` for anything unrecognisable.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "green" | "scored" | "lime" => return Some(Self::Scored),
            "red" | "conceded" => return Some(Self::Conceded),
            "grey" | "gray" | "neutral" => return Some(Self::Neutral),
            _ => {}
        }
        let [r, g, b] = parse_css_rgb(&s)?;
        Self::from_rgb(r, g, b)
    }

    fn from_rgb(r: u8, g: u8, b: u8) -> Option<Self> {
        let (r, g, b) = (i16::from(r), i16::from(g), i16::from(b));
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        if max - min <= 40 {
            Some(Self::Neutral)
        } else if g == max && g - r > 40 {
            Some(Self::Scored)
        } else if r == max && r - g > 40 {
            Some(Self::Conceded)
        } else {
            None
        }
    }
}

/// Parse `#rgb`, `#rrggbb`, `rgb(r, g, b)` or `rgba(r, g, b, a)`.
fn parse_css_rgb(s: &str) -> Option<[u8; 3]> {
    if let Some(hex) = s.strip_prefix('#') {
        return match hex.len() {
            3 => {
                let mut rgb = [0u8; 3];
                for (slot, ch) in rgb.iter_mut().zip(hex.chars()) {
                    let n = u8::try_from(ch.to_digit(16)?).ok()?;
                    *slot = n * 17;
                }
                Some(rgb)
            }
            6 => Some([
                u8::from_str_radix(hex.get(0..2)?, 16).ok()?,
                u8::from_str_radix(hex.get(2..4)?, 16).ok()?,
                u8::from_str_radix(hex.get(4..6)?, 16).ok()?,
            ]),
            _ => None,
        };
    }

    let inner = s
        .strip_prefix("rgba(")
        .or_else(|| s.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let mut parts = inner.split(',').map(str::trim);
    let r = parts.next()?.parse().ok()?;
    let g = parts.next()?.parse().ok()?;
    let b = parts.next()?.parse().ok()?;
    Some([r, g, b])
}

/// Which half of the rink a marker belongs to for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    /// Scoring side: offense field top half and offense goal.
    Green,
    /// Defending side: field bottom half and defense goal.
    Red,
}

impl Zone {
    /// Zone of a field-diagram position. Points strictly above the
    /// threshold are green.
    #[must_use]
    pub fn from_position(y_pct: f64, threshold: f64) -> Self {
        if y_pct < threshold { Self::Green } else { Self::Red }
    }

    /// Fixed zone of a goal box, `None` for field boxes.
    #[must_use]
    pub const fn for_box(id: BoxId) -> Option<Self> {
        match id {
            BoxId::OffenseGoal => Some(Self::Green),
            BoxId::DefenseGoal => Some(Self::Red),
            BoxId::OffenseField | BoxId::DefenseField => None,
        }
    }

    /// Zone of a live click: fixed by the box for nets, by position for
    /// field diagrams.
    #[must_use]
    pub fn of_click(id: BoxId, point: ImagePoint, threshold: f64) -> Self {
        Self::for_box(id).unwrap_or_else(|| Self::from_position(point.y, threshold))
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Green => "green",
            Self::Red => "red",
        })
    }
}

/// Classify a marker's zone, trying in order: the explicit tag, the
/// box identity, the colour, and finally the vertical position.
///
/// Records written before zones were tagged rely on the later steps.
#[must_use]
pub fn classify_zone(
    tag: Option<Zone>,
    id: BoxId,
    color: Option<MarkerColor>,
    y_pct: f64,
    threshold: f64,
) -> Zone {
    if let Some(zone) = tag {
        return zone;
    }
    if let Some(zone) = Zone::for_box(id) {
        return zone;
    }
    match color {
        Some(MarkerColor::Scored) => Zone::Green,
        Some(MarkerColor::Conceded) => Zone::Red,
        Some(MarkerColor::Neutral) | None => Zone::from_position(y_pct, threshold),
    }
}

/// A point annotation on one rink-diagram box.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Image-relative position, clamped to [0, 100].
    pub position: ImagePoint,
    /// Palette colour.
    pub color: MarkerColor,
    /// Roster name of the owning player, if any. Not validated against
    /// the roster.
    pub player: Option<String>,
    /// Filtering zone.
    pub zone: Zone,
}

impl Marker {
    /// `true` if `other` sits within `epsilon` percent points on both
    /// axes and has the same colour, player and zone.
    #[must_use]
    pub fn is_duplicate_of(&self, other: &Self, epsilon: f64) -> bool {
        (self.position.x - other.position.x).abs() < epsilon
            && (self.position.y - other.position.y).abs() < epsilon
            && self.color == other.color
            && self.player == other.player
            && self.zone == other.zone
    }

    /// Persisted form.
    #[must_use]
    pub fn to_record(&self) -> MarkerRecord {
        MarkerRecord {
            x_pct: self.position.x,
            y_pct: self.position.y,
            color: Some(self.color),
            player: self.player.clone(),
            zone: Some(self.zone),
        }
    }
}

/// Persisted marker shape: `{xPct, yPct, color, player, zone}`.
///
/// `color` and `zone` are optional on the way in because older records
/// may lack them or spell colours as CSS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerRecord {
    /// Horizontal image percent.
    pub x_pct: f64,
    /// Vertical image percent.
    pub y_pct: f64,
    /// Palette colour.
    #[serde(default, deserialize_with = "lenient_color")]
    pub color: Option<MarkerColor>,
    /// Owning player.
    #[serde(default)]
    pub player: Option<String>,
    /// Filtering zone.
    #[serde(default, deserialize_with = "lenient_zone")]
    pub zone: Option<Zone>,
}

impl MarkerRecord {
    /// `true` for records that cannot be trusted: non-finite
    /// coordinates, or both coordinates within `epsilon` of zero (the
    /// signature of markers saved before their image had loaded).
    #[must_use]
    pub fn is_malformed(&self, epsilon: f64) -> bool {
        !self.x_pct.is_finite()
            || !self.y_pct.is_finite()
            || (self.x_pct.abs() < epsilon && self.y_pct.abs() < epsilon)
    }

    /// Convert to a live marker, deriving a missing zone. Returns the
    /// marker and whether the zone had to be derived.
    #[must_use]
    pub fn into_marker(self, id: BoxId, threshold: f64) -> (Marker, bool) {
        let migrated = self.zone.is_none();
        let zone = classify_zone(self.zone, id, self.color, self.y_pct, threshold);
        let color = self.color.unwrap_or_else(|| MarkerColor::for_zone(zone));
        let marker = Marker {
            position: ImagePoint::clamped(self.x_pct, self.y_pct),
            color,
            player: self.player.filter(|p| !p.is_empty()),
            zone,
        };
        (marker, migrated)
    }
}

fn lenient_color<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<MarkerColor>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(MarkerColor::parse_lenient))
}

fn lenient_zone<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Zone>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(match raw.as_deref().map(str::trim) {
        Some("green") => Some(Zone::Green),
        Some("red") => Some(Zone::Red),
        _ => None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(json: &str) -> MarkerRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn grey_field_marker_without_zone_falls_back_to_position() {
        let low = classify_zone(None, BoxId::OffenseField, Some(MarkerColor::Neutral), 70.0, 50.0);
        let high = classify_zone(None, BoxId::OffenseField, Some(MarkerColor::Neutral), 30.0, 50.0);
        assert_eq!(low, Zone::Red);
        assert_eq!(high, Zone::Green);
    }

    #[test]
    fn explicit_tag_wins_over_everything() {
        let zone = classify_zone(
            Some(Zone::Green),
            BoxId::DefenseGoal,
            Some(MarkerColor::Conceded),
            90.0,
            50.0,
        );
        assert_eq!(zone, Zone::Green);
    }

    #[test]
    fn box_identity_beats_colour() {
        let zone = classify_zone(None, BoxId::OffenseGoal, Some(MarkerColor::Conceded), 90.0, 50.0);
        assert_eq!(zone, Zone::Green);
    }

    #[test]
    fn colour_beats_position_on_field() {
        let zone = classify_zone(None, BoxId::OffenseField, Some(MarkerColor::Scored), 90.0, 50.0);
        assert_eq!(zone, Zone::Green);
    }

    #[test]
    fn threshold_boundary_is_red() {
        assert_eq!(Zone::from_position(50.0, 50.0), Zone::Red);
        assert_eq!(Zone::from_position(49.99, 50.0), Zone::Green);
    }

    #[test]
    fn lenient_colour_accepts_legacy_spellings() {
        assert_eq!(MarkerColor::parse_lenient("green"), Some(MarkerColor::Scored));
        assert_eq!(MarkerColor::parse_lenient(" GRAY "), Some(MarkerColor::Neutral));
        assert_eq!(MarkerColor::parse_lenient("#00ff66"), Some(MarkerColor::Scored));
        assert_eq!(MarkerColor::parse_lenient("#f00"), Some(MarkerColor::Conceded));
        assert_eq!(MarkerColor::parse_lenient("rgb(128, 128, 128)"), Some(MarkerColor::Neutral));
        assert_eq!(
            MarkerColor::parse_lenient("rgba(220, 20, 60, 0.9)"),
            Some(MarkerColor::Conceded)
        );
        assert_eq!(MarkerColor::parse_lenient("#0000ff"), None);
        assert_eq!(MarkerColor::parse_lenient("chartreuse-ish"), None);
    }

    #[test]
    fn record_without_zone_is_migrated() {
        let rec = record(r#"{"xPct": 40, "yPct": 70, "color": "grey", "player": null}"#);
        let (marker, migrated) = rec.into_marker(BoxId::OffenseField, 50.0);
        assert!(migrated);
        assert_eq!(marker.zone, Zone::Red);
        assert_eq!(marker.color, MarkerColor::Neutral);
    }

    #[test]
    fn record_with_css_colour_and_no_zone() {
        let rec = record(r##"{"xPct": 40, "yPct": 70, "color": "#00c853"}"##);
        let (marker, migrated) = rec.into_marker(BoxId::OffenseField, 50.0);
        assert!(migrated);
        assert_eq!(marker.zone, Zone::Green);
        assert_eq!(marker.color, MarkerColor::Scored);
    }

    #[test]
    fn unknown_colour_is_derived_from_zone() {
        let rec = record(r#"{"xPct": 40, "yPct": 20, "color": "mauve", "zone": "red"}"#);
        let (marker, migrated) = rec.into_marker(BoxId::DefenseField, 50.0);
        assert!(!migrated);
        assert_eq!(marker.color, MarkerColor::Conceded);
    }

    #[test]
    fn malformed_records_are_detected() {
        let zeroish = MarkerRecord {
            x_pct: 0.001,
            y_pct: 0.0,
            color: None,
            player: None,
            zone: None,
        };
        assert!(zeroish.is_malformed(0.01));
        let nan = MarkerRecord {
            x_pct: f64::NAN,
            ..zeroish.clone()
        };
        assert!(nan.is_malformed(0.01));
        let fine = MarkerRecord {
            x_pct: 0.0,
            y_pct: 12.0,
            ..zeroish
        };
        assert!(!fine.is_malformed(0.01));
    }

    #[test]
    fn live_marker_serialises_with_all_fields() {
        let marker = Marker {
            position: ImagePoint::new(40.0, 30.0),
            color: MarkerColor::Neutral,
            player: Some("Diego Warth".into()),
            zone: Zone::Green,
        };
        let json = serde_json::to_string(&marker.to_record()).unwrap();
        assert_eq!(
            json,
            r#"{"xPct":40.0,"yPct":30.0,"color":"grey","player":"Diego Warth","zone":"green"}"#
        );
    }

    #[test]
    fn duplicates_need_matching_attributes() {
        let a = Marker {
            position: ImagePoint::new(40.0, 30.0),
            color: MarkerColor::Scored,
            player: Some("A".into()),
            zone: Zone::Green,
        };
        let mut b = a.clone();
        b.position.x += 0.005;
        assert!(a.is_duplicate_of(&b, 0.01));
        b.player = None;
        assert!(!a.is_duplicate_of(&b, 0.01));
        let mut c = a.clone();
        c.position.y += 0.02;
        assert!(!a.is_duplicate_of(&c, 0.01));
    }
}
