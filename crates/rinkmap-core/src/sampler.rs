//! Point colour queries on rasterised rink graphics.
//!
//! The net graphics have a white interior surrounded by posts, crossbar
//! and background art. A goal-box click only counts when the pixel under
//! it passes the box's [`InteriorCheck`]. Samplers are built once per
//! image resource and memoised in a [`SamplerCache`] keyed by a stable
//! [`ImageKey`].
//!
//! A sampler that could not be built stays cached as an error, and every
//! query through the cache then answers `false`: placement fails closed.

use std::collections::HashMap;
use std::fmt;

use image::{Rgba, RgbaImage};

use crate::config::InteriorCheck;
use crate::types::{ImagePoint, clamp_percent};

/// Errors that can occur while building a [`ColorSampler`].
///
/// `Clone` so a failed build can be memoised alongside successful ones.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SamplerError {
    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The decoded image has no pixels.
    #[error("image has zero width or height")]
    Empty,

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// The browser refused to expose pixel data (cross-origin taint).
    #[error("pixel data unavailable (tainted canvas): {0}")]
    Tainted(String),

    /// No sampler has been registered for the requested image.
    #[error("no sampler registered for this image")]
    Unavailable,
}

impl From<image::ImageError> for SamplerError {
    fn from(err: image::ImageError) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Rasterised image answering per-pixel colour predicates.
#[derive(Debug, Clone)]
pub struct ColorSampler {
    image: RgbaImage,
}

impl ColorSampler {
    /// Wrap an already rasterised RGBA bitmap.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::Empty`] if the bitmap has no pixels.
    pub fn from_rgba(image: RgbaImage) -> Result<Self, SamplerError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(SamplerError::Empty);
        }
        Ok(Self { image })
    }

    /// Decode image bytes (PNG, JPEG, BMP, WebP) at natural resolution.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::EmptyInput`] if `bytes` is empty,
    /// [`SamplerError::Decode`] if the data is not a supported image, and
    /// [`SamplerError::Empty`] if it decodes to zero pixels.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SamplerError> {
        if bytes.is_empty() {
            return Err(SamplerError::EmptyInput);
        }
        let decoded = image::load_from_memory(bytes)?;
        Self::from_rgba(decoded.to_rgba8())
    }

    /// Natural width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Natural height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Pixel under an image-relative percent position.
    ///
    /// 100 % maps to the last row/column rather than one past it.
    #[must_use]
    pub fn pixel_at(&self, point: ImagePoint) -> Rgba<u8> {
        let x = percent_to_pixel(point.x, self.image.width());
        let y = percent_to_pixel(point.y, self.image.height());
        *self.image.get_pixel(x, y)
    }

    /// `true` if every colour channel is at least `threshold`.
    #[must_use]
    pub fn is_white_at(&self, point: ImagePoint, threshold: u8) -> bool {
        let Rgba([r, g, b, _]) = self.pixel_at(point);
        r >= threshold && g >= threshold && b >= threshold
    }

    /// `true` if the brightest channel is at least `threshold` and the
    /// channels differ by at most `max_spread`.
    ///
    /// Separates white and light grey from tinted near-white pixels such
    /// as the pale blue of painted ice.
    #[must_use]
    pub fn is_neutral_white_at(&self, point: ImagePoint, threshold: u8, max_spread: u8) -> bool {
        let Rgba([r, g, b, _]) = self.pixel_at(point);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        max >= threshold && max - min <= max_spread
    }

    /// Apply a configured interior check at `point`.
    #[must_use]
    pub fn passes(&self, check: InteriorCheck, point: ImagePoint) -> bool {
        match check {
            InteriorCheck::White { threshold } => self.is_white_at(point, threshold),
            InteriorCheck::NeutralWhite {
                threshold,
                max_spread,
            } => self.is_neutral_white_at(point, threshold, max_spread),
        }
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn percent_to_pixel(percent: f64, extent: u32) -> u32 {
    let scaled = (clamp_percent(percent) / 100.0 * f64::from(extent)).floor();
    (scaled as u32).min(extent.saturating_sub(1))
}

/// Stable identifier of an image resource (its URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageKey(String);

impl ImageKey {
    /// Create a key from a resource identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Memoised samplers, one per image resource.
#[derive(Debug, Default)]
pub struct SamplerCache {
    entries: HashMap<ImageKey, Result<ColorSampler, SamplerError>>,
}

impl SamplerCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a build result (success or failure) is cached for `key`.
    #[must_use]
    pub fn contains(&self, key: &ImageKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Return the cached result for `key`, building it with `build` on
    /// first use. Later calls never rebuild, even after a failure.
    pub fn get_or_build(
        &mut self,
        key: &ImageKey,
        build: impl FnOnce() -> Result<ColorSampler, SamplerError>,
    ) -> Result<&ColorSampler, &SamplerError> {
        let entry = self.entries.entry(key.clone()).or_insert_with(|| {
            let built = build();
            if let Err(ref e) = built {
                log::warn!("colour sampler for {key} is invalid: {e}");
            }
            built
        });
        entry.as_ref()
    }

    /// Record a build result computed elsewhere (e.g. after an image
    /// `load` event). The first recorded result for a key wins.
    pub fn insert(&mut self, key: ImageKey, result: Result<ColorSampler, SamplerError>) {
        if let Err(ref e) = result {
            log::warn!("colour sampler for {key} is invalid: {e}");
        }
        self.entries.entry(key).or_insert(result);
    }

    /// Look up a sampler.
    ///
    /// # Errors
    ///
    /// Returns the cached build error, or [`SamplerError::Unavailable`]
    /// when nothing has been registered for `key`.
    pub fn get(&self, key: &ImageKey) -> Result<&ColorSampler, SamplerError> {
        match self.entries.get(key) {
            Some(Ok(sampler)) => Ok(sampler),
            Some(Err(e)) => Err(e.clone()),
            None => Err(SamplerError::Unavailable),
        }
    }

    /// Run `check` at `point` on the sampler for `key`, failing closed
    /// when the sampler is missing or invalid.
    #[must_use]
    pub fn passes(&self, key: &ImageKey, check: InteriorCheck, point: ImagePoint) -> bool {
        self.get(key).is_ok_and(|sampler| sampler.passes(check, point))
    }
}
