//! Canvas rasterisation of rendered goal graphics.
//!
//! Draws a loaded `<img>` onto an offscreen canvas at its natural size
//! and reads the pixels back into an [`RgbaImage`] for the colour
//! sampler. A cross-origin image taints the canvas; the browser then
//! throws a `SecurityError` from `getImageData`, which is reported as
//! [`SamplerError::Tainted`] so goal clicks fail closed.

use image::RgbaImage;
use rinkmap_core::{ColorSampler, ImageKey, SamplerError};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

/// Errors that can occur while rasterising an image element.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// The image has not finished loading (natural size is zero).
    #[error("image is not loaded")]
    NotLoaded,

    /// The canvas is tainted by cross-origin data.
    #[error("canvas is tainted: {0}")]
    Tainted(String),

    /// A browser API call returned an error.
    #[error("browser API error: {0}")]
    JsError(String),
}

impl From<JsValue> for RasterError {
    fn from(value: JsValue) -> Self {
        let name = js_sys::Reflect::get(&value, &JsValue::from_str("name"))
            .ok()
            .and_then(|name| name.as_string());
        match name.as_deref() {
            Some("SecurityError") => Self::Tainted(format!("{value:?}")),
            _ => Self::JsError(format!("{value:?}")),
        }
    }
}

impl From<RasterError> for SamplerError {
    fn from(err: RasterError) -> Self {
        match err {
            RasterError::NotLoaded => Self::Empty,
            RasterError::Tainted(detail) => Self::Tainted(detail),
            RasterError::JsError(detail) => Self::Decode(detail),
        }
    }
}

/// Stable cache key for an image element: its resolved source URL.
#[must_use]
pub fn image_key(image: &HtmlImageElement) -> ImageKey {
    ImageKey::new(image.current_src())
}

/// Copy the pixels of a loaded image element.
///
/// # Errors
///
/// Returns [`RasterError::NotLoaded`] if the image has no natural size,
/// [`RasterError::Tainted`] if the browser withholds the pixel data and
/// [`RasterError::JsError`] if any other canvas call fails.
pub fn rasterize(image: &HtmlImageElement) -> Result<RgbaImage, RasterError> {
    let (width, height) = (image.natural_width(), image.natural_height());
    if width == 0 || height == 0 {
        return Err(RasterError::NotLoaded);
    }

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| RasterError::JsError("no document".into()))?;
    let canvas: HtmlCanvasElement = document
        .create_element("canvas")?
        .dyn_into()
        .map_err(|_| RasterError::JsError("created element is not a canvas".into()))?;
    canvas.set_width(width);
    canvas.set_height(height);

    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| RasterError::JsError("no 2d context".into()))?
        .dyn_into()
        .map_err(|_| RasterError::JsError("context is not 2d".into()))?;
    ctx.draw_image_with_html_image_element(image, 0.0, 0.0)?;

    let data = ctx.get_image_data(0.0, 0.0, f64::from(width), f64::from(height))?;
    RgbaImage::from_raw(width, height, data.data().0)
        .ok_or_else(|| RasterError::JsError("pixel buffer has unexpected length".into()))
}

/// Build a colour sampler for a loaded image element.
///
/// # Errors
///
/// Returns [`SamplerError::Tainted`] for cross-origin images and
/// [`SamplerError::Empty`] for images that have not loaded.
pub fn sampler_for(image: &HtmlImageElement) -> Result<ColorSampler, SamplerError> {
    let pixels = rasterize(image).inspect_err(|e| {
        log::warn!("could not rasterise {}: {e}", image.current_src());
    })?;
    ColorSampler::from_rgba(pixels)
}
