//! DOM measurement for rink-diagram boxes.
//!
//! Each box is rendered as a positioned container `#<label>` holding an
//! `<img id="<label>-img">`. The element rectangles and the image's
//! natural size are everything the geometry adapter needs.

use rinkmap_core::{BoxId, BoxLayout, Rect, Size};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{DomRect, HtmlImageElement};

/// Errors that can occur while measuring a box.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// The element is not in the document (page not shown).
    #[error("element #{0} not found")]
    MissingElement(String),

    /// A browser API call returned an error.
    #[error("browser API error: {0}")]
    JsError(String),
}

impl From<JsValue> for LayoutError {
    fn from(value: JsValue) -> Self {
        Self::JsError(format!("{value:?}"))
    }
}

/// DOM id of the container of `box_id`.
#[must_use]
pub fn container_id(box_id: BoxId) -> String {
    box_id.label().to_owned()
}

/// DOM id of the image of `box_id`.
#[must_use]
pub fn image_id(box_id: BoxId) -> String {
    format!("{}-img", box_id.label())
}

fn element(id: &str) -> Result<web_sys::Element, LayoutError> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| LayoutError::JsError("no document".into()))?;
    document
        .get_element_by_id(id)
        .ok_or_else(|| LayoutError::MissingElement(id.to_owned()))
}

/// The `<img>` element of `box_id`.
///
/// # Errors
///
/// Returns [`LayoutError::MissingElement`] if the box is not rendered.
pub fn find_image(box_id: BoxId) -> Result<HtmlImageElement, LayoutError> {
    let id = image_id(box_id);
    element(&id)?
        .dyn_into()
        .map_err(|_| LayoutError::JsError(format!("#{id} is not an <img>")))
}

fn to_rect(rect: &DomRect) -> Rect {
    Rect::new(rect.left(), rect.top(), rect.width(), rect.height())
}

/// Current geometry of `box_id`.
///
/// # Errors
///
/// Returns [`LayoutError::MissingElement`] if the box is not rendered.
pub fn measure(box_id: BoxId) -> Result<BoxLayout, LayoutError> {
    let image = find_image(box_id)?;
    let container = element(&container_id(box_id))?;
    let natural = Size::new(
        f64::from(image.natural_width()),
        f64::from(image.natural_height()),
    );
    Ok(BoxLayout {
        natural: natural.is_usable().then_some(natural),
        image_rect: to_rect(&image.get_bounding_client_rect()),
        container_rect: to_rect(&container.get_bounding_client_rect()),
    })
}

/// Measure every rendered box, skipping those not in the document.
#[must_use]
pub fn measure_all() -> Vec<(BoxId, BoxLayout)> {
    BoxId::ALL
        .into_iter()
        .filter_map(|box_id| match measure(box_id) {
            Ok(layout) => Some((box_id, layout)),
            Err(LayoutError::MissingElement(_)) => None,
            Err(e) => {
                log::warn!("could not measure {box_id}: {e}");
                None
            }
        })
        .collect()
}
