//! Pointer-to-image coordinate mapping.
//!
//! Rink graphics are rendered with `object-fit: contain`, so the drawn
//! image is letterboxed inside its `<img>` element whenever the element
//! and the image have different aspect ratios. Every mapping here goes
//! through the *rendered* rectangle so stored percentages refer to the
//! natural image content, not to the element or its container.
//!
//! Nothing in this module caches: callers recompute placements after
//! every resize because the rendered rectangle changes with the
//! viewport.

use serde::{Deserialize, Serialize};

use crate::types::{ContainerPlacement, ImagePoint, Rect, Size, clamp_percent};

/// Everything needed to map between pointer, image and container space
/// for one rink-diagram box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxLayout {
    /// Natural dimensions of the image, `None` while it is still loading.
    pub natural: Option<Size>,
    /// Client rectangle of the `<img>` element.
    pub image_rect: Rect,
    /// Client rectangle of the positioned container markers live in.
    pub container_rect: Rect,
}

impl BoxLayout {
    /// Layout where image element and container coincide.
    #[must_use]
    pub const fn uniform(natural: Option<Size>, rect: Rect) -> Self {
        Self {
            natural,
            image_rect: rect,
            container_rect: rect,
        }
    }

    /// The rectangle clicks are mapped through: the rendered image
    /// rectangle, or the whole element when the image has no natural
    /// size yet.
    #[must_use]
    pub fn effective_rect(&self) -> Rect {
        rendered_rect(self.natural, self.image_rect).unwrap_or_else(|| {
            log::debug!("natural image size unavailable, mapping against the element rectangle");
            self.image_rect
        })
    }
}

/// Result of mapping a pointer position into image space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageHit {
    /// Clamped image-relative position.
    pub point: ImagePoint,
    /// Whether the pointer landed on the rendered image (with tolerance).
    pub inside: bool,
}

/// Compute the rectangle an aspect-preserving image actually occupies
/// inside its element.
///
/// Returns `None` when the natural size is unknown or the element has
/// no area; callers fall back to the element rectangle.
#[must_use]
pub fn rendered_rect(natural: Option<Size>, element: Rect) -> Option<Rect> {
    let natural = natural.filter(|s| s.is_usable())?;
    if element.width <= 0.0 || element.height <= 0.0 {
        return None;
    }

    let scale = (element.width / natural.width).min(element.height / natural.height);
    let width = natural.width * scale;
    let height = natural.height * scale;
    Some(Rect::new(
        element.left + (element.width - width) / 2.0,
        element.top + (element.height - height) / 2.0,
        width,
        height,
    ))
}

/// Map a pointer position (client pixels) to image percent space.
///
/// The result is clamped to [0, 100]; `inside` reports whether the
/// pointer was within `tolerance_px` of the rendered rectangle. Callers
/// reject hits that are not inside.
#[must_use]
pub fn to_image_percent(pointer_x: f64, pointer_y: f64, layout: &BoxLayout, tolerance_px: f64) -> ImageHit {
    let rect = layout.effective_rect();
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return ImageHit {
            point: ImagePoint::new(0.0, 0.0),
            inside: false,
        };
    }

    let x = (pointer_x - rect.left) / rect.width * 100.0;
    let y = (pointer_y - rect.top) / rect.height * 100.0;
    ImageHit {
        point: ImagePoint::new(clamp_percent(x), clamp_percent(y)),
        inside: rect.contains_with_tolerance(pointer_x, pointer_y, tolerance_px),
    }
}

/// Re-project an image-relative point onto its container.
///
/// With a degenerate container the image percent is returned unchanged.
#[must_use]
pub fn percent_to_container_percent(point: ImagePoint, layout: &BoxLayout) -> ContainerPlacement {
    let rect = layout.effective_rect();
    let container = layout.container_rect;
    if container.width <= 0.0 || container.height <= 0.0 {
        return ContainerPlacement {
            left_pct: point.x,
            top_pct: point.y,
        };
    }

    let abs_x = point.x.mul_add(rect.width / 100.0, rect.left);
    let abs_y = point.y.mul_add(rect.height / 100.0, rect.top);
    ContainerPlacement {
        left_pct: (abs_x - container.left) / container.width * 100.0,
        top_pct: (abs_y - container.top) / container.height * 100.0,
    }
}

/// Inverse of [`percent_to_container_percent`].
#[must_use]
pub fn container_percent_to_image_percent(placement: ContainerPlacement, layout: &BoxLayout) -> ImagePoint {
    let rect = layout.effective_rect();
    let container = layout.container_rect;
    if container.width <= 0.0 || container.height <= 0.0 || rect.width <= 0.0 || rect.height <= 0.0 {
        return ImagePoint::clamped(placement.left_pct, placement.top_pct);
    }

    let abs_x = placement.left_pct.mul_add(container.width / 100.0, container.left);
    let abs_y = placement.top_pct.mul_add(container.height / 100.0, container.top);
    ImagePoint::clamped(
        (abs_x - rect.left) / rect.width * 100.0,
        (abs_y - rect.top) / rect.height * 100.0,
    )
}
