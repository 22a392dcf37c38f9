//! One rink-diagram box: an image with markers layered on top.
//!
//! Pointer input on the image is reported in client pixels; the engine
//! maps it into image space. Markers are absolutely positioned by their
//! container-relative placement, so they stay on their spot while the
//! image is letterboxed at any size.

use dioxus::prelude::*;
use rinkmap_core::{BoxId, MarkerId, PlacedMarker};

use crate::layout;

/// A marker ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerDot {
    /// Engine id, reported back on click.
    pub id: MarkerId,
    /// CSS `left` in percent.
    pub left_pct: f64,
    /// CSS `top` in percent.
    pub top_pct: f64,
    /// CSS colour.
    pub color: &'static str,
    /// Whether clicking removes the marker.
    pub interactive: bool,
    /// Tooltip (owning player).
    pub title: String,
}

impl MarkerDot {
    /// Render data for a placed marker, `None` until it has a placement.
    #[must_use]
    pub fn from_placed(placed: &PlacedMarker) -> Option<Self> {
        let placement = placed.placement?;
        Some(Self {
            id: placed.id,
            left_pct: placement.left_pct,
            top_pct: placement.top_pct,
            color: placed.marker.color.css(),
            interactive: placed.interactive,
            title: placed.marker.player.clone().unwrap_or_default(),
        })
    }
}

/// Pointer input on a box, in client pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoxPointer {
    /// Button or finger went down.
    Press(f64, f64),
    /// Button or finger came up.
    Release(f64, f64),
    /// Pointer left the image or the touch was cancelled.
    Leave,
}

/// Props for the [`RinkBox`] component.
#[derive(Props, Clone, PartialEq)]
pub struct RinkBoxProps {
    /// Which box this is.
    box_id: BoxId,
    /// Image URL.
    src: String,
    /// Markers to show (already filtered).
    markers: Vec<MarkerDot>,
    /// Extra CSS class, e.g. to highlight the box the workflow expects.
    #[props(default)]
    class: String,
    /// Pointer input on the image.
    on_pointer: EventHandler<(BoxId, BoxPointer)>,
    /// Click on an interactive marker.
    on_marker: EventHandler<MarkerId>,
    /// The image finished loading (natural size is now known).
    on_load: EventHandler<BoxId>,
}

/// Rink diagram or net graphic with its markers.
#[component]
pub fn RinkBox(props: RinkBoxProps) -> Element {
    let box_id = props.box_id;
    let on_pointer = props.on_pointer;
    let on_marker = props.on_marker;
    let on_load = props.on_load;
    let extra = &props.class;

    rsx! {
        div {
            id: "{layout::container_id(box_id)}",
            class: "rink-box {extra}",

            img {
                id: "{layout::image_id(box_id)}",
                class: "rink-image",
                src: "{props.src}",
                alt: "{box_id}",
                crossorigin: "anonymous",
                draggable: "false",
                onload: move |_| on_load.call(box_id),
                onpointerdown: move |evt: Event<PointerData>| {
                    let p = evt.client_coordinates();
                    on_pointer.call((box_id, BoxPointer::Press(p.x, p.y)));
                },
                onpointerup: move |evt: Event<PointerData>| {
                    let p = evt.client_coordinates();
                    on_pointer.call((box_id, BoxPointer::Release(p.x, p.y)));
                },
                onpointerleave: move |_| on_pointer.call((box_id, BoxPointer::Leave)),
                onpointercancel: move |_| on_pointer.call((box_id, BoxPointer::Leave)),
                oncontextmenu: move |evt| evt.prevent_default(),
            }

            for dot in props.markers.iter() {
                {render_marker(dot, on_marker)}
            }
        }
    }
}

fn render_marker(dot: &MarkerDot, on_marker: EventHandler<MarkerId>) -> Element {
    let id = dot.id;
    let interactive = dot.interactive;
    let class = if interactive { "marker" } else { "marker marker-static" };

    rsx! {
        div {
            key: "{id.get()}",
            class: "{class}",
            style: "left: {dot.left_pct}%; top: {dot.top_pct}%; background: {dot.color};",
            title: "{dot.title}",
            onclick: move |evt| {
                evt.stop_propagation();
                if interactive {
                    on_marker.call(id);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use rinkmap_core::store::NewMarker;
    use rinkmap_core::{ContainerPlacement, ImagePoint, Marker, MarkerColor, MarkerStore, Zone};

    use super::*;

    fn store_with_marker() -> MarkerStore {
        let mut store = MarkerStore::new();
        store.create(
            NewMarker {
                box_id: BoxId::OffenseField,
                position: ImagePoint::new(25.0, 75.0),
                color: MarkerColor::Conceded,
                player: Some("Kim".into()),
                zone: Zone::Red,
                interactive: true,
            },
            None,
        );
        store
    }

    #[test]
    fn unplaced_marker_is_not_rendered() {
        let store = store_with_marker();
        assert!(MarkerDot::from_placed(&store.markers(BoxId::OffenseField)[0]).is_none());
    }

    #[test]
    fn placed_marker_carries_colour_and_owner() {
        let store = store_with_marker();
        let mut placed = store.markers(BoxId::OffenseField)[0].clone();
        placed.placement = Some(ContainerPlacement {
            left_pct: 30.0,
            top_pct: 70.0,
        });
        let dot = MarkerDot::from_placed(&placed);
        assert_eq!(
            dot,
            Some(MarkerDot {
                id: placed.id,
                left_pct: 30.0,
                top_pct: 70.0,
                color: MarkerColor::Conceded.css(),
                interactive: true,
                title: "Kim".into(),
            })
        );
        assert_eq!(
            placed.marker,
            Marker {
                position: ImagePoint::new(25.0, 75.0),
                color: MarkerColor::Conceded,
                player: Some("Kim".into()),
                zone: Zone::Red,
            }
        );
    }
}
