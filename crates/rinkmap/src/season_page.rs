//! Season page: accumulated markers, momentum and goal-value ranking.

use std::collections::HashMap;

use dioxus::prelude::*;
use rinkmap_core::roster::player_goal_value;
use rinkmap_core::{BoxId, BoxLayout, SeasonData};
use rinkmap_io::{MarkerDot, RinkBox, TimeGrid, layout};

use crate::effects::{self, SharedMap};
use crate::goal_map_page::{box_class, image_src};

fn load_season(
    mut map: SharedMap,
    layouts: Signal<HashMap<BoxId, BoxLayout>>,
    mut season: Signal<Option<SeasonData>>,
    mut error: Signal<Option<String>>,
) {
    let loaded = map.write().season_data();
    match loaded {
        Ok(Some(mut data)) => {
            data.markers.reposition(&layouts.peek());
            season.set(Some(data));
            error.set(None);
        }
        Ok(None) => log::warn!("season update already running"),
        Err(e) => error.set(Some(format!("{e}"))),
    }
}

/// Props for the [`SeasonPage`] component.
#[derive(Props, Clone, PartialEq)]
pub struct SeasonPageProps {
    map: SharedMap,
}

/// Season view. Season markers are read-only.
#[component]
pub fn SeasonPage(props: SeasonPageProps) -> Element {
    let mut map = props.map;
    let mut season = use_signal(|| Option::<SeasonData>::None);
    let mut layouts = use_signal(HashMap::<BoxId, BoxLayout>::new);
    let error = use_signal(|| Option::<String>::None);

    // Once per visit; exports and team switches happen on other pages.
    use_effect(move || load_season(map, layouts, season, error));

    let on_load = move |box_id: BoxId| match layout::measure(box_id) {
        Ok(measured) => {
            layouts.write().insert(box_id, measured);
            if let Some(data) = season.write().as_mut() {
                data.markers.reposition(&layouts.peek());
            }
        }
        Err(e) => log::warn!("could not measure {box_id}: {e}"),
    };

    let reset = move |_| {
        if effects::confirm("Delete the whole season record?") {
            map.write().reset_season();
            load_season(map, layouts, season, error);
        }
    };

    let periods = map.read().config().periods.clone();
    let weights = map.read().config().goal_value.clone();
    let guard = season.read();
    let Some(data) = guard.as_ref() else {
        return rsx! {
            if let Some(ref err) = error() {
                div { class: "panel", p { "Could not load the season: {err}" } }
            } else {
                p { class: "muted", "Loading season…" }
            }
        };
    };

    let momentum: Vec<_> = periods
        .iter()
        .map(|period| {
            (
                period.clone(),
                data.momentum.get(period).copied().unwrap_or_default(),
            )
        })
        .collect();

    let mut ranking: Vec<(String, f64)> = map
        .read()
        .roster()
        .entries
        .iter()
        .map(|entry| {
            let value = player_goal_value(&data.ledger, &entry.name, &weights);
            (entry.name.clone(), value)
        })
        .filter(|(_, value)| *value > 0.0)
        .collect();
    ranking.sort_by(|a, b| b.1.total_cmp(&a.1));

    let boxes: Vec<(BoxId, Vec<MarkerDot>)> = BoxId::ALL
        .into_iter()
        .map(|box_id| {
            let dots = data
                .markers
                .markers(box_id)
                .iter()
                .filter_map(MarkerDot::from_placed)
                .collect();
            (box_id, dots)
        })
        .collect();
    let total = data.markers.len();
    drop(guard);

    rsx! {
        div { class: "panel",
            h2 { "Season" }
            p { class: "muted", "{total} markers across all exported games." }
        }

        div { class: "rink",
            for (box_id, markers) in boxes {
                RinkBox {
                    key: "{box_id}",
                    box_id,
                    src: image_src(box_id),
                    markers,
                    class: box_class(box_id, None),
                    on_pointer: |_| {},
                    on_marker: |_| {},
                    on_load,
                }
            }
        }

        div { class: "panel",
            h3 { "Momentum" }
            TimeGrid { periods: momentum, on_bucket: |_| {} }
        }

        div { class: "panel",
            h3 { "Goal value" }
            table { class: "stats",
                for (name, value) in ranking {
                    tr {
                        td { "{name}" }
                        td { "{value:.2}" }
                    }
                }
            }
        }

        div { class: "actions",
            button { onclick: reset, "Reset season" }
        }
    }
}
