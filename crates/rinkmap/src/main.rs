use dioxus::prelude::*;
use rinkmap_core::{GoalMap, GoalMapConfig, Page};
use rinkmap_io::LocalStorage;

mod effects;
mod goal_map_page;
mod season_page;
mod stats_page;

use effects::Clock;
use goal_map_page::GoalMapPage;
use season_page::SeasonPage;
use stats_page::StatsPage;

fn main() {
    // Best-effort: a second install (hot reload) keeps the first logger.
    let _ = rinkmap_io::logger::init(log::LevelFilter::Info);
    dioxus::launch(app);
}

/// Root application component.
///
/// Opens `localStorage` and hands it to [`Tracker`], or explains why
/// nothing can be recorded.
fn app() -> Element {
    let storage = use_hook(|| LocalStorage::open().map_err(|e| e.to_string()));

    rsx! {
        style { dangerous_inner_html: include_str!("../assets/style.css") }

        match storage {
            Ok(storage) => rsx! { Tracker { storage } },
            Err(err) => rsx! {
                main {
                    div { class: "panel",
                        h2 { "Storage unavailable" }
                        p { "Goal map data is kept in this browser's local storage, which could not be opened: {err}" }
                    }
                }
            },
        }
    }
}

/// Props for the [`Tracker`] component.
#[derive(Props, Clone, PartialEq)]
struct TrackerProps {
    storage: LocalStorage,
}

/// The tracker proper: owns the goal map and the current page.
#[component]
fn Tracker(props: TrackerProps) -> Element {
    let clock = use_hook(Clock::start);
    let map = use_signal(|| {
        let mut map = GoalMap::new(GoalMapConfig::default(), props.storage.clone());
        if let Err(e) = map.load() {
            log::error!("restoring goal map failed: {e}");
            effects::alert(&format!("Could not restore goal map data: {e}"));
        }
        map
    });
    let mut page = use_signal(|| Page::Stats);

    let team = map.read().namespace().team().unwrap_or("default").to_owned();
    let recording = map.read().is_recording();

    rsx! {
        div { class: "app",
            header {
                h1 { "rinkmap" }
                span { class: "muted", "Team: {team}" }
                nav {
                    for target in [Page::Stats, Page::GoalMap, Page::Season] {
                        button {
                            class: if page() == target { "active" } else { "" },
                            onclick: move |_| page.set(target),
                            "{page_title(target)}"
                            if target == Page::GoalMap && recording {
                                " ●"
                            }
                        }
                    }
                }
            }

            main {
                match page() {
                    Page::Stats => rsx! { StatsPage { map, page } },
                    Page::GoalMap => rsx! { GoalMapPage { map, page, clock } },
                    Page::Season => rsx! { SeasonPage { map } },
                }
            }
        }
    }
}

const fn page_title(page: Page) -> &'static str {
    match page {
        Page::Stats => "Stats",
        Page::GoalMap => "Goal map",
        Page::Season => "Season",
    }
}
