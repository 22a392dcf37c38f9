//! Scorer and goalie filter controls.
//!
//! The scorer filter is a single choice; the goalie filter is a set of
//! toggles where an empty selection means "all goalies".

use std::collections::BTreeSet;

use dioxus::prelude::*;
use rinkmap_core::{GoalieFilter, ScorerFilter};

/// Props for the [`FilterBar`] component.
#[derive(Props, Clone, PartialEq)]
pub struct FilterBarProps {
    /// Roster skaters, offered as scorers.
    skaters: Vec<String>,
    /// Roster goalies.
    goalies: Vec<String>,
    /// Current scorer filter.
    scorer: ScorerFilter,
    /// Current goalie filter.
    goalie: GoalieFilter,
    /// New scorer filter chosen.
    on_scorer: EventHandler<ScorerFilter>,
    /// New goalie filter chosen.
    on_goalie: EventHandler<GoalieFilter>,
}

/// Filter controls shown above the rink.
#[component]
pub fn FilterBar(props: FilterBarProps) -> Element {
    let on_scorer = props.on_scorer;
    let on_goalie = props.on_goalie;
    let selected_scorer = props.scorer.player().unwrap_or_default().to_owned();
    let selected_goalies = match &props.goalie {
        GoalieFilter::All => BTreeSet::new(),
        GoalieFilter::Goalies(set) => set.clone(),
    };

    rsx! {
        div { class: "filter-bar",
            label { class: "filter",
                "Scorer "
                select {
                    value: "{selected_scorer}",
                    onchange: move |evt| {
                        let name = evt.value();
                        if name.is_empty() {
                            on_scorer.call(ScorerFilter::All);
                        } else {
                            on_scorer.call(ScorerFilter::Player(name));
                        }
                    },
                    option { value: "", "All players" }
                    for name in props.skaters.iter() {
                        option {
                            value: "{name}",
                            selected: *name == selected_scorer,
                            "{name}"
                        }
                    }
                }
            }

            div { class: "filter goalies",
                span { "Goalie " }
                button {
                    class: if selected_goalies.is_empty() { "chip active" } else { "chip" },
                    onclick: move |_| on_goalie.call(GoalieFilter::All),
                    "All"
                }
                for name in props.goalies.iter() {
                    {render_goalie_chip(name, &selected_goalies, on_goalie)}
                }
            }
        }
    }
}

fn render_goalie_chip(
    name: &str,
    selected: &BTreeSet<String>,
    on_goalie: EventHandler<GoalieFilter>,
) -> Element {
    let active = selected.contains(name);
    let mut toggled = selected.clone();
    if active {
        toggled.remove(name);
    } else {
        toggled.insert(name.to_owned());
    }
    let next = if toggled.is_empty() {
        GoalieFilter::All
    } else {
        GoalieFilter::Goalies(toggled)
    };

    rsx! {
        button {
            class: if active { "chip active" } else { "chip" },
            "aria-pressed": "{active}",
            onclick: move |_| on_goalie.call(next.clone()),
            "{name}"
        }
    }
}
