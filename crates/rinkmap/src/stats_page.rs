//! Stats page: roster, stat buttons and team selection.
//!
//! `+1 Goal` and `+1 Shot` are the entry points of goal and shot
//! recording: the engine starts a workflow for the player and asks for
//! the goal map page.

use dioxus::prelude::*;
use rinkmap_core::roster::player_goal_value;
use rinkmap_core::{Page, RosterEntry, StatCategory, StatIncrement};

use crate::effects::{self, SharedMap};

/// Props for the [`StatsPage`] component.
#[derive(Props, Clone, PartialEq)]
pub struct StatsPageProps {
    map: SharedMap,
    page: Signal<Page>,
}

/// Roster table with stat buttons, add-player form and team switcher.
#[component]
pub fn StatsPage(props: StatsPageProps) -> Element {
    let mut map = props.map;
    let page = props.page;
    let mut new_name = use_signal(String::new);
    let mut new_position = use_signal(|| String::from("F"));
    let mut team_input = use_signal(String::new);

    let roster = map.read().roster();
    let rows: Vec<(RosterEntry, f64)> = {
        let current = map.read();
        roster
            .entries
            .iter()
            .map(|entry| {
                let value = player_goal_value(
                    current.ledger(),
                    &entry.name,
                    &current.config().goal_value,
                );
                (entry.clone(), value)
            })
            .collect()
    };

    let record = move |player: String, category: StatCategory| {
        let roster = map.peek().roster();
        let increment = StatIncrement {
            player,
            category,
            delta: 1,
        };
        let outcome = map.write().on_stat_increment(&increment, &roster);
        effects::perform(outcome, page);
    };

    let add_player = move |_| {
        let mut roster = map.peek().roster();
        let name = new_name();
        if !roster.add(RosterEntry::new(name.as_str(), new_position())) {
            effects::alert(&format!("{:?} is empty or already on the roster.", name.trim()));
            return;
        }
        match map.write().save_roster(&roster) {
            Ok(()) => new_name.set(String::new()),
            Err(e) => effects::alert(&format!("Could not save the roster: {e}")),
        }
    };

    let switch_team = move |_| {
        let team = team_input();
        let team = team.trim();
        let selected = (!team.is_empty()).then_some(team);
        match map.write().set_team(selected) {
            Ok(report) => log::info!("switched team, {} markers restored", report.restored),
            Err(e) => effects::alert(&format!("Could not switch team: {e}")),
        }
    };

    rsx! {
        div { class: "panel",
            h2 { "Players" }
            if rows.is_empty() {
                p { class: "muted", "Add players to record goals and shots per player." }
            }
            table { class: "stats",
                thead {
                    tr {
                        th { "Player" }
                        th { "Pos" }
                        th { "Goal value" }
                        th {}
                    }
                }
                tbody {
                    for (entry, value) in rows {
                        {render_player(entry, value, record, map)}
                    }
                }
            }
        }

        div { class: "panel actions",
            input {
                placeholder: "Player name",
                value: "{new_name}",
                oninput: move |evt| new_name.set(evt.value()),
            }
            select {
                value: "{new_position}",
                onchange: move |evt| new_position.set(evt.value()),
                option { value: "F", "Forward" }
                option { value: "D", "Defense" }
                option { value: "G", "Goalie" }
            }
            button { onclick: add_player, "Add player" }
        }

        div { class: "panel actions",
            input {
                placeholder: "Team (empty for default)",
                value: "{team_input}",
                oninput: move |evt| team_input.set(evt.value()),
            }
            button { onclick: switch_team, "Switch team" }
        }
    }
}

fn render_player(
    entry: RosterEntry,
    value: f64,
    record: impl FnMut(String, StatCategory) + Copy + 'static,
    mut map: SharedMap,
) -> Element {
    let goal_player = entry.name.clone();
    let shot_player = entry.name.clone();
    let removed = entry.name.clone();
    let mut record_goal = record;
    let mut record_shot = record;

    let remove = move |_| {
        let mut roster = map.peek().roster();
        if !roster.remove(&removed) {
            return;
        }
        if let Err(e) = map.write().save_roster(&roster) {
            effects::alert(&format!("Could not save the roster: {e}"));
        }
    };

    rsx! {
        tr {
            td { "{entry.name}" }
            td { "{entry.position}" }
            td { "{value:.2}" }
            td { class: "actions",
                button {
                    onclick: move |_| record_goal(goal_player.clone(), StatCategory::Goals),
                    "+1 Goal"
                }
                button {
                    onclick: move |_| record_shot(shot_player.clone(), StatCategory::Shot),
                    "+1 Shot"
                }
                button { onclick: remove, "Remove" }
            }
        }
    }
}
