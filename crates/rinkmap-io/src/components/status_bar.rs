//! Workflow status indicator.

use dioxus::prelude::*;
use rinkmap_core::{WorkflowStatus, WorkflowStep};

/// Props for the [`StatusBar`] component.
#[derive(Props, Clone, PartialEq)]
pub struct StatusBarProps {
    /// Current workflow snapshot.
    status: WorkflowStatus,
    /// Cancel button pressed.
    on_cancel: EventHandler<()>,
}

/// One-line summary of the workflow in progress, with a hint for the
/// next click.
#[component]
pub fn StatusBar(props: StatusBarProps) -> Element {
    let hint = match props.status.step {
        WorkflowStep::Idle => "Click to annotate; long-press the defense half to record a goal against.",
        WorkflowStep::AwaitingField => "Click where the play happened.",
        WorkflowStep::AwaitingGoal => "Click where the puck entered the net.",
        WorkflowStep::AwaitingTime => "Click the time bucket.",
    };
    let active = props.status.step != WorkflowStep::Idle;
    let on_cancel = props.on_cancel;

    rsx! {
        div { class: if active { "status-bar recording" } else { "status-bar" },
            span { class: "status", "{props.status}" }
            span { class: "hint", "{hint}" }
            if active {
                button {
                    class: "cancel",
                    onclick: move |_| on_cancel.call(()),
                    "Cancel"
                }
            }
        }
    }
}
