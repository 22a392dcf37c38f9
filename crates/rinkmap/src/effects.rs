//! Performing engine effects and driving gesture deadlines.
//!
//! The engine never sleeps; it reports when it next needs a
//! [`tick`](rinkmap_core::GoalMap::tick) and which effects the UI must
//! perform. Timers here are one-shot `gloo-timers` futures, and a timer
//! that fires after its gesture was resolved is a harmless no-op tick.

use std::time::Duration;

use dioxus::prelude::*;
use gloo_timers::future::TimeoutFuture;
use rinkmap_core::{Effect, GoalMap, Outcome, Page};
use rinkmap_io::LocalStorage;
use web_time::Instant;

/// The goal map shared by every page.
pub type SharedMap = Signal<GoalMap<LocalStorage>>;

/// Monotonic clock gesture deadlines are measured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock(Instant);

impl Clock {
    /// Start the clock now.
    #[must_use]
    pub fn start() -> Self {
        Self(Instant::now())
    }

    /// Time since start.
    #[must_use]
    pub fn now(self) -> Duration {
        self.0.elapsed()
    }
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

/// Show a blocking browser alert.
pub fn alert(message: &str) {
    let Some(window) = web_sys::window() else {
        log::warn!("no window to alert: {message}");
        return;
    };
    if let Err(e) = window.alert_with_message(message) {
        log::warn!("alert failed: {e:?}");
    }
}

/// Perform the effects of an engine outcome, in order.
pub fn perform(outcome: Outcome, mut page: Signal<Page>) {
    for effect in outcome.effects {
        match effect {
            Effect::Alert(message) => alert(&message),
            Effect::Navigate {
                page: target,
                delay_ms: 0,
            } => page.set(target),
            Effect::Navigate {
                page: target,
                delay_ms,
            } => {
                let wait = u32::try_from(delay_ms).unwrap_or(u32::MAX);
                spawn(async move {
                    TimeoutFuture::new(wait).await;
                    page.set(target);
                });
            }
        }
    }
}

/// Wake the engine when its next gesture deadline passes.
pub fn schedule_tick(mut map: SharedMap, clock: Clock, page: Signal<Page>) {
    let Some(deadline) = map.peek().next_deadline() else {
        return;
    };
    let wait = millis(deadline.saturating_sub(clock.now()));
    spawn(async move {
        TimeoutFuture::new(wait).await;
        let outcome = map.write().tick(clock.now());
        perform(outcome, page);
        schedule_tick(map, clock, page);
    });
}

/// Ask the user to confirm a destructive action.
#[must_use]
pub fn confirm(message: &str) -> bool {
    web_sys::window()
        .and_then(|window| window.confirm_with_message(message).ok())
        .unwrap_or(false)
}
