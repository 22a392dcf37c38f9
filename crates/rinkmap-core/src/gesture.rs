//! Single-click, double-click and long-press recognition.
//!
//! The recognizer is a small deadline-driven state machine rather than a
//! set of racing timers. The caller feeds it pointer events stamped with
//! a monotonic `now`, schedules a wake-up at [`next_deadline`], and calls
//! [`tick`] when it fires. A tick that arrives late, early or twice is
//! harmless: decisions are taken purely by comparing `now` against the
//! stored deadlines.
//!
//! ```text
//! click:  Idle -> PendingSingle -> Single
//!                       \-> (second release in window) -> Double
//! press:  Idle -> PendingLongPress -> LongPress (release suppressed)
//!                       \-> release  -> click path
//!                       \-> leave    -> Cancelled
//! ```
//!
//! [`next_deadline`]: GestureRecognizer::next_deadline
//! [`tick`]: GestureRecognizer::tick

use std::time::Duration;

use crate::config::Timing;
use crate::types::{BoxId, ImagePoint};

/// A recognised gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// One click with no follow-up inside the double-click window.
    Single,
    /// Two clicks on the same box inside the window.
    Double,
    /// Press held past the long-press threshold.
    LongPress,
}

/// A gesture together with where it happened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureEvent {
    /// Box the gesture happened on.
    pub box_id: BoxId,
    /// Image-relative position (of the last click for doubles).
    pub point: ImagePoint,
    /// What was recognised.
    pub gesture: Gesture,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PressState {
    Idle,
    PendingLongPress {
        box_id: BoxId,
        point: ImagePoint,
        deadline: Duration,
    },
    /// Long-press fired; the matching release must not count as a click.
    CommittedLong,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ClickState {
    Idle,
    PendingSingle {
        box_id: BoxId,
        point: ImagePoint,
        deadline: Duration,
    },
}

/// Per-pointer gesture state machine.
#[derive(Debug, Clone)]
pub struct GestureRecognizer {
    double_click: Duration,
    long_press: Duration,
    press: PressState,
    click: ClickState,
}

impl GestureRecognizer {
    /// Create a recognizer with the configured windows.
    #[must_use]
    pub const fn new(timing: &Timing) -> Self {
        Self {
            double_click: Duration::from_millis(timing.double_click_ms),
            long_press: Duration::from_millis(timing.long_press_ms),
            press: PressState::Idle,
            click: ClickState::Idle,
        }
    }

    /// Pointer went down. `long_press_eligible` arms the long-press
    /// deadline; otherwise the press only matters once released.
    pub fn press(
        &mut self,
        now: Duration,
        box_id: BoxId,
        point: ImagePoint,
        long_press_eligible: bool,
    ) -> Vec<GestureEvent> {
        let events = self.tick(now);
        self.press = if long_press_eligible {
            PressState::PendingLongPress {
                box_id,
                point,
                deadline: now + self.long_press,
            }
        } else {
            PressState::Idle
        };
        events
    }

    /// Pointer came up over `box_id` at `point`.
    pub fn release(&mut self, now: Duration, box_id: BoxId, point: ImagePoint) -> Vec<GestureEvent> {
        let mut events = self.tick(now);

        if self.press == PressState::CommittedLong {
            self.press = PressState::Idle;
            log::debug!("release after long-press suppressed");
            return events;
        }
        self.press = PressState::Idle;

        match self.click {
            ClickState::PendingSingle {
                box_id: pending_box,
                ..
            } if pending_box == box_id => {
                self.click = ClickState::Idle;
                events.push(GestureEvent {
                    box_id,
                    point,
                    gesture: Gesture::Double,
                });
            }
            ClickState::PendingSingle {
                box_id: pending_box,
                point: pending_point,
                ..
            } => {
                // A click on another box settles the first one right away.
                events.push(GestureEvent {
                    box_id: pending_box,
                    point: pending_point,
                    gesture: Gesture::Single,
                });
                self.click = ClickState::PendingSingle {
                    box_id,
                    point,
                    deadline: now + self.double_click,
                };
            }
            ClickState::Idle => {
                self.click = ClickState::PendingSingle {
                    box_id,
                    point,
                    deadline: now + self.double_click,
                };
            }
        }
        events
    }

    /// Pointer left the surface or the touch was cancelled. A pending
    /// long-press is abandoned without producing a click.
    pub fn leave(&mut self, now: Duration) -> Vec<GestureEvent> {
        let events = self.tick(now);
        if matches!(self.press, PressState::PendingLongPress { .. }) {
            log::debug!("long-press cancelled");
        }
        self.press = PressState::Idle;
        events
    }

    /// Commit every decision whose deadline is at or before `now`.
    pub fn tick(&mut self, now: Duration) -> Vec<GestureEvent> {
        let mut events = Vec::new();

        if let PressState::PendingLongPress {
            box_id,
            point,
            deadline,
        } = self.press
            && now >= deadline
        {
            self.press = PressState::CommittedLong;
            events.push(GestureEvent {
                box_id,
                point,
                gesture: Gesture::LongPress,
            });
        }

        if let ClickState::PendingSingle {
            box_id,
            point,
            deadline,
        } = self.click
            && now >= deadline
        {
            self.click = ClickState::Idle;
            events.push(GestureEvent {
                box_id,
                point,
                gesture: Gesture::Single,
            });
        }

        events
    }

    /// Earliest pending deadline, if any decision is outstanding.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        let press = match self.press {
            PressState::PendingLongPress { deadline, .. } => Some(deadline),
            PressState::Idle | PressState::CommittedLong => None,
        };
        let click = match self.click {
            ClickState::PendingSingle { deadline, .. } => Some(deadline),
            ClickState::Idle => None,
        };
        match (press, click) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Drop every pending decision.
    pub fn reset(&mut self) {
        self.press = PressState::Idle;
        self.click = ClickState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELD: BoxId = BoxId::OffenseField;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn recognizer() -> GestureRecognizer {
        GestureRecognizer::new(&Timing::default())
    }

    fn p(x: f64, y: f64) -> ImagePoint {
        ImagePoint::new(x, y)
    }

    #[test]
    fn single_commits_after_window() {
        let mut r = recognizer();
        assert!(r.press(ms(0), FIELD, p(10.0, 10.0), false).is_empty());
        assert!(r.release(ms(50), FIELD, p(10.0, 10.0)).is_empty());
        assert_eq!(r.next_deadline(), Some(ms(350)));
        assert!(r.tick(ms(349)).is_empty());
        let events = r.tick(ms(350));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].gesture, Gesture::Single);
        assert_eq!(r.next_deadline(), None);
    }

    #[test]
    fn second_click_in_window_is_double() {
        let mut r = recognizer();
        r.release(ms(0), FIELD, p(10.0, 10.0));
        let events = r.release(ms(200), FIELD, p(11.0, 12.0));
        assert_eq!(
            events,
            vec![GestureEvent {
                box_id: FIELD,
                point: p(11.0, 12.0),
                gesture: Gesture::Double
            }]
        );
        // The cancelled single never fires.
        assert!(r.tick(ms(1_000)).is_empty());
    }

    #[test]
    fn late_second_click_is_two_singles() {
        let mut r = recognizer();
        r.release(ms(0), FIELD, p(10.0, 10.0));
        let first = r.release(ms(400), FIELD, p(20.0, 20.0));
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].gesture, Gesture::Single);
        assert_eq!(first[0].point, p(10.0, 10.0));
        let second = r.tick(ms(700));
        assert_eq!(second[0].point, p(20.0, 20.0));
    }

    #[test]
    fn click_on_other_box_settles_pending_single() {
        let mut r = recognizer();
        r.release(ms(0), FIELD, p(10.0, 10.0));
        let events = r.release(ms(100), BoxId::OffenseGoal, p(50.0, 50.0));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].box_id, FIELD);
        assert_eq!(events[0].gesture, Gesture::Single);
        assert_eq!(r.next_deadline(), Some(ms(400)));
    }

    #[test]
    fn long_press_fires_and_suppresses_release() {
        let mut r = recognizer();
        r.press(ms(0), FIELD, p(30.0, 80.0), true);
        assert_eq!(r.next_deadline(), Some(ms(600)));
        let events = r.tick(ms(600));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].gesture, Gesture::LongPress);
        assert!(r.release(ms(900), FIELD, p(30.0, 80.0)).is_empty());
        assert_eq!(r.next_deadline(), None);
        assert!(r.tick(ms(5_000)).is_empty());
    }

    #[test]
    fn long_press_commits_on_late_release_without_tick() {
        let mut r = recognizer();
        r.press(ms(0), FIELD, p(30.0, 80.0), true);
        let events = r.release(ms(800), FIELD, p(30.0, 80.0));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].gesture, Gesture::LongPress);
        assert_eq!(r.next_deadline(), None);
    }

    #[test]
    fn early_release_falls_back_to_click() {
        let mut r = recognizer();
        r.press(ms(0), FIELD, p(30.0, 80.0), true);
        assert!(r.release(ms(200), FIELD, p(30.0, 80.0)).is_empty());
        assert_eq!(r.next_deadline(), Some(ms(500)));
        let events = r.tick(ms(700));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].gesture, Gesture::Single);
        assert_eq!(r.next_deadline(), None);
    }

    #[test]
    fn leave_cancels_long_press_without_click() {
        let mut r = recognizer();
        r.press(ms(0), FIELD, p(30.0, 80.0), true);
        assert!(r.leave(ms(100)).is_empty());
        assert!(r.tick(ms(2_000)).is_empty());
        assert_eq!(r.next_deadline(), None);
    }

    #[test]
    fn stale_ticks_are_harmless() {
        let mut r = recognizer();
        for t in [0, 10, 20] {
            assert!(r.tick(ms(t)).is_empty());
        }
        r.release(ms(0), FIELD, p(1.0, 1.0));
        assert_eq!(r.tick(ms(300)).len(), 1);
        assert!(r.tick(ms(300)).is_empty());
        r.reset();
        assert_eq!(r.next_deadline(), None);
    }
}
