//! Multi-step goal and shot capture.
//!
//! A goal is recorded as three correlated clicks (field position, net
//! position, time bucket); a shot as a single field click. While a
//! workflow is active only the surface legal for the current step
//! accepts clicks, everything else is rejected without side effects.
//!
//! The workflow never touches the marker store or the ledger itself.
//! Each accepted click yields a [`StepAction`] describing what the
//! caller must record.

use std::fmt;

use crate::ledger::{BucketKey, Row};
use crate::marker::{MarkerColor, Zone};
use crate::sampler::SamplerError;
use crate::types::{BoxId, ImagePoint};

/// What is being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// Field, net and time bucket.
    Goal,
    /// Field position only.
    Shot,
}

impl EventType {
    /// Clicks needed to complete.
    #[must_use]
    pub const fn required_points(self) -> usize {
        match self {
            Self::Goal => 3,
            Self::Shot => 1,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Goal => "Goal",
            Self::Shot => "Shot",
        })
    }
}

/// Side of a goal, fixed by the zone of the first field click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowType {
    /// Goal for the team.
    Scored,
    /// Goal against the team.
    Conceded,
}

impl WorkflowType {
    /// Workflow type implied by a field zone.
    #[must_use]
    pub const fn from_zone(zone: Zone) -> Self {
        match zone {
            Zone::Green => Self::Scored,
            Zone::Red => Self::Conceded,
        }
    }

    /// Net box that must receive the second click.
    #[must_use]
    pub const fn goal_box(self) -> BoxId {
        match self {
            Self::Scored => BoxId::OffenseGoal,
            Self::Conceded => BoxId::DefenseGoal,
        }
    }

    /// Bucket row that must receive the third click.
    #[must_use]
    pub const fn row(self) -> Row {
        match self {
            Self::Scored => Row::Scored,
            Self::Conceded => Row::Conceded,
        }
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Scored => "Scored",
            Self::Conceded => "Conceded",
        })
    }
}

/// Where the workflow is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    /// Nothing in progress.
    Idle,
    /// Waiting for a field click.
    AwaitingField,
    /// Waiting for a click inside the matching net.
    AwaitingGoal,
    /// Waiting for a bucket in the matching row.
    AwaitingTime,
}

/// Monotonic id of a started workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// An accepted step, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectedPoint {
    /// Field click.
    Field(ImagePoint),
    /// Net click.
    Goal {
        /// Net box.
        box_id: BoxId,
        /// Image-relative position.
        point: ImagePoint,
    },
    /// Bucket click.
    Time(BucketKey),
}

/// A click offered to the workflow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Click<'a> {
    /// Click inside one of the four diagram boxes.
    Box {
        /// Box clicked.
        box_id: BoxId,
        /// Image-relative position.
        point: ImagePoint,
    },
    /// Click on a time bucket.
    Bucket(&'a BucketKey),
}

/// Why a click was not accepted. Rejections are never surfaced to the
/// user; the click is simply ignored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// Click fell outside the rendered image.
    #[error("click outside the image")]
    OutsideImage,
    /// Box or bucket not legal for the current step.
    #[error("{0} does not accept clicks at this step")]
    WrongSurface(String),
    /// Legal box, wrong half.
    #[error("click in the {0} zone is not accepted")]
    WrongZone(Zone),
    /// Bucket row does not match the workflow type.
    #[error("bucket {0} is in the wrong row")]
    WrongRow(String),
    /// Net click missed the net interior.
    #[error("click is not on the net interior")]
    NotInterior,
    /// The net image could not be sampled; placement fails closed.
    #[error("net image unavailable: {0}")]
    SamplerUnavailable(SamplerError),
    /// No workflow is active.
    #[error("no workflow is active")]
    Inactive,
}

/// Side effect the caller must apply for an accepted click.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    /// Create an interactive marker.
    Place {
        /// Box to place in.
        box_id: BoxId,
        /// Image-relative position.
        position: ImagePoint,
        /// Marker colour.
        color: MarkerColor,
        /// Marker zone.
        zone: Zone,
        /// Owning player.
        player: String,
    },
    /// Increment the ledger for `player`.
    Tally {
        /// Bucket to increment.
        key: BucketKey,
        /// Player credited.
        player: String,
    },
}

/// A finished workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Id handed out by [`Workflow::start`].
    pub session_id: SessionId,
    /// What was recorded.
    pub event_type: EventType,
    /// Side, for goals.
    pub workflow_type: Option<WorkflowType>,
    /// Player the event was recorded for.
    pub player: String,
}

impl Completion {
    /// Whether the UI should return to the stats page: scored goals and
    /// shots do, conceded goals do not.
    #[must_use]
    pub const fn navigates_back(&self) -> bool {
        match self.event_type {
            EventType::Shot => true,
            EventType::Goal => !matches!(self.workflow_type, Some(WorkflowType::Conceded)),
        }
    }
}

/// Result of an accepted click.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    /// Step recorded, more to come.
    Advanced(StepAction),
    /// Last step recorded; the workflow is idle again.
    Completed(StepAction, Completion),
}

impl Progress {
    /// The action to apply.
    #[must_use]
    pub const fn action(&self) -> &StepAction {
        match self {
            Self::Advanced(action) | Self::Completed(action, _) => action,
        }
    }
}

/// Snapshot for the status indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowStatus {
    /// Current step.
    pub step: WorkflowStep,
    /// Event being recorded.
    pub event_type: Option<EventType>,
    /// Side, once known.
    pub workflow_type: Option<WorkflowType>,
    /// Player.
    pub player: Option<String>,
    /// Accepted clicks.
    pub collected: usize,
    /// Clicks needed.
    pub required: usize,
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(event_type) = self.event_type else {
            return f.write_str("Idle");
        };
        write!(f, "{event_type}")?;
        if let Some(workflow_type) = self.workflow_type {
            write!(f, " · {workflow_type}")?;
        }
        if let Some(player) = &self.player {
            write!(f, " · {player}")?;
        }
        write!(f, " · {}/{}", self.collected, self.required)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ActiveWorkflow {
    session_id: SessionId,
    event_type: EventType,
    workflow_type: Option<WorkflowType>,
    player: String,
    collected: Vec<CollectedPoint>,
}

impl ActiveWorkflow {
    fn step(&self) -> WorkflowStep {
        match (self.event_type, self.collected.len()) {
            (EventType::Shot, _) | (EventType::Goal, 0) => WorkflowStep::AwaitingField,
            (EventType::Goal, 1) => WorkflowStep::AwaitingGoal,
            (EventType::Goal, _) => WorkflowStep::AwaitingTime,
        }
    }
}

/// The single in-progress workflow.
#[derive(Debug, Clone, Default)]
pub struct Workflow {
    active: Option<ActiveWorkflow>,
    next_session: u64,
    zone_threshold: f64,
}

impl Workflow {
    /// Idle workflow splitting the field at `zone_threshold`.
    #[must_use]
    pub const fn new(zone_threshold: f64) -> Self {
        Self {
            active: None,
            next_session: 0,
            zone_threshold,
        }
    }

    /// Start recording `event_type` for `player`. Any workflow already
    /// in progress is dropped.
    pub fn start(&mut self, player: impl Into<String>, event_type: EventType) -> SessionId {
        let player = player.into();
        if let Some(prev) = &self.active {
            log::info!(
                "{} workflow for {} replaced after {}/{} points",
                prev.event_type,
                prev.player,
                prev.collected.len(),
                prev.event_type.required_points()
            );
        }
        self.next_session += 1;
        let session_id = SessionId(self.next_session);
        log::debug!("{event_type} workflow {} started for {player}", session_id.0);
        self.active = Some(ActiveWorkflow {
            session_id,
            event_type,
            workflow_type: None,
            player,
            collected: Vec::new(),
        });
        session_id
    }

    /// Abandon the workflow in progress, if any.
    pub fn cancel(&mut self) {
        if let Some(prev) = self.active.take() {
            log::debug!("{} workflow {} cancelled", prev.event_type, prev.session_id.0);
        }
    }

    /// Whether a workflow is in progress.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Current step.
    #[must_use]
    pub fn step(&self) -> WorkflowStep {
        self.active.as_ref().map_or(WorkflowStep::Idle, ActiveWorkflow::step)
    }

    /// Accepted clicks so far.
    #[must_use]
    pub fn collected(&self) -> &[CollectedPoint] {
        self.active.as_ref().map_or(&[], |a| a.collected.as_slice())
    }

    /// Offer a click to the workflow.
    ///
    /// `interior` is consulted only for net clicks and reports whether
    /// the point lies on the net interior.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] when the click is not legal for the
    /// current step. The workflow is unchanged in that case.
    pub fn accept(
        &mut self,
        click: Click<'_>,
        interior: impl FnOnce(BoxId, ImagePoint) -> Result<bool, SamplerError>,
    ) -> Result<Progress, Rejection> {
        let threshold = self.zone_threshold;
        let active = self.active.as_mut().ok_or(Rejection::Inactive)?;
        let (point, action) = match (active.step(), click) {
            (WorkflowStep::AwaitingField, Click::Box { box_id, point }) => {
                if box_id != BoxId::OffenseField {
                    return Err(Rejection::WrongSurface(box_id.to_string()));
                }
                let zone = Zone::from_position(point.y, threshold);
                let color = match active.event_type {
                    EventType::Shot if zone == Zone::Green => MarkerColor::Scored,
                    EventType::Shot => return Err(Rejection::WrongZone(zone)),
                    EventType::Goal => {
                        active.workflow_type = Some(WorkflowType::from_zone(zone));
                        MarkerColor::Neutral
                    }
                };
                let action = StepAction::Place {
                    box_id,
                    position: point,
                    color,
                    zone,
                    player: active.player.clone(),
                };
                (CollectedPoint::Field(point), action)
            }
            (WorkflowStep::AwaitingGoal, Click::Box { box_id, point }) => {
                let expected = active
                    .workflow_type
                    .map_or(BoxId::OffenseGoal, WorkflowType::goal_box);
                if box_id != expected {
                    return Err(Rejection::WrongSurface(box_id.to_string()));
                }
                match interior(box_id, point) {
                    Ok(true) => {}
                    Ok(false) => return Err(Rejection::NotInterior),
                    Err(e) => return Err(Rejection::SamplerUnavailable(e)),
                }
                let action = StepAction::Place {
                    box_id,
                    position: point,
                    color: MarkerColor::Neutral,
                    zone: Zone::of_click(box_id, point, threshold),
                    player: active.player.clone(),
                };
                (CollectedPoint::Goal { box_id, point }, action)
            }
            (WorkflowStep::AwaitingTime, Click::Bucket(key)) => {
                let expected = active.workflow_type.map_or(Row::Scored, WorkflowType::row);
                if key.row() != expected {
                    return Err(Rejection::WrongRow(key.to_string()));
                }
                let action = StepAction::Tally {
                    key: key.clone(),
                    player: active.player.clone(),
                };
                (CollectedPoint::Time(key.clone()), action)
            }
            (_, Click::Box { box_id, .. }) => return Err(Rejection::WrongSurface(box_id.to_string())),
            (_, Click::Bucket(key)) => return Err(Rejection::WrongSurface(format!("bucket {key}"))),
        };

        active.collected.push(point);
        log::debug!(
            "{} workflow {} accepted point {}/{}",
            active.event_type,
            active.session_id.0,
            active.collected.len(),
            active.event_type.required_points()
        );

        if active.collected.len() < active.event_type.required_points() {
            return Ok(Progress::Advanced(action));
        }

        let done = self.active.take().ok_or(Rejection::Inactive)?;
        let completion = Completion {
            session_id: done.session_id,
            event_type: done.event_type,
            workflow_type: done.workflow_type,
            player: done.player,
        };
        log::info!(
            "{} recorded for {} ({})",
            completion.event_type,
            completion.player,
            completion
                .workflow_type
                .map_or_else(|| "shot".to_owned(), |t| t.to_string())
        );
        Ok(Progress::Completed(action, completion))
    }

    /// Snapshot for the status indicator.
    #[must_use]
    pub fn status(&self) -> WorkflowStatus {
        match &self.active {
            None => WorkflowStatus {
                step: WorkflowStep::Idle,
                event_type: None,
                workflow_type: None,
                player: None,
                collected: 0,
                required: 0,
            },
            Some(active) => WorkflowStatus {
                step: active.step(),
                event_type: Some(active.event_type),
                workflow_type: active.workflow_type,
                player: Some(active.player.clone()),
                collected: active.collected.len(),
                required: active.event_type.required_points(),
            },
        }
    }
}
