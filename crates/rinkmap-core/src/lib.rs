//! rinkmap-core: Goal map engine for a hockey stats tracker (sans-IO).
//!
//! Records where goals and shots happen on a rink diagram and when they
//! happen in a game:
//! pointer -> image percent -> gesture -> workflow step ->
//! marker / bucket count -> filtered view -> season export.
//!
//! This crate has **no I/O dependencies** -- persistence goes through
//! the [`Storage`] trait and colour sampling works on in-memory RGBA
//! bitmaps. All browser interaction lives in `rinkmap-io`.

pub mod config;
pub mod filter;
pub mod geometry;
pub mod gesture;
pub mod ledger;
pub mod marker;
pub mod roster;
pub mod sampler;
pub mod season;
pub mod session;
pub mod storage;
pub mod store;
pub mod types;
pub mod workflow;

pub use config::{GoalMapConfig, GoalValueWeights, InteriorCheck, Timing};
pub use filter::{FilterState, GoalieFilter, ScorerFilter};
pub use geometry::{BoxLayout, ImageHit};
pub use gesture::{Gesture, GestureRecognizer};
pub use ledger::{BucketKey, Row, TimeLedger};
pub use marker::{Marker, MarkerColor, Zone};
pub use roster::{Roster, RosterEntry, StatCategory, StatIncrement};
pub use sampler::{ColorSampler, ImageKey, SamplerError};
pub use season::{ExportReport, SeasonData};
pub use session::{BucketAction, Effect, GoalMap, Outcome, Page};
pub use storage::{MemoryStorage, Storage, StorageError};
pub use store::{MarkerId, MarkerStore, PlacedMarker};
pub use types::{BoxId, ContainerPlacement, ImagePoint, Rect, Size};
pub use workflow::{EventType, WorkflowStatus, WorkflowStep, WorkflowType};
