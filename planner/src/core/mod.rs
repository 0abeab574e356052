//! Core business logic modules
//!
//! Pure computation plus the session state container. No I/O: the only
//! external collaborator is reached through `traits::ModelService`.

pub mod constraints;
pub mod projection;
pub mod response;
pub mod scenarios;
pub mod state;
pub mod workflow;

pub use constraints::{BoundsViolation, ChannelBounds, ConstraintSet};
pub use projection::{ChannelDelta, Projection, ProjectionComparison, WaterfallStep};
pub use scenarios::{SavedScenario, ScenarioBook, ScenarioComparisonRow};
pub use state::{AllocationPreset, PlannerState, SharedState, StateChange};
pub use workflow::{Artifact, DatasetSummary, Navigation, WorkflowStage, WorkflowStateMachine};
