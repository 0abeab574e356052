//! Marketing-mix budget planner
//!
//! A step-gated workflow over a trained marketing-mix model plus a
//! client-side projection engine: given per-channel history and elasticities
//! it projects sales and ROI for any hypothetical allocation without calling
//! the optimizer, and reconciles optimizer answers from the external Model
//! Service under a last-request-wins policy.

pub mod config;
pub mod core;
pub mod error;
pub mod optimization;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::{PlannerConfig, PlannerConfigBuilder};
pub use crate::core::{
    AllocationPreset, ConstraintSet, DatasetSummary, Navigation, PlannerState, Projection, SharedState, StateChange,
    WorkflowStage,
};
pub use error::{PlannerError, PlannerResult};
pub use optimization::{GoalResult, OptimizationOrchestrator, OptimizationResult, RequestOutcome};
pub use services::HttpModelService;
pub use traits::{MockModelService, ModelService};
