//! Shared types for the marketing-mix budget planner
//!
//! Contains the channel/allocation value types used by every component and
//! the request/response contract spoken with the external Model Service.
//! Planner-internal types (projections, workflow, scenarios) are kept in
//! the planner crate.

pub mod types;
pub mod errors;
pub mod logging;
pub mod messages;

pub use types::*;
pub use errors::*;

// Re-export the Model Service contract
pub use messages::{
    // Budget-based optimization
    OptimizeRequest, OptimizeResponse, ExpectedLift,

    // Goal-based planning
    TargetRequest, TargetResponse,

    // Scenario estimates
    ScenarioRequest, ScenarioEstimate,

    // Training collaborator artifacts
    ColumnMapping, ModelConfig, ModelResults, ChannelRoi, HealthStatus,
};
