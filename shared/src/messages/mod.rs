//! Message types for the planner
//!
//! - `model_service`: request/response contract with the external Model
//!   Service (optimizer, goal solver, scenario estimates, training artifacts)

pub mod model_service;

pub use model_service::{
    ChannelRoi, ColumnMapping, ExpectedLift, HealthStatus, ModelConfig, ModelResults, OptimizeRequest,
    OptimizeResponse, ScenarioEstimate, ScenarioRequest, TargetRequest, TargetResponse,
};
