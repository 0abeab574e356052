//! Optimization module: orchestration of Model Service requests and the
//! result types reconciled into session state

pub mod orchestrator;
pub mod types;

pub use orchestrator::{OptimizationOrchestrator, RequestLedger, RequestToken};
pub use types::*;
