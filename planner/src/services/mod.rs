//! Service implementations
//!
//! Production implementations of the service traits. These are the only
//! parts of the planner that perform I/O.

pub mod artifacts;
pub mod model_service;

#[cfg(test)]
mod tests;

pub use model_service::HttpModelService;
