//! Planner-specific error types

use shared::SharedError;
use thiserror::Error;

use crate::core::workflow::WorkflowStage;

#[derive(Error, Debug)]
pub enum PlannerError {
    /// Rejected locally before any Model Service call is made
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Non-success response or transport failure; `message` is surfaced unchanged
    #[error("{message}")]
    Service { message: String },

    #[error("{requested} is locked until its prerequisites exist; continue at {redirect}")]
    StageLocked {
        requested: WorkflowStage,
        redirect: WorkflowStage,
    },

    #[error("Configuration error: {field}")]
    Configuration { field: String },

    #[error("Shared component error: {0}")]
    Shared(#[from] SharedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PlannerError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
        }
    }

    pub fn config(field: impl Into<String>) -> Self {
        Self::Configuration { field: field.into() }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

pub type PlannerResult<T> = Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_message_is_unchanged() {
        let err = PlannerError::service("Model not trained yet");
        assert_eq!(err.to_string(), "Model not trained yet");
    }

    #[test]
    fn test_stage_locked_message() {
        let err = PlannerError::StageLocked {
            requested: WorkflowStage::Optimize,
            redirect: WorkflowStage::Train,
        };
        assert!(err.to_string().contains("Optimize"));
        assert!(err.to_string().contains("Train"));
    }
}
