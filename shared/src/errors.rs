//! Shared error types for the budget planner

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Serialization failed: {message}")]
    SerializationError { message: String },

    #[error("Deserialization failed: {message}")]
    DeserializationError { message: String },

    #[error("Invalid channel identifier: {input:?}")]
    InvalidChannel { input: String },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },

    #[error("Inconsistent elasticity for {channel}: ci_lower {ci_lower} <= mean {mean} <= ci_upper {ci_upper} violated")]
    InconsistentElasticity {
        channel: String,
        mean: f64,
        ci_lower: f64,
        ci_upper: f64,
    },
}

pub type SharedResult<T> = Result<T, SharedError>;
