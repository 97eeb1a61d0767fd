//! Error types for the simulation harness.

use ghostview_core::InferenceError;
use thiserror::Error;

/// Errors that can occur while building or running a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// An inference module rejected an update
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    /// Board or world parameters out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Scenario name not recognised
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    /// Export file could not be written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Export could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SimError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
