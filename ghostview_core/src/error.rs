//! Error types for the GhostView inference core.

use thiserror::Error;

/// Errors that can occur while updating or querying a belief.
///
/// None of these are recovered from internally: a failing update leaves
/// the module's previous belief in place and hands the problem back to the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InferenceError {
    /// Every posterior weight collapsed to zero (evidence impossible under the model)
    #[error("Degenerate belief during {stage}: all weight collapsed to zero")]
    DegenerateBelief { stage: &'static str },

    /// Reading or sensor location outside the game model's domain
    #[error("Invalid evidence: {0}")]
    InvalidEvidence(String),

    /// A dynamic update was requested before `initialize()`
    #[error("Inference module used before initialize()")]
    NotInitialized,

    /// Rejected construction parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl InferenceError {
    /// Creates a degenerate-belief error tagged with the failing stage.
    pub fn degenerate(stage: &'static str) -> Self {
        Self::DegenerateBelief { stage }
    }

    /// Creates an invalid-evidence error.
    pub fn invalid_evidence(msg: impl Into<String>) -> Self {
        Self::InvalidEvidence(msg.into())
    }

    /// Returns true for `DegenerateBelief`.
    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::DegenerateBelief { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = InferenceError::degenerate("observe");
        assert!(err.is_degenerate());
        assert_eq!(
            err.to_string(),
            "Degenerate belief during observe: all weight collapsed to zero"
        );

        let err = InferenceError::invalid_evidence("reading Purple");
        assert!(!err.is_degenerate());
        assert_eq!(err.to_string(), "Invalid evidence: reading Purple");
    }
}
