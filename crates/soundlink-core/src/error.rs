//! Error types for the matching engine.

use std::fmt;

/// Error type returned by external collaborators (caches, encoders).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The external collaborator a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collaborator {
    SourceCache,
    TargetCache,
    Encoder,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collaborator::SourceCache => f.write_str("source cache"),
            Collaborator::TargetCache => f.write_str("target cache"),
            Collaborator::Encoder => f.write_str("phonetic encoder"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    #[error("Invalid threshold: {0} (must be 0-1)")]
    InvalidThreshold(f64),

    #[error("Encoder `{encoder}` declares a code length of zero")]
    ZeroCodeLength { encoder: String },

    #[error(
        "Encoder `{encoder}` produced code {code:?} of length {actual} for value {value:?}, expected {expected}"
    )]
    InconsistentCodeLength {
        encoder: String,
        value: String,
        code: String,
        expected: usize,
        actual: usize,
    },

    #[error("{collaborator} failed: {source}")]
    CollaboratorFailure {
        collaborator: Collaborator,
        #[source]
        source: BoxError,
    },

    #[error("Invalid similarity expression {expression:?}: {reason}")]
    InvalidExpression { expression: String, reason: String },
}

impl MapperError {
    pub(crate) fn collaborator(collaborator: Collaborator, source: BoxError) -> Self {
        MapperError::CollaboratorFailure {
            collaborator,
            source,
        }
    }

    /// True for errors raised by a cache or encoder rather than by the engine.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(self, MapperError::CollaboratorFailure { .. })
    }
}
