//! Error taxonomy for resilience strategies.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by a resilience pipeline execution.
///
/// Ordinary transient failures never show up here mid-retry; callers see
/// either the final operation outcome (`Ok` or [`ResilienceError::Inner`]),
/// a circuit short-circuit, or a cancellation.
#[derive(Debug, Error)]
pub enum ResilienceError<E> {
    /// The last attempt's error, returned as-is.
    #[error(transparent)]
    Inner(E),

    /// The circuit is open; the operation was not invoked.
    #[error("circuit for pipeline '{pipeline}' is open, retry after {retry_after:?}")]
    CircuitOpen {
        pipeline: String,
        retry_after: Duration,
    },

    /// The caller cancelled the execution.
    #[error("execution cancelled")]
    Cancelled,
}

impl<E> ResilienceError<E> {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ResilienceError::Cancelled)
    }

    /// Returns the operation error, if this is one.
    pub fn into_inner(self) -> Option<E> {
        match self {
            ResilienceError::Inner(e) => Some(e),
            _ => None,
        }
    }
}

/// Invalid strategy parameters, reported at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("max_attempts must be at least 1 (got {0})")]
    MaxAttempts(u32),

    #[error("base delay {base:?} exceeds max delay {max:?}")]
    DelayCeiling { base: Duration, max: Duration },

    #[error("failure_ratio must be within [0.0, 1.0] (got {0})")]
    FailureRatio(f64),

    #[error("minimum_throughput must be at least 1 (got {0})")]
    MinimumThroughput(u32),

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("pipeline name must not be empty")]
    EmptyName,

    #[error("pipeline '{0}' has strategies but no outcome classifier")]
    MissingClassifier(String),
}
