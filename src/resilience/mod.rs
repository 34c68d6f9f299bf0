//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Caller operation (one attempt per invocation):
//!     → pipeline.rs (compose strategies, outermost first)
//!     → circuit_breaker.rs (fail fast while open, sample outcomes)
//!     → retries.rs (re-invoke transient failures with backoff.rs delays)
//!     → operation
//!
//! Every strategy judges outcomes through the shared classifier (outcome.rs)
//! and reports retries and transitions to the pipeline's listeners.
//! ```
//!
//! # Design Decisions
//! - Strategy state is owned per named pipeline; nothing is global
//! - Invalid parameters fail at construction, never at call time
//! - Callers get the final outcome, a circuit-open rejection, or a
//!   cancellation; mid-retry failures stay internal

pub mod backoff;
pub mod circuit_breaker;
pub mod error;
pub mod outcome;
pub mod pipeline;
pub mod retries;
pub mod window;

use std::fmt;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerOptions};
pub use error::{ConfigurationError, ResilienceError};
pub use outcome::{AnyError, Outcome, OutcomeClassifier};
pub use pipeline::{
    BoxOperation, ExecutionContext, ResiliencePipeline, ResiliencePipelineBuilder,
    ResilienceStrategy, SamplePlacement,
};
pub use retries::{RetryOptions, RetryStrategy};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircuitState {
    /// Calls pass through and are sampled.
    Closed,
    /// Calls are rejected without invoking the operation.
    Open,
    /// A single probe call is allowed through.
    HalfOpen,
}

impl CircuitState {
    /// Gauge value: 0 closed, 1 half-open, 2 open.
    pub fn as_gauge(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "Closed"),
            CircuitState::Open => write!(f, "Open"),
            CircuitState::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}
