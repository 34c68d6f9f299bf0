//! Outbound call resilience.
//!
//! Wraps calls to unreliable downstream services in named pipelines of
//! retry-with-backoff and sliding-window circuit breaking, and exposes
//! `reqwest` clients bound to those pipelines.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::ResilienceConfig;
pub use http::{ClientRegistry, ResilientHttpClient};
pub use lifecycle::Shutdown;
pub use resilience::{
    CircuitBreakerOptions, CircuitState, ResilienceError, ResiliencePipeline, RetryOptions,
};
