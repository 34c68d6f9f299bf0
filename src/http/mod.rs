//! Resilient outbound HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! ResilienceConfig
//!     → registry.rs (one pipeline per [[pipelines]] entry, one client per [[clients]] entry)
//!     → client.rs (rebuild the request for every attempt)
//!     → resilience::ResiliencePipeline (retry / circuit breaker)
//!     → classifier.rs (status codes and transport errors → transient?)
//!     → reqwest
//! ```
//!
//! # Design Decisions
//! - A final non-success response is handed back as a response, not an error
//! - Clients naming the same pipeline share its circuit breaker

pub mod classifier;
pub mod client;
pub mod registry;

pub use classifier::{HttpTransientClassifier, StatusOutcome, TransportFailure};
pub use client::{HttpClientError, ResilientHttpClient};
pub use registry::{ClientRegistry, RegistryError};
