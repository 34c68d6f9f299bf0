//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Resilience strategies produce:
//!     → events.rs (retry scheduled, circuit opened/half-opened/closed)
//!         → TracingListener → logging.rs subscriber (stderr + rolling file)
//!         → MetricsListener → metrics.rs (counters, gauges)
//!         → ChannelListener → caller-owned event stream
//! Pipelines record per-call counters and latency directly in metrics.rs.
//! ```
//!
//! # Design Decisions
//! - Structured logging via `tracing` fields, never preformatted strings
//! - Execution ID flows through every event of one logical call
//! - Listener failures never reach the call path

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{
    AttemptOutcome, AttemptRecord, ChannelListener, Listeners, MetricsListener,
    ResilienceEvent, ResilienceListener, TracingListener,
};
pub use logging::{init_logging, LoggingError};
