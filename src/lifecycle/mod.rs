//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Logging → Metrics exporter → Client registry
//!
//! Shutdown (shutdown.rs):
//!     Trigger → cancellation token fires → in-flight executions abort
//!
//! Signals (signals.rs):
//!     Ctrl+C / SIGTERM → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: logging first so later steps are observable
//! - Shutdown is cooperative: pipelines observe the token between and
//!   during attempts

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start, Started, StartupError};
