//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), or built-in defaults
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ResilienceConfig (validated, immutable)
//!     → http::ClientRegistry builds one pipeline per entry
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, parse_config, ConfigError};
pub use schema::{
    CircuitBreakerSettings, ClassifierSettings, ClientConfig, LoggingConfig, MetricsConfig,
    PipelineConfig, ResilienceConfig, RetrySettings,
};
pub use validation::{validate_config, ValidationError};
