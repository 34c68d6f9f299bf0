//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! resilience pipelines and the named HTTP clients that use them.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::{CircuitBreakerOptions, RetryOptions, SamplePlacement};

/// Name of the default retry-only pipeline and client.
pub const HTTP_STATUS: &str = "httpstat.us";
/// Name of the default circuit-breaker pipeline and client.
pub const HTTP_STATUS_CIRCUIT_BREAKER: &str = "httpstat.us-circuit-breaker";

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Log sink settings.
    pub logging: LoggingConfig,

    /// Prometheus exporter settings.
    pub metrics: MetricsConfig,

    /// Named resilience pipelines. A config file replaces the built-in set.
    #[serde(default)]
    pub pipelines: Vec<PipelineConfig>,

    /// Named HTTP clients bound to pipelines.
    #[serde(default)]
    pub clients: Vec<ClientConfig>,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
            pipelines: vec![
                PipelineConfig {
                    name: HTTP_STATUS.to_string(),
                    placement: SamplePlacement::PerCall,
                    retry: Some(RetrySettings::default()),
                    circuit_breaker: None,
                    classifier: ClassifierSettings::default(),
                },
                PipelineConfig {
                    name: HTTP_STATUS_CIRCUIT_BREAKER.to_string(),
                    placement: SamplePlacement::PerCall,
                    retry: Some(RetrySettings {
                        max_attempts: 2,
                        base_delay_ms: 500,
                        ..RetrySettings::default()
                    }),
                    circuit_breaker: Some(CircuitBreakerSettings {
                        failure_ratio: 0.1,
                        minimum_throughput: 5,
                        sampling_duration_secs: 30,
                        break_duration_secs: 15,
                    }),
                    classifier: ClassifierSettings::default(),
                },
            ],
            clients: vec![
                ClientConfig::for_pipeline(HTTP_STATUS),
                ClientConfig::for_pipeline(HTTP_STATUS_CIRCUIT_BREAKER),
            ],
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error).
    pub level: String,

    /// Directory for the daily rolling log file; stderr only when absent.
    pub directory: Option<PathBuf>,

    /// File name prefix of rolled log files.
    pub file_prefix: String,

    /// Number of rolled files to keep.
    pub max_log_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "log".to_string(),
            max_log_files: 10,
        }
    }
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable the Prometheus endpoint.
    pub enabled: bool,

    /// Endpoint bind address.
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// One named resilience pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Pipeline identifier for logging/metrics.
    pub name: String,

    /// Breaker position relative to retry when both are configured.
    #[serde(default)]
    pub placement: SamplePlacement,

    /// Retry strategy; omitted means no retries.
    #[serde(default)]
    pub retry: Option<RetrySettings>,

    /// Circuit breaker strategy; omitted means no breaker.
    #[serde(default)]
    pub circuit_breaker: Option<CircuitBreakerSettings>,

    /// Which HTTP outcomes count as transient failures.
    #[serde(default)]
    pub classifier: ClassifierSettings,
}

/// Retry configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts including the first one.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Add up to 10% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 2000,
            max_delay_ms: 30_000,
            jitter: false,
        }
    }
}

impl From<&RetrySettings> for RetryOptions {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            jitter: settings.jitter,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Failure ratio within the sampling window that opens the circuit.
    pub failure_ratio: f64,

    /// Minimum samples in the window before the ratio applies.
    pub minimum_throughput: u32,

    /// Sampling window length in seconds.
    pub sampling_duration_secs: u64,

    /// Time the circuit stays open in seconds.
    pub break_duration_secs: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_ratio: 0.1,
            minimum_throughput: 100,
            sampling_duration_secs: 30,
            break_duration_secs: 5,
        }
    }
}

impl From<&CircuitBreakerSettings> for CircuitBreakerOptions {
    fn from(settings: &CircuitBreakerSettings) -> Self {
        Self {
            failure_ratio: settings.failure_ratio,
            minimum_throughput: settings.minimum_throughput,
            sampling_duration: Duration::from_secs(settings.sampling_duration_secs),
            break_duration: Duration::from_secs(settings.break_duration_secs),
        }
    }
}

/// Transient-outcome classification for HTTP calls.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// Status codes retried in addition to server errors.
    pub transient_status_codes: Vec<u16>,

    /// Treat every 5xx status as transient.
    pub server_errors_are_transient: bool,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            transient_status_codes: vec![408, 429],
            server_errors_are_transient: true,
        }
    }
}

/// A named HTTP client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Client identifier used for lookups and logs.
    pub name: String,

    /// Pipeline every request of this client runs through.
    pub pipeline: String,

    /// Per-attempt request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header value.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl ClientConfig {
    /// A client named after the pipeline it uses.
    pub fn for_pipeline(pipeline: &str) -> Self {
        Self {
            name: pipeline.to_string(),
            pipeline: pipeline.to_string(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}
