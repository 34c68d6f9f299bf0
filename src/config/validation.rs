//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (clients reference existing pipelines)
//! - Validate value ranges through the strategy options themselves
//! - Detect duplicate names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ResilienceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{PipelineConfig, ResilienceConfig};
use crate::resilience::{CircuitBreakerOptions, ConfigurationError, RetryOptions};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("pipeline #{index} has an empty name")]
    EmptyPipelineName { index: usize },

    #[error("pipeline '{0}' is defined more than once")]
    DuplicatePipeline(String),

    #[error("pipeline '{pipeline}' has invalid {strategy} settings: {source}")]
    InvalidStrategy {
        pipeline: String,
        strategy: &'static str,
        source: ConfigurationError,
    },

    #[error("pipeline '{pipeline}' lists invalid status code {code}")]
    InvalidStatusCode { pipeline: String, code: u16 },

    #[error("client #{index} has an empty name")]
    EmptyClientName { index: usize },

    #[error("client '{0}' is defined more than once")]
    DuplicateClient(String),

    #[error("client '{client}' references unknown pipeline '{pipeline}'")]
    UnknownPipeline { client: String, pipeline: String },

    #[error("client '{0}' has a zero timeout")]
    ZeroTimeout(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),
}

pub fn validate_config(config: &ResilienceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut pipelines = HashSet::new();
    for (index, pipeline) in config.pipelines.iter().enumerate() {
        if pipeline.name.trim().is_empty() {
            errors.push(ValidationError::EmptyPipelineName { index });
        } else if !pipelines.insert(pipeline.name.as_str()) {
            errors.push(ValidationError::DuplicatePipeline(pipeline.name.clone()));
        }
        validate_pipeline(pipeline, &mut errors);
    }

    let mut clients = HashSet::new();
    for (index, client) in config.clients.iter().enumerate() {
        if client.name.trim().is_empty() {
            errors.push(ValidationError::EmptyClientName { index });
        } else if !clients.insert(client.name.as_str()) {
            errors.push(ValidationError::DuplicateClient(client.name.clone()));
        }
        if !pipelines.contains(client.pipeline.as_str()) {
            errors.push(ValidationError::UnknownPipeline {
                client: client.name.clone(),
                pipeline: client.pipeline.clone(),
            });
        }
        if client.timeout_secs == 0 {
            errors.push(ValidationError::ZeroTimeout(client.name.clone()));
        }
    }

    if config.metrics.enabled && config.metrics.address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(config.metrics.address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_pipeline(pipeline: &PipelineConfig, errors: &mut Vec<ValidationError>) {
    if let Some(retry) = &pipeline.retry {
        if let Err(source) = RetryOptions::from(retry).validate() {
            errors.push(ValidationError::InvalidStrategy {
                pipeline: pipeline.name.clone(),
                strategy: "retry",
                source,
            });
        }
    }

    if let Some(breaker) = &pipeline.circuit_breaker {
        if let Err(source) = CircuitBreakerOptions::from(breaker).validate() {
            errors.push(ValidationError::InvalidStrategy {
                pipeline: pipeline.name.clone(),
                strategy: "circuit_breaker",
                source,
            });
        }
    }

    for &code in &pipeline.classifier.transient_status_codes {
        if !(100..=599).contains(&code) {
            errors.push(ValidationError::InvalidStatusCode {
                pipeline: pipeline.name.clone(),
                code,
            });
        }
    }
}
