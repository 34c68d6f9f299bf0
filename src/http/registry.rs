//! Named clients and the pipelines they share.
//!
//! # Responsibilities
//! - Build one resilience pipeline per configured pipeline entry
//! - Build one HTTP client per configured client entry
//! - Look clients up by name
//!
//! # Design Decisions
//! - Built once at startup; lookups never construct anything
//! - Every pipeline logs and records metrics for its events

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{PipelineConfig, ResilienceConfig};
use crate::http::classifier::HttpTransientClassifier;
use crate::http::client::{HttpClientError, HttpPipeline, ResilientHttpClient};
use crate::observability::events::{MetricsListener, ResilienceListener, TracingListener};
use crate::resilience::ConfigurationError;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("pipeline '{pipeline}': {source}")]
    Pipeline {
        pipeline: String,
        source: ConfigurationError,
    },

    #[error("client '{client}' references unknown pipeline '{pipeline}'")]
    UnknownPipeline { client: String, pipeline: String },

    #[error("client '{client}': {source}")]
    Client {
        client: String,
        source: HttpClientError,
    },

    #[error("unknown client '{0}'")]
    UnknownClient(String),
}

#[derive(Debug, Default)]
pub struct ClientRegistry {
    pipelines: HashMap<String, HttpPipeline>,
    clients: HashMap<String, ResilientHttpClient>,
}

impl ClientRegistry {
    pub fn from_config(config: &ResilienceConfig) -> Result<Self, RegistryError> {
        Self::with_listeners(config, &[])
    }

    /// Like [`ClientRegistry::from_config`], attaching `listeners` to every
    /// pipeline in addition to logging and metrics.
    pub fn with_listeners(
        config: &ResilienceConfig,
        listeners: &[Arc<dyn ResilienceListener>],
    ) -> Result<Self, RegistryError> {
        let mut pipelines = HashMap::new();
        for pipeline in &config.pipelines {
            let built = build_pipeline(pipeline, listeners).map_err(|source| {
                RegistryError::Pipeline {
                    pipeline: pipeline.name.clone(),
                    source,
                }
            })?;
            pipelines.insert(pipeline.name.clone(), built);
        }

        let mut clients = HashMap::new();
        for client in &config.clients {
            let pipeline = pipelines
                .get(&client.pipeline)
                .cloned()
                .ok_or_else(|| RegistryError::UnknownPipeline {
                    client: client.name.clone(),
                    pipeline: client.pipeline.clone(),
                })?;
            let built = ResilientHttpClient::new(client, pipeline).map_err(|source| {
                RegistryError::Client {
                    client: client.name.clone(),
                    source,
                }
            })?;
            clients.insert(client.name.clone(), built);
        }

        tracing::info!(
            pipelines = pipelines.len(),
            clients = clients.len(),
            "Client registry initialized"
        );
        Ok(Self { pipelines, clients })
    }

    pub fn client(&self, name: &str) -> Result<&ResilientHttpClient, RegistryError> {
        self.clients
            .get(name)
            .ok_or_else(|| RegistryError::UnknownClient(name.to_string()))
    }

    pub fn pipeline(&self, name: &str) -> Option<&HttpPipeline> {
        self.pipelines.get(name)
    }

    /// Client names in sorted order.
    pub fn client_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.clients.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Build the pipeline a [`PipelineConfig`] describes.
pub fn build_pipeline(
    config: &PipelineConfig,
    listeners: &[Arc<dyn ResilienceListener>],
) -> Result<HttpPipeline, ConfigurationError> {
    let mut builder = HttpPipeline::builder(config.name.as_str())
        .classifier(HttpTransientClassifier::from(&config.classifier))
        .listener(TracingListener)
        .listener(MetricsListener);
    for listener in listeners {
        builder = builder.shared_listener(listener.clone());
    }

    let builder = match (&config.retry, &config.circuit_breaker) {
        (Some(retry), Some(breaker)) => {
            builder.add_retry_and_circuit_breaker(retry.into(), breaker.into(), config.placement)
        }
        (Some(retry), None) => builder.add_retry(retry.into()),
        (None, Some(breaker)) => builder.add_circuit_breaker(breaker.into()),
        (None, None) => builder,
    };
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{HTTP_STATUS, HTTP_STATUS_CIRCUIT_BREAKER};
    use crate::resilience::CircuitState;

    #[test]
    fn test_default_registry() {
        let registry = ClientRegistry::from_config(&ResilienceConfig::default()).unwrap();
        assert_eq!(
            registry.client_names(),
            vec![HTTP_STATUS, HTTP_STATUS_CIRCUIT_BREAKER]
        );

        let retry_only = registry.client(HTTP_STATUS).unwrap();
        assert_eq!(retry_only.pipeline().strategy_kinds(), vec!["retry"]);
        assert_eq!(retry_only.circuit_state(), None);

        let guarded = registry.client(HTTP_STATUS_CIRCUIT_BREAKER).unwrap();
        assert_eq!(
            guarded.pipeline().strategy_kinds(),
            vec!["circuit_breaker", "retry"]
        );
        assert_eq!(guarded.circuit_state(), Some(CircuitState::Closed));
    }

    #[test]
    fn test_unknown_client() {
        let registry = ClientRegistry::from_config(&ResilienceConfig::default()).unwrap();
        assert!(matches!(
            registry.client("nope"),
            Err(RegistryError::UnknownClient(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_unknown_pipeline_reference() {
        let mut config = ResilienceConfig::default();
        config.clients[0].pipeline = "missing".into();
        assert!(matches!(
            ClientRegistry::from_config(&config),
            Err(RegistryError::UnknownPipeline { .. })
        ));
    }
}
