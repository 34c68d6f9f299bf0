//! HTTP client whose requests run through a resilience pipeline.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::ClientConfig;
use crate::resilience::{CircuitState, ResilienceError, ResiliencePipeline};

/// Pipeline type shared by HTTP clients.
pub type HttpPipeline = ResiliencePipeline<reqwest::Response, reqwest::Error>;

#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("circuit for pipeline '{pipeline}' is open, retry after {retry_after:?}")]
    CircuitOpen {
        pipeline: String,
        retry_after: Duration,
    },

    #[error("request cancelled")]
    Cancelled,
}

impl HttpClientError {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, HttpClientError::CircuitOpen { .. })
    }
}

impl From<ResilienceError<reqwest::Error>> for HttpClientError {
    fn from(err: ResilienceError<reqwest::Error>) -> Self {
        match err {
            ResilienceError::Inner(e) => HttpClientError::Request(e),
            ResilienceError::CircuitOpen {
                pipeline,
                retry_after,
            } => HttpClientError::CircuitOpen {
                pipeline,
                retry_after,
            },
            ResilienceError::Cancelled => HttpClientError::Cancelled,
        }
    }
}

/// A named `reqwest` client bound to one resilience pipeline.
#[derive(Debug, Clone)]
pub struct ResilientHttpClient {
    name: Arc<str>,
    http: reqwest::Client,
    pipeline: HttpPipeline,
}

impl ResilientHttpClient {
    pub fn new(config: &ClientConfig, pipeline: HttpPipeline) -> Result<Self, HttpClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(HttpClientError::Build)?;

        Ok(Self {
            name: Arc::from(config.name.as_str()),
            http,
            pipeline,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pipeline(&self) -> &HttpPipeline {
        &self.pipeline
    }

    pub fn circuit_state(&self) -> Option<CircuitState> {
        self.pipeline.circuit_state()
    }

    pub async fn get(&self, url: &str) -> Result<reqwest::Response, HttpClientError> {
        self.get_with_cancellation(url, CancellationToken::new())
            .await
    }

    pub async fn get_with_cancellation(
        &self,
        url: &str,
        cancellation: CancellationToken,
    ) -> Result<reqwest::Response, HttpClientError> {
        self.send(reqwest::Method::GET, url, cancellation).await
    }

    /// Send a body-less `method` request to `url` through the pipeline.
    pub async fn send(
        &self,
        method: reqwest::Method,
        url: &str,
        cancellation: CancellationToken,
    ) -> Result<reqwest::Response, HttpClientError> {
        let url = Url::parse(url)?;
        self.send_with(move |http| http.request(method.clone(), url.clone()), cancellation)
            .await
    }

    /// Run the request produced by `build` through the pipeline.
    ///
    /// `build` is called once per attempt since a sent request cannot be
    /// replayed. The last response is returned whatever its status.
    pub async fn send_with<B>(
        &self,
        build: B,
        cancellation: CancellationToken,
    ) -> Result<reqwest::Response, HttpClientError>
    where
        B: Fn(&reqwest::Client) -> reqwest::RequestBuilder + Send + Sync + 'static,
    {
        let http = self.http.clone();
        let name = self.name.clone();

        let operation = move || {
            let http = http.clone();
            let name = name.clone();
            let request = build(&http).build();
            async move {
                let request = request?;
                tracing::info!(
                    client = %name,
                    method = %request.method(),
                    url = %request.url(),
                    "Making HTTP request"
                );
                http.execute(request).await
            }
        };

        let response = self
            .pipeline
            .execute_with_cancellation(operation, cancellation)
            .await?;

        tracing::debug!(
            client = %self.name,
            status = response.status().as_u16(),
            "HTTP request completed"
        );
        Ok(response)
    }
}
