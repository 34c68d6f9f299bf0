//! Strategy composition.
//!
//! # Responsibilities
//! - Define the seam every resilience strategy implements
//! - Fold an ordered list of strategies (outermost first) around one operation
//! - Build validated pipelines from strategy options
//!
//! # Design Decisions
//! - Operations are re-invocable factories; each call yields one attempt
//! - Strategies are built once per named pipeline and shared by all callers
//! - The reference composition places the breaker outside the retry loop, so
//!   the breaker samples one outcome per logical call

use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::observability::events::{Listeners, ResilienceListener};
use crate::observability::metrics;
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerOptions};
use crate::resilience::retries::{RetryOptions, RetryStrategy};
use crate::resilience::{CircuitState, ConfigurationError, OutcomeClassifier, ResilienceError};

/// A re-invocable operation as seen by strategies.
pub type BoxOperation<T, E> =
    Arc<dyn Fn() -> BoxFuture<'static, Result<T, ResilienceError<E>>> + Send + Sync>;

/// Per-execution data shared by every strategy in the chain.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub pipeline: Arc<str>,
    pub execution_id: Uuid,
    pub cancellation: CancellationToken,
}

/// A strategy wraps the next element of the chain.
pub trait ResilienceStrategy<T, E>: Send + Sync {
    /// Short identifier used in logs.
    fn kind(&self) -> &'static str;

    fn execute(
        &self,
        next: BoxOperation<T, E>,
        ctx: ExecutionContext,
    ) -> BoxFuture<'static, Result<T, ResilienceError<E>>>;
}

/// Where the circuit breaker sits relative to the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SamplePlacement {
    /// Breaker outside retry: one sample per logical call.
    #[default]
    PerCall,
    /// Breaker inside retry: one sample per physical attempt.
    PerAttempt,
}

/// An ordered chain of strategies applied to single logical operations.
pub struct ResiliencePipeline<T, E> {
    name: Arc<str>,
    strategies: Vec<Arc<dyn ResilienceStrategy<T, E>>>,
    breaker: Option<CircuitBreaker<T, E>>,
}

impl<T, E> Clone for ResiliencePipeline<T, E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            strategies: self.strategies.clone(),
            breaker: self.breaker.clone(),
        }
    }
}

impl<T, E> std::fmt::Debug for ResiliencePipeline<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<&str> = self.strategies.iter().map(|s| s.kind()).collect();
        f.debug_struct("ResiliencePipeline")
            .field("name", &self.name)
            .field("strategies", &kinds)
            .finish()
    }
}

impl<T, E> ResiliencePipeline<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn builder(name: impl Into<String>) -> ResiliencePipelineBuilder<T, E> {
        ResiliencePipelineBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Strategy kinds, outermost first.
    pub fn strategy_kinds(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// State of the pipeline's circuit breaker, if it has one.
    pub fn circuit_state(&self) -> Option<CircuitState> {
        self.breaker.as_ref().map(|b| b.state())
    }

    pub fn circuit_breaker(&self) -> Option<&CircuitBreaker<T, E>> {
        self.breaker.as_ref()
    }

    /// Run `operation` through the pipeline.
    pub async fn execute<F, Fut>(&self, operation: F) -> Result<T, ResilienceError<E>>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.execute_with_cancellation(operation, CancellationToken::new())
            .await
    }

    /// Run `operation` through the pipeline, aborting with
    /// [`ResilienceError::Cancelled`] once `cancellation` fires.
    pub async fn execute_with_cancellation<F, Fut>(
        &self,
        operation: F,
        cancellation: CancellationToken,
    ) -> Result<T, ResilienceError<E>>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let ctx = ExecutionContext {
            pipeline: self.name.clone(),
            execution_id: Uuid::new_v4(),
            cancellation,
        };

        let chain = self.compose(operation, &ctx);
        let started = Instant::now();

        let result = tokio::select! {
            biased;
            _ = ctx.cancellation.cancelled() => Err(ResilienceError::Cancelled),
            result = chain() => result,
        };

        metrics::record_execution(&self.name, execution_label(&result), started.elapsed());
        result
    }

    fn compose<F, Fut>(&self, operation: F, ctx: &ExecutionContext) -> BoxOperation<T, E>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let innermost: BoxOperation<T, E> = Arc::new(move || {
            let attempt = operation();
            async move { attempt.await.map_err(ResilienceError::Inner) }.boxed()
        });

        self.strategies
            .iter()
            .rev()
            .fold(innermost, |next, strategy| {
                let strategy = strategy.clone();
                let ctx = ctx.clone();
                let wrapped: BoxOperation<T, E> =
                    Arc::new(move || strategy.execute(next.clone(), ctx.clone()));
                wrapped
            })
    }
}

fn execution_label<T, E>(result: &Result<T, ResilienceError<E>>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(ResilienceError::Inner(_)) => "error",
        Err(ResilienceError::CircuitOpen { .. }) => "circuit_open",
        Err(ResilienceError::Cancelled) => "cancelled",
    }
}

enum StrategyOptions {
    Retry(RetryOptions),
    CircuitBreaker(CircuitBreakerOptions),
}

/// Builds a [`ResiliencePipeline`]; strategies are added outermost first.
pub struct ResiliencePipelineBuilder<T, E> {
    name: String,
    classifier: Option<Arc<dyn OutcomeClassifier<T, E>>>,
    strategies: Vec<StrategyOptions>,
    listeners: Vec<Arc<dyn ResilienceListener>>,
}

impl<T, E> ResiliencePipelineBuilder<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classifier: None,
            strategies: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Classifier shared by every strategy of the pipeline.
    pub fn classifier(mut self, classifier: impl OutcomeClassifier<T, E> + 'static) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    pub fn shared_classifier(mut self, classifier: Arc<dyn OutcomeClassifier<T, E>>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn add_retry(mut self, options: RetryOptions) -> Self {
        self.strategies.push(StrategyOptions::Retry(options));
        self
    }

    pub fn add_circuit_breaker(mut self, options: CircuitBreakerOptions) -> Self {
        self.strategies.push(StrategyOptions::CircuitBreaker(options));
        self
    }

    /// Add retry and circuit breaker in the order `placement` asks for.
    pub fn add_retry_and_circuit_breaker(
        self,
        retry: RetryOptions,
        breaker: CircuitBreakerOptions,
        placement: SamplePlacement,
    ) -> Self {
        match placement {
            SamplePlacement::PerCall => self.add_circuit_breaker(breaker).add_retry(retry),
            SamplePlacement::PerAttempt => self.add_retry(retry).add_circuit_breaker(breaker),
        }
    }

    pub fn listener(mut self, listener: impl ResilienceListener + 'static) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    pub fn shared_listener(mut self, listener: Arc<dyn ResilienceListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn build(self) -> Result<ResiliencePipeline<T, E>, ConfigurationError> {
        if self.name.trim().is_empty() {
            return Err(ConfigurationError::EmptyName);
        }

        let listeners = Listeners::new(self.listeners);
        let mut strategies: Vec<Arc<dyn ResilienceStrategy<T, E>>> = Vec::new();
        let mut breaker = None;

        if !self.strategies.is_empty() {
            let classifier = self
                .classifier
                .ok_or_else(|| ConfigurationError::MissingClassifier(self.name.clone()))?;

            for options in self.strategies {
                match options {
                    StrategyOptions::Retry(options) => {
                        let retry =
                            RetryStrategy::new(options, classifier.clone(), listeners.clone())?;
                        strategies.push(Arc::new(retry));
                    }
                    StrategyOptions::CircuitBreaker(options) => {
                        let cb =
                            CircuitBreaker::new(options, classifier.clone(), listeners.clone())?;
                        if breaker.is_none() {
                            breaker = Some(cb.clone());
                        }
                        strategies.push(Arc::new(cb));
                    }
                }
            }
        }

        let pipeline = ResiliencePipeline {
            name: Arc::from(self.name),
            strategies,
            breaker,
        };
        tracing::debug!(pipeline = ?pipeline, "Resilience pipeline built");
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::AnyError;
    use std::time::Duration;

    #[test]
    fn test_build_requires_classifier() {
        let result = ResiliencePipeline::<(), String>::builder("orders")
            .add_retry(RetryOptions::default())
            .build();
        assert_eq!(
            result.err(),
            Some(ConfigurationError::MissingClassifier("orders".into()))
        );
    }

    #[test]
    fn test_build_rejects_empty_name() {
        let result = ResiliencePipeline::<(), String>::builder("  ").build();
        assert_eq!(result.err(), Some(ConfigurationError::EmptyName));
    }

    #[test]
    fn test_build_surfaces_invalid_options() {
        let result = ResiliencePipeline::<(), String>::builder("orders")
            .classifier(AnyError)
            .add_circuit_breaker(CircuitBreakerOptions {
                minimum_throughput: 0,
                ..CircuitBreakerOptions::default()
            })
            .build();
        assert_eq!(result.err(), Some(ConfigurationError::MinimumThroughput(0)));
    }

    #[test]
    fn test_placement_orders_strategies() {
        let retry = RetryOptions::new(3, Duration::from_millis(10)).unwrap();
        let breaker = CircuitBreakerOptions::default();

        let per_call = ResiliencePipeline::<(), String>::builder("a")
            .classifier(AnyError)
            .add_retry_and_circuit_breaker(retry.clone(), breaker.clone(), SamplePlacement::PerCall)
            .build()
            .unwrap();
        assert_eq!(per_call.strategy_kinds(), vec!["circuit_breaker", "retry"]);
        assert_eq!(per_call.circuit_state(), Some(CircuitState::Closed));

        let per_attempt = ResiliencePipeline::<(), String>::builder("b")
            .classifier(AnyError)
            .add_retry_and_circuit_breaker(retry, breaker, SamplePlacement::PerAttempt)
            .build()
            .unwrap();
        assert_eq!(per_attempt.strategy_kinds(), vec!["retry", "circuit_breaker"]);
    }

    #[test]
    fn test_empty_pipeline_needs_no_classifier() {
        let pipeline = ResiliencePipeline::<(), String>::builder("passthrough")
            .build()
            .unwrap();
        assert!(pipeline.strategy_kinds().is_empty());
        assert_eq!(pipeline.circuit_state(), None);
    }
}
