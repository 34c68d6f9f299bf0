//! Retry logic.
//!
//! # Responsibilities
//! - Re-invoke an operation while its outcome is a transient failure
//! - Wait with exponential backoff between attempts
//! - Report every scheduled retry to the pipeline's listeners
//!
//! # Design Decisions
//! - The last outcome is returned as-is once attempts are exhausted; there is
//!   no separate "retries exhausted" error
//! - Circuit-open and cancelled results are never retried
//! - The backoff wait only suspends the calling task and aborts on cancellation

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::time::Instant;

use crate::observability::events::{AttemptOutcome, AttemptRecord, Listeners, ResilienceEvent};
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::outcome::{classify_result, describe_result};
use crate::resilience::pipeline::{BoxOperation, ExecutionContext, ResilienceStrategy};
use crate::resilience::{ConfigurationError, OutcomeClassifier, ResilienceError};

/// Retry parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOptions {
    /// Total number of invocations, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles on every retry.
    pub base_delay: Duration,
    /// Ceiling for the doubled delay.
    pub max_delay: Duration,
    /// Add 0-10% random jitter to every delay.
    pub jitter: bool,
}

impl RetryOptions {
    /// Options with the given attempt budget and base delay, default ceiling
    /// and no jitter.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Result<Self, ConfigurationError> {
        let options = Self {
            max_attempts,
            base_delay,
            ..Self::default()
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_attempts < 1 {
            return Err(ConfigurationError::MaxAttempts(self.max_attempts));
        }
        if self.base_delay > self.max_delay {
            return Err(ConfigurationError::DelayCeiling {
                base: self.base_delay,
                max: self.max_delay,
            });
        }
        Ok(())
    }

    /// Delay before attempt `attempt + 1`, after attempt `attempt` failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay, self.max_delay, self.jitter)
    }
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            jitter: false,
        }
    }
}

/// Bounded retry with exponential backoff.
pub struct RetryStrategy<T, E> {
    options: RetryOptions,
    classifier: Arc<dyn OutcomeClassifier<T, E>>,
    listeners: Listeners,
}

impl<T, E> Clone for RetryStrategy<T, E> {
    fn clone(&self) -> Self {
        Self {
            options: self.options.clone(),
            classifier: self.classifier.clone(),
            listeners: self.listeners.clone(),
        }
    }
}

impl<T, E> RetryStrategy<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new(
        options: RetryOptions,
        classifier: Arc<dyn OutcomeClassifier<T, E>>,
        listeners: Listeners,
    ) -> Result<Self, ConfigurationError> {
        options.validate()?;
        Ok(Self {
            options,
            classifier,
            listeners,
        })
    }

    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    async fn run(
        self,
        next: BoxOperation<T, E>,
        ctx: ExecutionContext,
    ) -> Result<T, ResilienceError<E>> {
        let mut attempt: u32 = 0;
        loop {
            let started = Instant::now();
            let result = next().await;

            let transient = classify_result(self.classifier.as_ref(), &result).unwrap_or(false);
            if !transient || attempt + 1 >= self.options.max_attempts {
                return result;
            }

            let delay = self.options.delay_for(attempt);
            let record = AttemptRecord {
                pipeline: ctx.pipeline.to_string(),
                execution_id: ctx.execution_id,
                attempt,
                outcome: AttemptOutcome::Failure {
                    detail: describe_result(self.classifier.as_ref(), &result),
                },
                duration: started.elapsed(),
                delay,
            };
            // Drop the failed outcome before waiting.
            drop(result);
            self.listeners.emit(&ResilienceEvent::RetryScheduled(record));

            tokio::select! {
                biased;
                _ = ctx.cancellation.cancelled() => {
                    tracing::debug!(
                        pipeline = %ctx.pipeline,
                        execution_id = %ctx.execution_id,
                        attempt,
                        "Backoff wait cancelled"
                    );
                    return Err(ResilienceError::Cancelled);
                }
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}

impl<T, E> ResilienceStrategy<T, E> for RetryStrategy<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn kind(&self) -> &'static str {
        "retry"
    }

    fn execute(
        &self,
        next: BoxOperation<T, E>,
        ctx: ExecutionContext,
    ) -> BoxFuture<'static, Result<T, ResilienceError<E>>> {
        self.clone().run(next, ctx).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_validation() {
        assert!(RetryOptions::new(1, Duration::from_millis(10)).is_ok());
        assert_eq!(
            RetryOptions::new(0, Duration::from_millis(10)),
            Err(ConfigurationError::MaxAttempts(0))
        );

        let options = RetryOptions {
            base_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(1),
            ..RetryOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigurationError::DelayCeiling { .. })
        ));
    }

    #[test]
    fn test_default_matches_three_retries() {
        let options = RetryOptions::default();
        assert_eq!(options.max_attempts, 4);
        assert_eq!(options.delay_for(0), Duration::from_secs(2));
        assert_eq!(options.delay_for(1), Duration::from_secs(4));
        assert_eq!(options.delay_for(2), Duration::from_secs(8));
        assert_eq!(options.delay_for(10), Duration::from_secs(30));
    }

    #[test]
    fn test_sub_millisecond_delays_double() {
        let options = RetryOptions::new(3, Duration::from_micros(500)).unwrap();
        assert_eq!(options.delay_for(0), Duration::from_micros(500));
        assert_eq!(options.delay_for(1), Duration::from_millis(1));
        assert_eq!(options.delay_for(2), Duration::from_millis(2));
    }
}
