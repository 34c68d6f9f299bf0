//! Circuit breaker for downstream protection.
//!
//! # States
//! - Closed: normal operation, calls pass through and are sampled
//! - Open: downstream assumed broken, calls fail fast
//! - Half-Open: a single probe call decides whether to close again
//!
//! # State Transitions
//! ```text
//! Closed → Open: samples >= minimum_throughput and failure ratio >= failure_ratio
//!                within the sampling window
//! Open → Half-Open: first call after break_duration has elapsed
//! Half-Open → Closed: probe outcome is not a transient failure (window cleared)
//! Half-Open → Open: probe outcome is a transient failure (fresh opened-at)
//! ```
//!
//! # Design Decisions
//! - One breaker per named pipeline, never shared across pipelines
//! - State, window and probe slot live under one mutex, never held across `.await`
//! - Single probe in Half-Open; concurrent callers are rejected while it runs
//! - The tripping call still receives its own outcome
//! - Transition events are dispatched after the lock is released

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::time::Instant;

use crate::observability::events::{Listeners, ResilienceEvent};
use crate::resilience::outcome::{classify_result, describe_result};
use crate::resilience::pipeline::{BoxOperation, ExecutionContext, ResilienceStrategy};
use crate::resilience::window::SlidingWindow;
use crate::resilience::{CircuitState, ConfigurationError, OutcomeClassifier, ResilienceError};

/// Circuit breaker parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerOptions {
    /// Failure ratio at or above which the circuit opens.
    pub failure_ratio: f64,
    /// Samples required in the window before the ratio is considered.
    pub minimum_throughput: u32,
    /// Age after which samples leave the window.
    pub sampling_duration: Duration,
    /// Time the circuit stays open before probing.
    pub break_duration: Duration,
}

impl CircuitBreakerOptions {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(0.0..=1.0).contains(&self.failure_ratio) {
            return Err(ConfigurationError::FailureRatio(self.failure_ratio));
        }
        if self.minimum_throughput < 1 {
            return Err(ConfigurationError::MinimumThroughput(self.minimum_throughput));
        }
        if self.sampling_duration.is_zero() {
            return Err(ConfigurationError::ZeroDuration {
                field: "sampling_duration",
            });
        }
        if self.break_duration.is_zero() {
            return Err(ConfigurationError::ZeroDuration {
                field: "break_duration",
            });
        }
        Ok(())
    }
}

impl Default for CircuitBreakerOptions {
    fn default() -> Self {
        Self {
            failure_ratio: 0.1,
            minimum_throughput: 100,
            sampling_duration: Duration::from_secs(30),
            break_duration: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Closed,
    Open { opened_at: Instant },
    HalfOpen { probe_in_flight: bool },
}

#[derive(Debug)]
struct BreakerCore {
    phase: Phase,
    window: SlidingWindow,
}

impl BreakerCore {
    fn state(&self) -> CircuitState {
        match self.phase {
            Phase::Closed => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Permit {
    /// Admitted while Closed; the outcome is sampled.
    Sampled,
    /// The single Half-Open probe.
    Probe,
}

/// Releases the probe slot if the probe never reports back (e.g. the call
/// was dropped or cancelled).
struct ProbeSlot {
    core: Arc<Mutex<BreakerCore>>,
    armed: bool,
}

impl ProbeSlot {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ProbeSlot {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut core = lock(&self.core);
        if let Phase::HalfOpen { probe_in_flight: true } = core.phase {
            core.phase = Phase::HalfOpen {
                probe_in_flight: false,
            };
        }
    }
}

fn lock(core: &Mutex<BreakerCore>) -> MutexGuard<'_, BreakerCore> {
    // Nothing panics while the lock is held; recover the data regardless.
    core.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Three-state circuit breaker driven by a sliding failure-ratio window.
pub struct CircuitBreaker<T, E> {
    options: CircuitBreakerOptions,
    classifier: Arc<dyn OutcomeClassifier<T, E>>,
    listeners: Listeners,
    core: Arc<Mutex<BreakerCore>>,
}

impl<T, E> Clone for CircuitBreaker<T, E> {
    fn clone(&self) -> Self {
        Self {
            options: self.options.clone(),
            classifier: self.classifier.clone(),
            listeners: self.listeners.clone(),
            core: self.core.clone(),
        }
    }
}

impl<T, E> CircuitBreaker<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new(
        options: CircuitBreakerOptions,
        classifier: Arc<dyn OutcomeClassifier<T, E>>,
        listeners: Listeners,
    ) -> Result<Self, ConfigurationError> {
        options.validate()?;
        let core = BreakerCore {
            phase: Phase::Closed,
            window: SlidingWindow::new(options.sampling_duration),
        };
        Ok(Self {
            options,
            classifier,
            listeners,
            core: Arc::new(Mutex::new(core)),
        })
    }

    pub fn options(&self) -> &CircuitBreakerOptions {
        &self.options
    }

    /// Current state. An expired Open state stays Open until the next call.
    pub fn state(&self) -> CircuitState {
        lock(&self.core).state()
    }

    /// `(failures, total)` samples currently in the window.
    pub fn window_counts(&self) -> (usize, usize) {
        let mut core = lock(&self.core);
        core.window.evict(Instant::now());
        (core.window.failures(), core.window.total())
    }

    fn admit(
        &self,
        ctx: &ExecutionContext,
    ) -> Result<(Permit, Option<ResilienceEvent>), ResilienceError<E>> {
        let mut core = lock(&self.core);
        let now = Instant::now();

        match core.phase {
            Phase::Closed => Ok((Permit::Sampled, None)),
            Phase::Open { opened_at } => {
                let elapsed = now.saturating_duration_since(opened_at);
                if elapsed < self.options.break_duration {
                    return Err(ResilienceError::CircuitOpen {
                        pipeline: ctx.pipeline.to_string(),
                        retry_after: self.options.break_duration - elapsed,
                    });
                }
                core.phase = Phase::HalfOpen {
                    probe_in_flight: true,
                };
                Ok((
                    Permit::Probe,
                    Some(ResilienceEvent::CircuitHalfOpened {
                        pipeline: ctx.pipeline.to_string(),
                        execution_id: ctx.execution_id,
                    }),
                ))
            }
            Phase::HalfOpen { probe_in_flight: true } => Err(ResilienceError::CircuitOpen {
                pipeline: ctx.pipeline.to_string(),
                retry_after: Duration::ZERO,
            }),
            Phase::HalfOpen { probe_in_flight: false } => {
                core.phase = Phase::HalfOpen {
                    probe_in_flight: true,
                };
                Ok((Permit::Probe, None))
            }
        }
    }

    /// Record a finished call and apply any resulting transition.
    fn settle(
        &self,
        permit: Permit,
        failed: bool,
        result: &Result<T, ResilienceError<E>>,
        ctx: &ExecutionContext,
    ) -> Option<ResilienceEvent> {
        let mut core = lock(&self.core);
        let now = Instant::now();

        match (permit, core.phase) {
            (Permit::Probe, Phase::HalfOpen { .. }) if failed => {
                core.phase = Phase::Open { opened_at: now };
                Some(self.opened_event(result, ctx))
            }
            (Permit::Probe, Phase::HalfOpen { .. }) => {
                core.phase = Phase::Closed;
                core.window.clear();
                Some(ResilienceEvent::CircuitClosed {
                    pipeline: ctx.pipeline.to_string(),
                    execution_id: ctx.execution_id,
                    outcome: describe_result(self.classifier.as_ref(), result),
                })
            }
            (Permit::Sampled, Phase::Closed) => {
                core.window.record(now, failed);
                let tripped = core.window.total() >= self.options.minimum_throughput as usize
                    && core.window.failure_ratio() >= self.options.failure_ratio;
                if !tripped {
                    return None;
                }
                tracing::debug!(
                    pipeline = %ctx.pipeline,
                    failures = core.window.failures(),
                    total = core.window.total(),
                    "Failure ratio threshold reached"
                );
                core.phase = Phase::Open { opened_at: now };
                Some(self.opened_event(result, ctx))
            }
            // The circuit moved on while this call was in flight.
            _ => None,
        }
    }

    fn opened_event(
        &self,
        result: &Result<T, ResilienceError<E>>,
        ctx: &ExecutionContext,
    ) -> ResilienceEvent {
        ResilienceEvent::CircuitOpened {
            pipeline: ctx.pipeline.to_string(),
            execution_id: ctx.execution_id,
            break_duration: self.options.break_duration,
            outcome: describe_result(self.classifier.as_ref(), result),
        }
    }

    async fn run(
        self,
        next: BoxOperation<T, E>,
        ctx: ExecutionContext,
    ) -> Result<T, ResilienceError<E>> {
        let (permit, half_opened) = self.admit(&ctx)?;
        if let Some(event) = half_opened {
            self.listeners.emit(&event);
        }

        let slot = ProbeSlot {
            core: self.core.clone(),
            armed: permit == Permit::Probe,
        };

        let result = next().await;

        // Short-circuits and cancellations from inner strategies are not samples.
        if let Some(failed) = classify_result(self.classifier.as_ref(), &result) {
            let transition = self.settle(permit, failed, &result, &ctx);
            slot.disarm();
            if let Some(event) = transition {
                self.listeners.emit(&event);
            }
        }

        result
    }
}

impl<T, E> ResilienceStrategy<T, E> for CircuitBreaker<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn kind(&self) -> &'static str {
        "circuit_breaker"
    }

    fn execute(
        &self,
        next: BoxOperation<T, E>,
        ctx: ExecutionContext,
    ) -> BoxFuture<'static, Result<T, ResilienceError<E>>> {
        self.clone().run(next, ctx).boxed()
    }
}
