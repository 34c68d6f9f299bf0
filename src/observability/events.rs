//! Resilience event stream.
//!
//! # Responsibilities
//! - Describe retry attempts and circuit state transitions
//! - Fan events out to injected listeners
//!
//! # Design Decisions
//! - Events are plain data, decoupled from the operation's value types
//! - A listener can never fail or block the state machine: dispatch happens
//!   outside the breaker lock and panics are caught and logged

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::observability::metrics;
use crate::resilience::CircuitState;

/// Summary of one attempt's outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure { detail: String },
}

/// One retried attempt, emitted before the backoff wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub pipeline: String,
    pub execution_id: Uuid,
    /// 0-indexed attempt that just finished.
    pub attempt: u32,
    pub outcome: AttemptOutcome,
    /// How long the attempt took.
    pub duration: Duration,
    /// Delay before the next attempt.
    pub delay: Duration,
}

/// Observable resilience events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResilienceEvent {
    RetryScheduled(AttemptRecord),
    CircuitOpened {
        pipeline: String,
        execution_id: Uuid,
        break_duration: Duration,
        /// Outcome that tripped the circuit.
        outcome: String,
    },
    CircuitHalfOpened {
        pipeline: String,
        execution_id: Uuid,
    },
    CircuitClosed {
        pipeline: String,
        execution_id: Uuid,
        outcome: String,
    },
}

impl ResilienceEvent {
    pub fn pipeline(&self) -> &str {
        match self {
            ResilienceEvent::RetryScheduled(record) => &record.pipeline,
            ResilienceEvent::CircuitOpened { pipeline, .. }
            | ResilienceEvent::CircuitHalfOpened { pipeline, .. }
            | ResilienceEvent::CircuitClosed { pipeline, .. } => pipeline,
        }
    }

    /// The state entered, for transition events.
    pub fn circuit_state(&self) -> Option<CircuitState> {
        match self {
            ResilienceEvent::RetryScheduled(_) => None,
            ResilienceEvent::CircuitOpened { .. } => Some(CircuitState::Open),
            ResilienceEvent::CircuitHalfOpened { .. } => Some(CircuitState::HalfOpen),
            ResilienceEvent::CircuitClosed { .. } => Some(CircuitState::Closed),
        }
    }
}

/// Receives resilience events. Implementations must return quickly.
pub trait ResilienceListener: Send + Sync {
    fn on_event(&self, event: &ResilienceEvent);
}

impl<F> ResilienceListener for F
where
    F: Fn(&ResilienceEvent) + Send + Sync,
{
    fn on_event(&self, event: &ResilienceEvent) {
        self(event)
    }
}

/// The set of listeners attached to one pipeline.
#[derive(Clone, Default)]
pub struct Listeners {
    inner: Arc<Vec<Arc<dyn ResilienceListener>>>,
}

impl Listeners {
    pub fn new(listeners: Vec<Arc<dyn ResilienceListener>>) -> Self {
        Self {
            inner: Arc::new(listeners),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Deliver an event to every listener, swallowing listener panics.
    pub fn emit(&self, event: &ResilienceEvent) {
        for listener in self.inner.iter() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(event)));
            if result.is_err() {
                tracing::error!(
                    pipeline = %event.pipeline(),
                    event = ?event,
                    "Resilience listener panicked; event dropped for this listener"
                );
            }
        }
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners").field("count", &self.inner.len()).finish()
    }
}

/// Writes structured log lines for every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl ResilienceListener for TracingListener {
    fn on_event(&self, event: &ResilienceEvent) {
        match event {
            ResilienceEvent::RetryScheduled(record) => {
                let detail = match &record.outcome {
                    AttemptOutcome::Success => "success",
                    AttemptOutcome::Failure { detail } => detail.as_str(),
                };
                tracing::warn!(
                    pipeline = %record.pipeline,
                    execution_id = %record.execution_id,
                    attempt = record.attempt,
                    outcome = %detail,
                    duration = ?record.duration,
                    delay = ?record.delay,
                    "Attempt failed; retrying after backoff"
                );
            }
            ResilienceEvent::CircuitOpened {
                pipeline,
                execution_id,
                break_duration,
                outcome,
            } => {
                tracing::warn!(
                    pipeline = %pipeline,
                    execution_id = %execution_id,
                    outcome = %outcome,
                    break_duration = ?break_duration,
                    "Circuit transitioned to Open"
                );
            }
            ResilienceEvent::CircuitHalfOpened {
                pipeline,
                execution_id,
            } => {
                tracing::warn!(
                    pipeline = %pipeline,
                    execution_id = %execution_id,
                    "Circuit transitioned to HalfOpen"
                );
            }
            ResilienceEvent::CircuitClosed {
                pipeline,
                execution_id,
                outcome,
            } => {
                tracing::warn!(
                    pipeline = %pipeline,
                    execution_id = %execution_id,
                    outcome = %outcome,
                    "Circuit transitioned to Closed"
                );
            }
        }
    }
}

/// Forwards events onto an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<ResilienceEvent>,
}

impl ChannelListener {
    /// Create a listener and the receiving end of its event stream.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ResilienceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ResilienceListener for ChannelListener {
    fn on_event(&self, event: &ResilienceEvent) {
        // Receiver gone: nobody is interested any more.
        let _ = self.tx.send(event.clone());
    }
}

/// Records counters and gauges for every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsListener;

impl ResilienceListener for MetricsListener {
    fn on_event(&self, event: &ResilienceEvent) {
        match event.circuit_state() {
            Some(state) => metrics::record_circuit_transition(event.pipeline(), state),
            None => metrics::record_retry(event.pipeline()),
        }
    }
}
