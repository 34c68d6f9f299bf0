//! Attempt outcomes and the transient-failure classifier.
//!
//! # Responsibilities
//! - Give every strategy the same view of one attempt's result
//! - Decide whether that result counts as a failure for resilience purposes
//!
//! # Design Decisions
//! - Operations return plain `Result<T, E>`; a failing status carried in an
//!   `Ok` value (e.g. an HTTP 503 response) is judged by the classifier
//! - One classifier instance is shared by retry and circuit breaker so both
//!   observe an attempt identically

use std::fmt;

use crate::resilience::ResilienceError;

/// Borrowed view over the result of a single attempt.
#[derive(Debug)]
pub enum Outcome<'a, T, E> {
    /// The operation produced a value.
    Success(&'a T),
    /// The operation produced an error.
    Failure(&'a E),
}

impl<'a, T, E> Outcome<'a, T, E> {
    pub fn from_result(result: &'a Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(error) => Outcome::Failure(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

impl<T, E> Clone for Outcome<'_, T, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, E> Copy for Outcome<'_, T, E> {}

/// Decides whether an outcome is a transient failure.
///
/// Implementations must be pure: the same outcome always yields the same
/// verdict, and classification never has side effects.
pub trait OutcomeClassifier<T, E>: Send + Sync {
    /// Returns true when the outcome is eligible for retry and counts
    /// against the circuit breaker's failure ratio.
    fn is_transient_failure(&self, outcome: Outcome<'_, T, E>) -> bool;

    /// Short human-readable summary used in attempt records and logs.
    fn describe(&self, outcome: Outcome<'_, T, E>) -> String {
        match outcome {
            Outcome::Success(_) => "success".to_string(),
            Outcome::Failure(_) => "failure".to_string(),
        }
    }
}

impl<T, E, F> OutcomeClassifier<T, E> for F
where
    F: Fn(Outcome<'_, T, E>) -> bool + Send + Sync,
{
    fn is_transient_failure(&self, outcome: Outcome<'_, T, E>) -> bool {
        self(outcome)
    }
}

/// Classifier that treats every `Err` as transient and every `Ok` as success.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyError;

impl<T, E: fmt::Display> OutcomeClassifier<T, E> for AnyError {
    fn is_transient_failure(&self, outcome: Outcome<'_, T, E>) -> bool {
        !outcome.is_success()
    }

    fn describe(&self, outcome: Outcome<'_, T, E>) -> String {
        match outcome {
            Outcome::Success(_) => "success".to_string(),
            Outcome::Failure(e) => e.to_string(),
        }
    }
}

/// Classify a chained result. `None` means the result is not a sample at all
/// (the circuit short-circuited or the caller cancelled).
pub(crate) fn classify_result<T, E>(
    classifier: &dyn OutcomeClassifier<T, E>,
    result: &Result<T, ResilienceError<E>>,
) -> Option<bool> {
    match result {
        Ok(value) => Some(classifier.is_transient_failure(Outcome::Success(value))),
        Err(ResilienceError::Inner(error)) => {
            Some(classifier.is_transient_failure(Outcome::Failure(error)))
        }
        Err(_) => None,
    }
}

pub(crate) fn describe_result<T, E>(
    classifier: &dyn OutcomeClassifier<T, E>,
    result: &Result<T, ResilienceError<E>>,
) -> String {
    match result {
        Ok(value) => classifier.describe(Outcome::Success(value)),
        Err(ResilienceError::Inner(error)) => classifier.describe(Outcome::Failure(error)),
        Err(ResilienceError::CircuitOpen { .. }) => "circuit open".to_string(),
        Err(ResilienceError::Cancelled) => "cancelled".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_classifier() {
        let classifier = |outcome: Outcome<'_, u16, String>| match outcome {
            Outcome::Success(status) => *status >= 500,
            Outcome::Failure(_) => true,
        };

        let ok: Result<u16, String> = Ok(200);
        let server_error: Result<u16, String> = Ok(503);
        let err: Result<u16, String> = Err("connection reset".into());

        assert!(!classifier.is_transient_failure(Outcome::from_result(&ok)));
        assert!(classifier.is_transient_failure(Outcome::from_result(&server_error)));
        assert!(classifier.is_transient_failure(Outcome::from_result(&err)));
    }

    #[test]
    fn test_any_error_describes_failure() {
        let err: Result<(), String> = Err("boom".into());
        let outcome = Outcome::from_result(&err);
        assert!(AnyError.is_transient_failure(outcome));
        assert_eq!(AnyError.describe(outcome), "boom");
    }
}
