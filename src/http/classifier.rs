//! Transient-failure classification for HTTP calls.
//!
//! A call is a transient failure when it timed out, could not connect, failed
//! while sending, or produced a 5xx or otherwise configured status code.

use std::fmt;

use crate::config::ClassifierSettings;
use crate::resilience::{Outcome, OutcomeClassifier};

/// A response-like value with an HTTP status code.
pub trait StatusOutcome {
    fn status_code(&self) -> u16;
}

impl StatusOutcome for reqwest::Response {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

/// A transport error that may or may not be worth retrying.
pub trait TransportFailure: fmt::Display {
    fn is_transient(&self) -> bool;
}

impl TransportFailure for reqwest::Error {
    fn is_transient(&self) -> bool {
        self.is_timeout() || self.is_connect() || self.is_request()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpTransientClassifier {
    transient_status_codes: Vec<u16>,
    server_errors_are_transient: bool,
}

impl HttpTransientClassifier {
    pub fn new(transient_status_codes: Vec<u16>, server_errors_are_transient: bool) -> Self {
        Self {
            transient_status_codes,
            server_errors_are_transient,
        }
    }

    pub fn is_transient_status(&self, status: u16) -> bool {
        (self.server_errors_are_transient && (500..=599).contains(&status))
            || self.transient_status_codes.contains(&status)
    }
}

impl Default for HttpTransientClassifier {
    fn default() -> Self {
        Self::from(&ClassifierSettings::default())
    }
}

impl From<&ClassifierSettings> for HttpTransientClassifier {
    fn from(settings: &ClassifierSettings) -> Self {
        Self::new(
            settings.transient_status_codes.clone(),
            settings.server_errors_are_transient,
        )
    }
}

impl<T, E> OutcomeClassifier<T, E> for HttpTransientClassifier
where
    T: StatusOutcome,
    E: TransportFailure,
{
    fn is_transient_failure(&self, outcome: Outcome<'_, T, E>) -> bool {
        match outcome {
            Outcome::Success(response) => self.is_transient_status(response.status_code()),
            Outcome::Failure(error) => error.is_transient(),
        }
    }

    fn describe(&self, outcome: Outcome<'_, T, E>) -> String {
        match outcome {
            Outcome::Success(response) => format!("HTTP {}", response.status_code()),
            Outcome::Failure(error) => error.to_string(),
        }
    }
}
