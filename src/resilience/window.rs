//! Time-bounded sample window for failure-ratio tracking.
//!
//! Samples older than the sampling duration are evicted lazily whenever the
//! window is read or written. The window is owned by exactly one circuit
//! breaker and only touched under that breaker's lock.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
pub struct SlidingWindow {
    sampling_duration: Duration,
    samples: VecDeque<(Instant, bool)>,
    failures: usize,
}

impl SlidingWindow {
    pub fn new(sampling_duration: Duration) -> Self {
        Self {
            sampling_duration,
            samples: VecDeque::new(),
            failures: 0,
        }
    }

    /// Record one sample taken at `now`.
    pub fn record(&mut self, now: Instant, failed: bool) {
        self.evict(now);
        self.samples.push_back((now, failed));
        if failed {
            self.failures += 1;
        }
    }

    /// Drop samples that fell out of the window.
    pub fn evict(&mut self, now: Instant) {
        while let Some(&(at, failed)) = self.samples.front() {
            if now.saturating_duration_since(at) < self.sampling_duration {
                break;
            }
            self.samples.pop_front();
            if failed {
                self.failures -= 1;
            }
        }
    }

    pub fn total(&self) -> usize {
        self.samples.len()
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Failure ratio of the samples currently held (0.0 when empty).
    pub fn failure_ratio(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.failures as f64 / self.samples.len() as f64
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.failures = 0;
    }
}
