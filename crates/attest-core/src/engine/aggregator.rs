//! Per-run sample accumulator.
//!
//! Owned exclusively by the driver for the duration of one run; not
//! thread-safe, not reusable. Termination is sticky: the first reason set
//! wins and later calls are ignored.

use crate::model::TerminationReason;
use std::time::Instant;

#[derive(Debug)]
pub struct SampleAggregator {
    total_samples: u64,
    successes: u64,
    failures: u64,
    max_example_failures: usize,
    example_failures: Vec<String>,
    started: Instant,
    termination: Option<(TerminationReason, Option<String>)>,
    forced_failure: bool,
}

impl SampleAggregator {
    pub fn new(total_samples: u64, max_example_failures: usize) -> Self {
        Self {
            total_samples,
            successes: 0,
            failures: 0,
            max_example_failures,
            example_failures: Vec::new(),
            started: Instant::now(),
            termination: None,
            forced_failure: false,
        }
    }

    pub fn record_success(&mut self) {
        debug_assert!(self.samples_executed() < self.total_samples);
        self.successes += 1;
    }

    /// Records a failure; the cause is retained only while the example
    /// window has room.
    pub fn record_failure(&mut self, cause: Option<String>) {
        debug_assert!(self.samples_executed() < self.total_samples);
        self.failures += 1;
        if let Some(cause) = cause {
            if self.example_failures.len() < self.max_example_failures {
                self.example_failures.push(cause);
            }
        }
    }

    /// First reason wins; subsequent calls are no-ops.
    pub fn set_terminated(&mut self, reason: TerminationReason, details: Option<String>) {
        if self.termination.is_none() {
            self.termination = Some((reason, details));
        }
    }

    pub fn set_completed(&mut self) {
        self.set_terminated(TerminationReason::Completed, None);
    }

    pub fn set_forced_failure(&mut self, forced: bool) {
        self.forced_failure = forced;
    }

    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    pub fn successes(&self) -> u64 {
        self.successes
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn samples_executed(&self) -> u64 {
        self.successes + self.failures
    }

    pub fn remaining_samples(&self) -> u64 {
        self.total_samples - self.samples_executed()
    }

    /// successes / samples executed; 0 before anything ran.
    pub fn observed_pass_rate(&self) -> f64 {
        let executed = self.samples_executed();
        if executed == 0 {
            return 0.0;
        }
        self.successes as f64 / executed as f64
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
    }

    pub fn example_failures(&self) -> &[String] {
        &self.example_failures
    }

    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.termination.as_ref().map(|(r, _)| *r)
    }

    pub fn termination_details(&self) -> Option<&str> {
        self.termination
            .as_ref()
            .and_then(|(_, d)| d.as_deref())
    }

    pub fn forced_failure(&self) -> bool {
        self.forced_failure
    }

    pub fn is_complete(&self) -> bool {
        self.termination.is_some() || self.samples_executed() >= self.total_samples
    }

    pub fn was_terminated_early(&self) -> bool {
        self.termination_reason().is_some_and(|r| r.is_early())
    }
}
