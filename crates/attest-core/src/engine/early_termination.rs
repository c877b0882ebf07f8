//! Early-termination decisions.
//!
//! After every sample the outcome may already be mathematically determined:
//! either the required success count is out of reach (impossibility), or it
//! is met even if every remaining sample fails (success guaranteed). The
//! decision is a pure function of the counts.

use crate::model::TerminationReason;

#[derive(Debug, Clone, Copy)]
pub struct EarlyTermination {
    total_samples: u64,
    required_successes: u64,
}

impl EarlyTermination {
    pub fn new(total_samples: u64, min_pass_rate: f64) -> Self {
        Self {
            total_samples,
            required_successes: required_successes(total_samples, min_pass_rate),
        }
    }

    pub fn required_successes(&self) -> u64 {
        self.required_successes
    }

    /// Decision for the current counts; `None` while the outcome is open.
    pub fn check(&self, successes: u64, failures: u64) -> Option<TerminationReason> {
        let executed = successes + failures;
        debug_assert!(executed <= self.total_samples);
        let remaining = self.total_samples - executed;

        if successes + remaining < self.required_successes {
            return Some(TerminationReason::Impossibility);
        }
        // Every remaining sample failing still keeps successes at or above
        // the requirement.
        if successes >= self.required_successes && remaining > 0 {
            return Some(TerminationReason::SuccessGuaranteed);
        }
        None
    }

    pub fn details(&self, reason: TerminationReason, successes: u64, failures: u64) -> String {
        let remaining = self.total_samples - successes - failures;
        match reason {
            TerminationReason::Impossibility => format!(
                "{} of {} required successes unreachable: {} successes so far, {} samples remaining",
                self.required_successes, self.total_samples, successes, remaining
            ),
            TerminationReason::SuccessGuaranteed => format!(
                "{} required successes already recorded with {} samples remaining",
                self.required_successes, remaining
            ),
            other => other.as_str().to_string(),
        }
    }
}

/// ⌈total · rate⌉, with the product rounded to 1e-9 first so that binary
/// representation of rates like 0.80 cannot inflate the requirement.
fn required_successes(total_samples: u64, min_pass_rate: f64) -> u64 {
    let product = total_samples as f64 * min_pass_rate;
    let rounded = (product * 1e9).round() / 1e9;
    rounded.ceil() as u64
}
