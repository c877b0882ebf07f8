//! Inter-sample pacing.
//!
//! Each declared rate limit yields a candidate delay; the effective delay is
//! the maximum candidate (most restrictive wins). A pre-flight report
//! estimates the run's duration and warns, without aborting, when pacing
//! alone would blow the time budget.

use crate::config::PacingConfig;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacingReport {
    pub planned_samples: u64,
    pub inter_sample_delay_ms: u64,
    /// Samples per hour at the derived delay; `None` when unpaced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_throughput_per_hour: Option<f64>,
    pub estimated_duration_ms: u64,
    pub estimated_completion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feasibility_warning: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct PacingScheduler {
    delay_ms: u64,
}

impl PacingScheduler {
    pub fn from_config(pacing: &PacingConfig) -> Self {
        let mut candidates: Vec<f64> = Vec::new();
        if let Some(per_hour) = pacing.max_requests_per_hour {
            if per_hour > 0 {
                candidates.push(3_600_000.0 / f64::from(per_hour));
            }
        }
        if let Some(per_minute) = pacing.max_requests_per_minute {
            if per_minute > 0 {
                candidates.push(60_000.0 / f64::from(per_minute));
            }
        }
        if let Some(per_second) = pacing.max_requests_per_second {
            if per_second > 0 {
                candidates.push(1_000.0 / f64::from(per_second));
            }
        }
        if let Some(min_ms) = pacing.min_ms_per_sample {
            candidates.push(min_ms as f64);
        }

        let delay_ms = candidates
            .into_iter()
            .fold(0.0_f64, f64::max)
            .ceil() as u64;
        Self { delay_ms }
    }

    pub fn inter_sample_delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    /// Emitted before execution starts. The delay applies *between* samples,
    /// so n samples pace for (n−1)·delay.
    pub fn preflight(&self, planned_samples: u64, time_budget_ms: Option<u64>) -> PacingReport {
        let estimated_duration_ms = planned_samples.saturating_sub(1) * self.delay_ms;
        let throughput = (self.delay_ms > 0).then(|| 3_600_000.0 / self.delay_ms as f64);
        let completion = Utc::now() + chrono::Duration::milliseconds(estimated_duration_ms as i64);

        let feasibility_warning = match time_budget_ms {
            Some(budget) if estimated_duration_ms > budget => {
                let msg = format!(
                    "pacing alone needs ~{estimated_duration_ms} ms for {planned_samples} samples but the time budget is {budget} ms; reduce the sample count, increase the time budget, or relax the pacing constraints"
                );
                warn!(target: "attest::pacing", "{msg}");
                Some(msg)
            }
            _ => None,
        };

        PacingReport {
            planned_samples,
            inter_sample_delay_ms: self.delay_ms,
            effective_throughput_per_hour: throughput,
            estimated_duration_ms,
            estimated_completion: completion.to_rfc3339(),
            feasibility_warning,
        }
    }
}
