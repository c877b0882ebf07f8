//! Machine-readable run summary.
//!
//! One JSON document per run: schema version, coarse exit code, reason code,
//! verdict block, counts, budget usage, and provenance.

use crate::engine::driver::RunReport;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SCHEMA_VERSION: u32 = 1;

/// Exit code: 0 = pass, 1 = verdict fail, 2 = configuration error.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_VERDICT_FAIL: i32 = 1;
pub const EXIT_CONFIG_ERROR: i32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub schema_version: u32,
    pub exit_code: i32,
    /// Stable machine-readable reason, e.g. `E_VERDICT_FAIL`.
    pub reason_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<VerdictBlock>,
    pub termination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination_details: Option<String>,
    pub samples: SampleCounts,
    pub budget: BudgetUsage,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictBlock {
    pub passed: bool,
    pub observed_rate: f64,
    pub threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub false_positive_probability: Option<f64>,
    pub shortfall: f64,
    pub statistically_sound: bool,
    pub forced_failure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleCounts {
    pub planned: u64,
    pub executed: u64,
    pub successes: u64,
    pub failures: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetUsage {
    pub elapsed_ms: u64,
    pub tokens_used: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    pub attest_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factor_hash: Option<String>,
}

impl RunSummary {
    pub fn from_report(report: &RunReport, spec_id: Option<String>) -> Self {
        let (exit_code, reason_code, message) = match &report.verdict {
            Some(v) if v.passed => (EXIT_SUCCESS, String::new(), None),
            Some(v) => (
                EXIT_VERDICT_FAIL,
                "E_VERDICT_FAIL".to_string(),
                Some(v.interpretation.clone()),
            ),
            None => (EXIT_SUCCESS, String::new(), None),
        };

        Self {
            schema_version: SCHEMA_VERSION,
            exit_code,
            reason_code,
            message,
            verdict: report.verdict.as_ref().map(|v| VerdictBlock {
                passed: v.passed,
                observed_rate: v.observed_rate,
                threshold: v.threshold.value,
                confidence: v.threshold.confidence(),
                false_positive_probability: v.false_positive_probability,
                shortfall: v.shortfall(),
                statistically_sound: v.threshold.is_statistically_sound,
                forced_failure: report.forced_failure,
            }),
            termination: report.termination.as_str().to_string(),
            termination_details: report.termination_details.clone(),
            samples: SampleCounts {
                planned: report.samples_planned,
                executed: report.samples_executed,
                successes: report.successes,
                failures: report.failures,
            },
            budget: BudgetUsage {
                elapsed_ms: report.elapsed_ms,
                tokens_used: report.tokens_used,
            },
            provenance: Provenance {
                attest_version: env!("CARGO_PKG_VERSION").to_string(),
                spec_id,
                factor_hash: None,
            },
        }
    }

    pub fn with_factor_hash(mut self, hash: Option<String>) -> Self {
        self.provenance.factor_hash = hash;
        self
    }
}

pub fn write_summary(summary: &RunSummary, out: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(out, json)?;
    Ok(())
}
