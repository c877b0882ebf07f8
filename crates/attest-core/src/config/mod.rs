//! Resolved harness configuration.
//!
//! Origin (check file, environment, property overrides) is flattened into a
//! plain immutable record before the run starts; nothing in the engine reads
//! the environment after that point.

pub mod approach;
pub mod overrides;

use crate::model::OperationalApproach;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_EXAMPLE_FAILURES: usize = 5;

/// Whether the run is sized to verify an SLA or is an explicitly undersized
/// smoke check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TestIntent {
    #[default]
    Verification,
    Smoke,
}

impl TestIntent {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "verification" => Some(Self::Verification),
            "smoke" => Some(Self::Smoke),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verification => "verification",
            Self::Smoke => "smoke",
        }
    }
}

/// Where the pass threshold comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdOrigin {
    Empirical,
    Sla,
    Slo,
    Policy,
    #[default]
    Unspecified,
}

impl ThresholdOrigin {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "empirical" => Some(Self::Empirical),
            "sla" => Some(Self::Sla),
            "slo" => Some(Self::Slo),
            "policy" => Some(Self::Policy),
            "unspecified" => Some(Self::Unspecified),
            _ => None,
        }
    }
}

/// Policy for a sample that raises something other than an assertion
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnException {
    /// Count the sample as a failure and keep going.
    #[default]
    FailSample,
    /// Stop the run immediately.
    AbortTest,
}

impl OnException {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fail_sample" => Some(Self::FailSample),
            "abort_test" => Some(Self::AbortTest),
            _ => None,
        }
    }
}

/// Policy once a time or token budget is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnBudgetExhausted {
    /// Force the verdict to FAIL regardless of observed counts.
    #[default]
    Fail,
    /// Let the verdict evaluator judge the counts observed so far.
    EvaluatePartial,
}

impl OnBudgetExhausted {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fail" => Some(Self::Fail),
            "evaluate_partial" => Some(Self::EvaluatePartial),
            _ => None,
        }
    }
}

/// Declared rate limits; the scheduler honors the most restrictive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_requests_per_hour: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_requests_per_minute: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_requests_per_second: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_ms_per_sample: Option<u64>,
}

/// Resource envelope and failure policies for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_budget_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_budget: Option<u64>,
    /// Fixed per-sample token charge; when unset, samples record their own
    /// usage through the sample context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_charge: Option<u64>,
    #[serde(default)]
    pub on_budget_exhausted: OnBudgetExhausted,
    #[serde(default)]
    pub on_exception: OnException,
    #[serde(default = "default_max_example_failures")]
    pub max_example_failures: usize,
    /// Log the statistical derivation alongside the verdict.
    #[serde(default)]
    pub transparent_stats: bool,
    #[serde(default)]
    pub pacing: PacingConfig,
}

fn default_max_example_failures() -> usize {
    DEFAULT_MAX_EXAMPLE_FAILURES
}

impl Default for BudgetEnvelope {
    fn default() -> Self {
        Self {
            time_budget_ms: None,
            token_budget: None,
            token_charge: None,
            on_budget_exhausted: OnBudgetExhausted::default(),
            on_exception: OnException::default(),
            max_example_failures: DEFAULT_MAX_EXAMPLE_FAILURES,
            transparent_stats: false,
            pacing: PacingConfig::default(),
        }
    }
}

/// The declared knobs, after override resolution but before approach
/// classification. `None` means "not set".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_pass_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_detectable_effect: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
    #[serde(default)]
    pub intent: TestIntent,
    #[serde(default)]
    pub threshold_origin: ThresholdOrigin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_ref: Option<String>,
    #[serde(default)]
    pub budget: BudgetEnvelope,
}

/// Output of the approach resolver: the classified, validated configuration
/// a driver runs with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfiguration {
    pub approach: OperationalApproach,
    /// `None` until the power analysis fills it in (confidence-first only).
    pub samples: Option<u64>,
    pub min_pass_rate: Option<f64>,
    pub threshold_confidence: Option<f64>,
    pub confidence: Option<f64>,
    pub min_detectable_effect: Option<f64>,
    pub power: Option<f64>,
    pub spec_driven: bool,
    pub specless: bool,
    pub intent: TestIntent,
    pub threshold_origin: ThresholdOrigin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_ref: Option<String>,
    pub budget: BudgetEnvelope,
}
