//! Immutable value records shared between the statistics engine and the
//! execution engine.

pub mod covariates;
pub mod criteria;
pub mod spec;

pub use covariates::{CovariateProfile, CovariateValue};
pub use criteria::{CriteriaBundle, CriterionOutcome};
pub use spec::{
    BaselineData, ExecutionSpecification, ExpirationPolicy, ExpirationStatus,
    FactorSourceMetadata,
};

use serde::{Deserialize, Serialize};

/// Which two of {sample size, confidence, threshold} the configuration fixes;
/// the third is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationalApproach {
    SampleSizeFirst,
    ConfidenceFirst,
    ThresholdFirst,
}

impl OperationalApproach {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SampleSizeFirst => "sample-size-first",
            Self::ConfidenceFirst => "confidence-first",
            Self::ThresholdFirst => "threshold-first",
        }
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// All planned samples executed.
    Completed,
    /// The pass threshold became unreachable.
    Impossibility,
    /// The pass threshold was met even if every remaining sample failed.
    SuccessGuaranteed,
    TimeBudget,
    TokenBudget,
    ExceptionAbort,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Impossibility => "impossibility",
            Self::SuccessGuaranteed => "success_guaranteed",
            Self::TimeBudget => "time_budget",
            Self::TokenBudget => "token_budget",
            Self::ExceptionAbort => "exception_abort",
        }
    }

    /// True for every reason other than [`TerminationReason::Completed`].
    pub fn is_early(&self) -> bool {
        !matches!(self, Self::Completed)
    }
}

/// Binomial proportion estimate with a Wilson confidence interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProportionEstimate {
    pub point_estimate: f64,
    pub sample_size: u64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub confidence_level: f64,
}

/// Inputs a threshold was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivationContext {
    pub baseline_rate: f64,
    pub baseline_samples: u64,
    pub test_samples: u64,
    /// For threshold-first derivations this is the *implied* confidence
    /// recovered by inverting the Wilson lower bound.
    pub confidence: f64,
}

/// A pass/fail threshold plus its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedThreshold {
    pub value: f64,
    pub approach: OperationalApproach,
    /// Absent only for spec-less threshold-first runs, which have no
    /// baseline to invert and hence no recoverable confidence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<DerivationContext>,
    pub is_statistically_sound: bool,
}

impl DerivedThreshold {
    pub fn confidence(&self) -> Option<f64> {
        self.context.as_ref().map(|c| c.confidence)
    }
}

/// Output of the power analysis: how many samples a detection target needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSizeRequirement {
    pub required_samples: u64,
    pub baseline_rate: f64,
    /// p₁ = p₀ − δ, the degraded rate the test is sized to detect.
    pub alternative_rate: f64,
    pub min_detectable_effect: f64,
    pub confidence: f64,
    pub power: f64,
}

/// Whether a configured (n, p₀, α) can ever produce a verification-grade
/// verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibilityResult {
    pub feasible: bool,
    /// Smallest n for which a perfect run clears the target rate.
    pub minimum_samples: u64,
    pub alpha: f64,
    pub target_rate: f64,
    pub samples: u64,
    pub criterion: String,
}

/// A statistically qualified pass/fail pronouncement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictWithConfidence {
    pub passed: bool,
    pub observed_rate: f64,
    pub threshold: DerivedThreshold,
    /// 0 on pass, α on fail; `None` when the threshold carries no
    /// recoverable confidence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub false_positive_probability: Option<f64>,
    pub interpretation: String,
}

impl VerdictWithConfidence {
    /// How far the observed rate fell below the threshold (0 on pass).
    pub fn shortfall(&self) -> f64 {
        (self.threshold.value - self.observed_rate).max(0.0)
    }
}
