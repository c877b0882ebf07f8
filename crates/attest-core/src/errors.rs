use thiserror::Error;

/// Invariant violation inside a statistics primitive.
///
/// Never recovered from: the driver boundary converts it into a
/// [`ConfigurationError`] before any sample executes.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid argument: {0}")]
pub struct InvalidArgument(pub String);

/// Any misconfiguration detected before the sample loop starts.
///
/// No samples execute once one of these is raised; the host runner receives
/// it as the run's outcome.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Conflicting Approaches: Sample-Size-First AND Threshold-First (threshold_confidence and min_pass_rate are both set)")]
    ConflictingApproaches,

    #[error("Incomplete Confidence-First: missing {missing}")]
    IncompleteConfidenceFirst { missing: String },

    #[error("no operational approach was specified; set min_pass_rate (Threshold-First), threshold_confidence (Sample-Size-First), or confidence + min_detectable_effect + power (Confidence-First)")]
    NoApproach,

    #[error("Sample-Size-First requires a spec")]
    SpecRequired,

    #[error("Missing Baseline Data: spec '{spec_id}' carries no empirical basis")]
    MissingBaselineData { spec_id: String },

    #[error("{0}")]
    InvalidRange(String),

    #[error("infeasible verification: {0}")]
    Infeasible(String),

    #[error("input source '{name}' yielded no tuples")]
    EmptyInputSource { name: String },

    #[error("spec '{spec_id}' expired {days_overdue} day(s) past its baseline window")]
    SpecExpired { spec_id: String, days_overdue: i64 },

    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),
}
