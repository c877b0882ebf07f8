//! Factor-source consistency.
//!
//! A test run should exercise the same input distribution its baseline was
//! measured against. The check compares the test-time source hash with the
//! hash recorded in the spec; hashes are source-owned, so two runs over the
//! same source match even when they cycle through different sample counts.

use crate::model::FactorSourceMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyStatus {
    Match,
    Mismatch,
    NotApplicable,
}

impl ConsistencyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::Mismatch => "mismatch",
            Self::NotApplicable => "not_applicable",
        }
    }

    fn marker(&self) -> &'static str {
        match self {
            Self::Match => "✅",
            Self::Mismatch => "❌",
            Self::NotApplicable => "⚠️",
        }
    }
}

/// The test run's side of the comparison.
#[derive(Debug, Clone)]
pub struct TestFactorSource {
    pub name: String,
    pub hash: String,
    pub samples_planned: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyOutcome {
    pub status: ConsistencyStatus,
    pub message: String,
    /// Non-fatal annotation, e.g. differing sample counts.
    pub note: Option<String>,
}

impl ConsistencyOutcome {
    fn new(status: ConsistencyStatus, message: String) -> Self {
        Self {
            status,
            message: format!("{} {}", status.marker(), message),
            note: None,
        }
    }
}

fn short(hash: &str) -> &str {
    &hash[..hash.len().min(8)]
}

pub fn validate(
    test_source: Option<&TestFactorSource>,
    baseline: Option<&FactorSourceMetadata>,
) -> ConsistencyOutcome {
    let Some(test) = test_source else {
        return ConsistencyOutcome::new(
            ConsistencyStatus::NotApplicable,
            "factor consistency not applicable: test does not use a factor source".into(),
        );
    };
    let Some(baseline) = baseline else {
        return ConsistencyOutcome::new(
            ConsistencyStatus::NotApplicable,
            "factor consistency not applicable: legacy spec without factor-source metadata"
                .into(),
        );
    };

    let mut outcome = if test.hash == baseline.hash {
        ConsistencyOutcome::new(
            ConsistencyStatus::Match,
            format!(
                "factor source '{}' matches the baseline ({})",
                test.name,
                short(&test.hash)
            ),
        )
    } else {
        ConsistencyOutcome::new(
            ConsistencyStatus::Mismatch,
            format!(
                "factor source '{}' ({}) does not match the baseline's '{}' ({})",
                test.name,
                short(&test.hash),
                baseline.source_name,
                short(&baseline.hash)
            ),
        )
    };

    if test.samples_planned != baseline.samples_used {
        outcome.note = Some(format!(
            "sample counts differ: baseline used {}, this run plans {}",
            baseline.samples_used, test.samples_planned
        ));
    }
    outcome
}
