//! Per-sample acceptance criteria.
//!
//! A sample is a success iff every criterion in its bundle is `Passed`.
//! When one criterion errors, later criteria whose computation rests on the
//! same underlying error are marked `NotEvaluated` instead of repeating it;
//! "same" means pointer identity on the shared cause, not message equality.

use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum CriterionOutcome {
    Passed {
        description: String,
    },
    Failed {
        description: String,
        reason: String,
    },
    Errored {
        description: String,
        cause: Arc<anyhow::Error>,
    },
    NotEvaluated {
        description: String,
    },
}

impl CriterionOutcome {
    pub fn description(&self) -> &str {
        match self {
            Self::Passed { description }
            | Self::Failed { description, .. }
            | Self::Errored { description, .. }
            | Self::NotEvaluated { description } => description,
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }
}

/// Ordered criterion outcomes for one sample.
#[derive(Debug, Clone, Default)]
pub struct CriteriaBundle {
    outcomes: Vec<CriterionOutcome>,
}

impl CriteriaBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an outcome. An `Errored` outcome whose cause is already
    /// carried by an earlier `Errored` entry is downgraded to
    /// `NotEvaluated`.
    pub fn push(&mut self, outcome: CriterionOutcome) {
        let outcome = match outcome {
            CriterionOutcome::Errored { description, cause } => {
                let seen = self.outcomes.iter().any(|o| {
                    matches!(o, CriterionOutcome::Errored { cause: prior, .. }
                        if Arc::ptr_eq(prior, &cause))
                });
                if seen {
                    CriterionOutcome::NotEvaluated { description }
                } else {
                    CriterionOutcome::Errored { description, cause }
                }
            }
            other => other,
        };
        self.outcomes.push(outcome);
    }

    pub fn passed(&mut self, description: impl Into<String>) {
        self.push(CriterionOutcome::Passed {
            description: description.into(),
        });
    }

    pub fn failed(&mut self, description: impl Into<String>, reason: impl Into<String>) {
        self.push(CriterionOutcome::Failed {
            description: description.into(),
            reason: reason.into(),
        });
    }

    pub fn errored(&mut self, description: impl Into<String>, cause: Arc<anyhow::Error>) {
        self.push(CriterionOutcome::Errored {
            description: description.into(),
            cause,
        });
    }

    pub fn outcomes(&self) -> &[CriterionOutcome] {
        &self.outcomes
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Vacuously true for an empty bundle.
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(CriterionOutcome::is_passed)
    }

    /// Cause string for the first non-passing criterion, if any.
    pub fn first_failure(&self) -> Option<String> {
        self.outcomes.iter().find_map(|o| match o {
            CriterionOutcome::Passed { .. } => None,
            CriterionOutcome::Failed {
                description,
                reason,
            } => Some(format!("{description}: {reason}")),
            CriterionOutcome::Errored { description, cause } => {
                Some(format!("{description}: {cause}"))
            }
            CriterionOutcome::NotEvaluated { description } => {
                Some(format!("{description}: not evaluated"))
            }
        })
    }
}
