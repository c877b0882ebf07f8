//! The test-body contract.
//!
//! The body is invoked once per sample with the bound input tuple. Returning
//! `Ok` classifies the sample by its criteria bundle (success iff all
//! passed); an [`SampleFailure::Assertion`] is an ordinary sample failure;
//! anything else is subject to the run's `on_exception` policy.

use crate::engine::inputs::InputTuple;
use crate::model::CriteriaBundle;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SampleFailure {
    /// An expectation about the SUT's output did not hold.
    #[error("assertion failed: {0}")]
    Assertion(String),
    /// Anything else: infrastructure trouble, a panic equivalent, a bug.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// What one sample produced.
#[derive(Debug, Default)]
pub struct UseCaseOutcome {
    pub result: Option<serde_json::Value>,
    pub criteria: CriteriaBundle,
}

impl UseCaseOutcome {
    /// An outcome with no criteria: plain success.
    pub fn success() -> Self {
        Self::default()
    }

    pub fn with_criteria(criteria: CriteriaBundle) -> Self {
        Self {
            result: None,
            criteria,
        }
    }
}

/// Per-sample context handed to the body. Token usage recorded here feeds
/// the budget tracker when no static per-sample charge is configured.
#[derive(Debug)]
pub struct SampleContext {
    sample_index: u64,
    input: InputTuple,
    tokens_recorded: u64,
}

impl SampleContext {
    pub fn new(sample_index: u64, input: InputTuple) -> Self {
        Self {
            sample_index,
            input,
            tokens_recorded: 0,
        }
    }

    pub fn sample_index(&self) -> u64 {
        self.sample_index
    }

    pub fn input(&self) -> &InputTuple {
        &self.input
    }

    pub fn record_tokens(&mut self, tokens: u64) {
        self.tokens_recorded += tokens;
    }

    pub fn tokens_recorded(&self) -> u64 {
        self.tokens_recorded
    }
}

#[async_trait]
pub trait TestBody: Send + Sync {
    async fn invoke(&self, ctx: &mut SampleContext) -> Result<UseCaseOutcome, SampleFailure>;
}
