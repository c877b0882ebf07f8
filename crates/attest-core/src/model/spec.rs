//! Persisted execution specifications.
//!
//! A spec is produced by a measure run and read back by later test runs; it
//! is immutable once persisted. Round-trip identity through the spec store
//! is part of the contract.

use crate::errors::InvalidArgument;
use crate::model::CovariateProfile;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Current spec document version.
pub const SPEC_VERSION: u32 = 1;

/// A historically measured (k, n) pair for the system under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineData {
    pub samples: u64,
    pub successes: u64,
}

impl BaselineData {
    pub fn new(samples: u64, successes: u64) -> Result<Self, InvalidArgument> {
        if samples == 0 {
            return Err(InvalidArgument("baseline samples must be positive".into()));
        }
        if successes > samples {
            return Err(InvalidArgument(format!(
                "baseline successes ({successes}) must not exceed samples ({samples})"
            )));
        }
        Ok(Self { samples, successes })
    }

    pub fn rate(&self) -> f64 {
        self.successes as f64 / self.samples as f64
    }
}

/// Identity of the factor source a baseline was measured against.
///
/// The hash is source-owned: it identifies the source's full ordered value
/// sequence, independent of how many of those values a consumer cycles
/// through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorSourceMetadata {
    pub hash: String,
    pub source_name: String,
    pub samples_used: u64,
}

/// How long a baseline stays trustworthy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationPolicy {
    pub days: u32,
    /// End of the measurement window the policy counts from (RFC 3339).
    pub baseline_end_time: String,
}

/// Result of evaluating an [`ExpirationPolicy`] against a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpirationStatus {
    NoPolicy,
    NotExpired { days_remaining: i64 },
    Expired { days_overdue: i64 },
}

impl ExpirationPolicy {
    pub fn evaluate(&self, now: DateTime<Utc>) -> Result<ExpirationStatus, InvalidArgument> {
        let end = DateTime::parse_from_rfc3339(&self.baseline_end_time)
            .map_err(|e| {
                InvalidArgument(format!(
                    "baseline_end_time '{}' is not RFC 3339: {e}",
                    self.baseline_end_time
                ))
            })?
            .with_timezone(&Utc);
        let deadline = end + Duration::days(i64::from(self.days));
        let delta_days = (deadline - now).num_days();
        if now > deadline {
            Ok(ExpirationStatus::Expired {
                days_overdue: (now - deadline).num_days().max(1),
            })
        } else {
            Ok(ExpirationStatus::NotExpired {
                days_remaining: delta_days,
            })
        }
    }
}

/// The persisted document a measure run emits and a test run consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSpecification {
    pub version: u32,
    pub spec_id: String,
    pub use_case_id: String,
    pub generated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empirical_basis: Option<BaselineData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factor_source: Option<FactorSourceMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covariates: Option<CovariateProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<ExpirationPolicy>,
}

impl ExecutionSpecification {
    /// Expiration status at `now`; specs without a policy never expire.
    pub fn expiration_status(&self, now: DateTime<Utc>) -> Result<ExpirationStatus, InvalidArgument> {
        match &self.expiration {
            None => Ok(ExpirationStatus::NoPolicy),
            Some(policy) => policy.evaluate(now),
        }
    }
}
