//! Operational approach classification.
//!
//! A configuration fixes two of {sample size, confidence, threshold} and the
//! harness derives the third. Which two are fixed is inferred from which
//! parameters are set; ambiguous or incomplete combinations are rejected
//! before anything runs.

use crate::config::{HarnessConfig, ResolvedConfiguration};
use crate::errors::ConfigurationError;
use crate::model::OperationalApproach;

/// Classifies `cfg` into one of the three operational approaches.
///
/// `has_spec` states whether a persisted execution specification backs this
/// run; sample-size-first cannot work without one, threshold-first works
/// either way.
pub fn resolve(
    cfg: &HarnessConfig,
    has_spec: bool,
) -> Result<ResolvedConfiguration, ConfigurationError> {
    validate_ranges(cfg)?;

    let confidence_first_parts = [
        ("confidence", cfg.confidence.is_some()),
        ("min_detectable_effect", cfg.min_detectable_effect.is_some()),
        ("power", cfg.power.is_some()),
    ];
    let set_count = confidence_first_parts.iter().filter(|(_, set)| *set).count();

    let approach = if cfg.min_pass_rate.is_some() && cfg.threshold_confidence.is_some() {
        return Err(ConfigurationError::ConflictingApproaches);
    } else if set_count == 3 {
        OperationalApproach::ConfidenceFirst
    } else if set_count > 0 {
        let missing: Vec<&str> = confidence_first_parts
            .iter()
            .filter(|(_, set)| !*set)
            .map(|(name, _)| *name)
            .collect();
        return Err(ConfigurationError::IncompleteConfidenceFirst {
            missing: missing.join(", "),
        });
    } else if cfg.threshold_confidence.is_some() {
        if !has_spec {
            return Err(ConfigurationError::SpecRequired);
        }
        OperationalApproach::SampleSizeFirst
    } else if cfg.min_pass_rate.is_some() {
        OperationalApproach::ThresholdFirst
    } else {
        return Err(ConfigurationError::NoApproach);
    };

    Ok(ResolvedConfiguration {
        approach,
        samples: cfg.samples,
        min_pass_rate: cfg.min_pass_rate,
        threshold_confidence: cfg.threshold_confidence,
        confidence: cfg.confidence,
        min_detectable_effect: cfg.min_detectable_effect,
        power: cfg.power,
        spec_driven: has_spec,
        specless: !has_spec,
        intent: cfg.intent,
        threshold_origin: cfg.threshold_origin,
        contract_ref: cfg.contract_ref.clone(),
        budget: cfg.budget.clone(),
    })
}

fn validate_ranges(cfg: &HarnessConfig) -> Result<(), ConfigurationError> {
    if let Some(n) = cfg.samples {
        if n == 0 {
            return Err(ConfigurationError::InvalidRange(
                "samples must be positive".into(),
            ));
        }
    }
    if let Some(rate) = cfg.min_pass_rate {
        if !(0.0..=1.0).contains(&rate) {
            return Err(ConfigurationError::InvalidRange(format!(
                "min_pass_rate must lie in [0, 1], got {rate}"
            )));
        }
    }
    for (name, v) in [
        ("threshold_confidence", cfg.threshold_confidence),
        ("confidence", cfg.confidence),
        ("min_detectable_effect", cfg.min_detectable_effect),
        ("power", cfg.power),
    ] {
        if let Some(v) = v {
            if !(v > 0.0 && v < 1.0) {
                return Err(ConfigurationError::InvalidRange(format!(
                    "{name} must lie in (0, 1), got {v}"
                )));
            }
        }
    }
    Ok(())
}
