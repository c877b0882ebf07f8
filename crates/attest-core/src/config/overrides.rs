//! Configuration override resolution.
//!
//! Fixed precedence: explicit property map > process environment > declared
//! value. Resolution happens once, before approach classification; the
//! engine only ever sees the resulting [`HarnessConfig`].

use crate::config::{HarnessConfig, OnBudgetExhausted, OnException, TestIntent};
use crate::errors::ConfigurationError;
use std::collections::BTreeMap;

pub const ENV_PREFIX: &str = "ATTEST_";

const KEY_SAMPLES: &str = "SAMPLES";
const KEY_MIN_PASS_RATE: &str = "MIN_PASS_RATE";
const KEY_THRESHOLD_CONFIDENCE: &str = "THRESHOLD_CONFIDENCE";
const KEY_CONFIDENCE: &str = "CONFIDENCE";
const KEY_MIN_DETECTABLE_EFFECT: &str = "MIN_DETECTABLE_EFFECT";
const KEY_POWER: &str = "POWER";
const KEY_TIME_BUDGET_MS: &str = "TIME_BUDGET_MS";
const KEY_TOKEN_BUDGET: &str = "TOKEN_BUDGET";
const KEY_TOKEN_CHARGE: &str = "TOKEN_CHARGE";
const KEY_MAX_EXAMPLE_FAILURES: &str = "MAX_EXAMPLE_FAILURES";
const KEY_ON_EXCEPTION: &str = "ON_EXCEPTION";
const KEY_ON_BUDGET_EXHAUSTED: &str = "ON_BUDGET_EXHAUSTED";
const KEY_INTENT: &str = "INTENT";

/// Applies property/environment overrides onto a declared configuration.
#[derive(Debug, Clone, Default)]
pub struct OverrideResolver {
    properties: BTreeMap<String, String>,
}

impl OverrideResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a property override (highest precedence). Keys use the bare
    /// form, e.g. `SAMPLES`, not `ATTEST_SAMPLES`.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Property > environment > declared.
    pub fn resolve(&self, declared: HarnessConfig) -> Result<HarnessConfig, ConfigurationError> {
        self.resolve_with(declared, |key| {
            std::env::var(format!("{ENV_PREFIX}{key}")).ok()
        })
    }

    /// Same as [`resolve`](Self::resolve) with an injectable environment,
    /// for callers that must not touch the process environment.
    pub fn resolve_with(
        &self,
        declared: HarnessConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<HarnessConfig, ConfigurationError> {
        let lookup = |key: &str| -> Option<String> {
            self.properties.get(key).cloned().or_else(|| env(key))
        };

        let mut cfg = declared;
        if let Some(raw) = lookup(KEY_SAMPLES) {
            cfg.samples = Some(parse_u64(KEY_SAMPLES, &raw)?);
        }
        if let Some(raw) = lookup(KEY_MIN_PASS_RATE) {
            cfg.min_pass_rate = Some(parse_f64(KEY_MIN_PASS_RATE, &raw)?);
        }
        if let Some(raw) = lookup(KEY_THRESHOLD_CONFIDENCE) {
            cfg.threshold_confidence = Some(parse_f64(KEY_THRESHOLD_CONFIDENCE, &raw)?);
        }
        if let Some(raw) = lookup(KEY_CONFIDENCE) {
            cfg.confidence = Some(parse_f64(KEY_CONFIDENCE, &raw)?);
        }
        if let Some(raw) = lookup(KEY_MIN_DETECTABLE_EFFECT) {
            cfg.min_detectable_effect = Some(parse_f64(KEY_MIN_DETECTABLE_EFFECT, &raw)?);
        }
        if let Some(raw) = lookup(KEY_POWER) {
            cfg.power = Some(parse_f64(KEY_POWER, &raw)?);
        }
        if let Some(raw) = lookup(KEY_TIME_BUDGET_MS) {
            cfg.budget.time_budget_ms = Some(parse_u64(KEY_TIME_BUDGET_MS, &raw)?);
        }
        if let Some(raw) = lookup(KEY_TOKEN_BUDGET) {
            cfg.budget.token_budget = Some(parse_u64(KEY_TOKEN_BUDGET, &raw)?);
        }
        if let Some(raw) = lookup(KEY_TOKEN_CHARGE) {
            cfg.budget.token_charge = Some(parse_u64(KEY_TOKEN_CHARGE, &raw)?);
        }
        if let Some(raw) = lookup(KEY_MAX_EXAMPLE_FAILURES) {
            cfg.budget.max_example_failures = parse_u64(KEY_MAX_EXAMPLE_FAILURES, &raw)? as usize;
        }
        if let Some(raw) = lookup(KEY_ON_EXCEPTION) {
            cfg.budget.on_exception = OnException::parse(&raw).ok_or_else(|| {
                ConfigurationError::InvalidRange(format!(
                    "{KEY_ON_EXCEPTION} must be fail_sample or abort_test, got '{raw}'"
                ))
            })?;
        }
        if let Some(raw) = lookup(KEY_ON_BUDGET_EXHAUSTED) {
            cfg.budget.on_budget_exhausted =
                OnBudgetExhausted::parse(&raw).ok_or_else(|| {
                    ConfigurationError::InvalidRange(format!(
                        "{KEY_ON_BUDGET_EXHAUSTED} must be fail or evaluate_partial, got '{raw}'"
                    ))
                })?;
        }
        if let Some(raw) = lookup(KEY_INTENT) {
            cfg.intent = TestIntent::parse(&raw).ok_or_else(|| {
                ConfigurationError::InvalidRange(format!(
                    "{KEY_INTENT} must be verification or smoke, got '{raw}'"
                ))
            })?;
        }
        Ok(cfg)
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, ConfigurationError> {
    raw.parse().map_err(|_| {
        ConfigurationError::InvalidRange(format!("{key} override '{raw}' is not an integer"))
    })
}

fn parse_f64(key: &str, raw: &str) -> Result<f64, ConfigurationError> {
    raw.parse().map_err(|_| {
        ConfigurationError::InvalidRange(format!("{key} override '{raw}' is not a number"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn declared_values_survive_without_overrides() {
        let declared = HarnessConfig {
            samples: Some(50),
            min_pass_rate: Some(0.9),
            ..HarnessConfig::default()
        };
        let resolved = OverrideResolver::new()
            .resolve_with(declared.clone(), no_env)
            .unwrap();
        assert_eq!(resolved, declared);
    }

    #[test]
    fn environment_beats_declared() {
        let declared = HarnessConfig {
            samples: Some(50),
            ..HarnessConfig::default()
        };
        let resolved = OverrideResolver::new()
            .resolve_with(declared, |key| {
                (key == "SAMPLES").then(|| "200".to_string())
            })
            .unwrap();
        assert_eq!(resolved.samples, Some(200));
    }

    #[test]
    fn property_beats_environment() {
        let resolved = OverrideResolver::new()
            .with_property("SAMPLES", "300")
            .resolve_with(HarnessConfig::default(), |key| {
                (key == "SAMPLES").then(|| "200".to_string())
            })
            .unwrap();
        assert_eq!(resolved.samples, Some(300));
    }

    #[test]
    fn budget_and_policy_overrides_apply() {
        let resolved = OverrideResolver::new()
            .with_property("TIME_BUDGET_MS", "60000")
            .with_property("ON_EXCEPTION", "abort_test")
            .with_property("INTENT", "smoke")
            .resolve_with(HarnessConfig::default(), no_env)
            .unwrap();
        assert_eq!(resolved.budget.time_budget_ms, Some(60_000));
        assert_eq!(resolved.budget.on_exception, OnException::AbortTest);
        assert_eq!(resolved.intent, TestIntent::Smoke);
    }

    #[test]
    fn malformed_overrides_are_rejected() {
        let err = OverrideResolver::new()
            .with_property("SAMPLES", "many")
            .resolve_with(HarnessConfig::default(), no_env);
        assert!(matches!(err, Err(ConfigurationError::InvalidRange(_))));

        let err = OverrideResolver::new()
            .with_property("ON_EXCEPTION", "explode")
            .resolve_with(HarnessConfig::default(), no_env);
        assert!(matches!(err, Err(ConfigurationError::InvalidRange(_))));
    }
}
