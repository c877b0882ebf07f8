//! Check files: the YAML surface describing one probabilistic check.

use anyhow::{bail, Context};
use attest_core::config::{BudgetEnvelope, HarnessConfig, TestIntent, ThresholdOrigin};
use attest_core::engine::inputs::{InputSource, StaticInputSource, UnitInputSource};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const SUPPORTED_CHECK_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckFile {
    pub version: u32,
    /// Use-case identifier; also names the measured spec.
    pub use_case: String,
    /// SUT command line; exit status 0 counts the sample as a success.
    pub command: Vec<String>,
    /// Input tuples appended to the command, cycled per sample.
    #[serde(default)]
    pub inputs: Vec<Vec<String>>,
    /// Persisted execution spec backing this check.
    #[serde(default)]
    pub spec: Option<PathBuf>,
    #[serde(default)]
    pub samples: Option<u64>,
    #[serde(default)]
    pub min_pass_rate: Option<f64>,
    #[serde(default)]
    pub threshold_confidence: Option<f64>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub min_detectable_effect: Option<f64>,
    #[serde(default)]
    pub power: Option<f64>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub threshold_origin: Option<String>,
    #[serde(default)]
    pub contract_ref: Option<String>,
    #[serde(default)]
    pub budget: Option<BudgetEnvelope>,
}

pub fn load_check(path: &Path) -> anyhow::Result<CheckFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read check file {}", path.display()))?;
    let check: CheckFile = serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse check file {}", path.display()))?;
    if check.version != SUPPORTED_CHECK_VERSION {
        bail!(
            "unsupported check file version {} (supported: {SUPPORTED_CHECK_VERSION})",
            check.version
        );
    }
    if check.command.is_empty() {
        bail!("check file {} declares no command", path.display());
    }
    Ok(check)
}

impl CheckFile {
    pub fn harness_config(&self) -> anyhow::Result<HarnessConfig> {
        let intent = match &self.intent {
            None => TestIntent::default(),
            Some(raw) => TestIntent::parse(raw)
                .with_context(|| format!("intent must be verification or smoke, got '{raw}'"))?,
        };
        let threshold_origin = match &self.threshold_origin {
            None => ThresholdOrigin::default(),
            Some(raw) => ThresholdOrigin::parse(raw).with_context(|| {
                format!("threshold_origin must be empirical, sla, slo, policy, or unspecified, got '{raw}'")
            })?,
        };
        Ok(HarnessConfig {
            samples: self.samples,
            min_pass_rate: self.min_pass_rate,
            threshold_confidence: self.threshold_confidence,
            confidence: self.confidence,
            min_detectable_effect: self.min_detectable_effect,
            power: self.power,
            intent,
            threshold_origin,
            contract_ref: self.contract_ref.clone(),
            budget: self.budget.clone().unwrap_or_default(),
        })
    }

    /// The declared inputs as a hashed factor source, or a unit source when
    /// the command takes none.
    pub fn input_source(&self) -> Box<dyn InputSource> {
        if self.inputs.is_empty() {
            Box::new(UnitInputSource::new(format!("{}-unit", self.use_case)))
        } else {
            Box::new(StaticInputSource::new(
                format!("{}-inputs", self.use_case),
                self.inputs
                    .iter()
                    .map(|row| row.iter().map(|v| serde_json::Value::String(v.clone())).collect())
                    .collect(),
            ))
        }
    }
}
