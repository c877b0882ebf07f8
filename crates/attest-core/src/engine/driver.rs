//! Run orchestration.
//!
//! A run moves through configure → sample loop → verdict. Everything that
//! can be rejected is rejected at configure time, before a single sample
//! executes; once the loop is running, error conditions become state on the
//! aggregator and the run always ends in a verdict.

use crate::config::{
    approach, HarnessConfig, OnBudgetExhausted, OnException, ResolvedConfiguration, TestIntent,
};
use crate::engine::aggregator::SampleAggregator;
use crate::engine::body::{SampleContext, SampleFailure, TestBody};
use crate::engine::budget::{BudgetLimit, BudgetScope, BudgetTracker};
use crate::engine::early_termination::EarlyTermination;
use crate::engine::inputs::InputSource;
use crate::engine::pacing::{PacingReport, PacingScheduler};
use crate::errors::ConfigurationError;
use crate::factor::{self, ConsistencyOutcome, ConsistencyStatus, TestFactorSource};
use crate::model::{
    BaselineData, CovariateProfile, DerivedThreshold, ExecutionSpecification, ExpirationPolicy,
    ExpirationStatus, FactorSourceMetadata, OperationalApproach, TerminationReason,
    VerdictWithConfidence,
};
use crate::model::spec::SPEC_VERSION;
use crate::stats::{feasibility, power, threshold};
use crate::verdict;
use chrono::Utc;
use tracing::{debug, info, warn};

pub const SMOKE_CAVEAT: &str = "sample not sized for SLA verification";

/// Entry point for one probabilistic test or measurement.
pub struct Driver {
    config: HarnessConfig,
    spec: Option<ExecutionSpecification>,
    outer_budgets: Vec<BudgetLimit>,
}

impl Driver {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            spec: None,
            outer_budgets: Vec::new(),
        }
    }

    pub fn with_spec(mut self, spec: ExecutionSpecification) -> Self {
        self.spec = Some(spec);
        self
    }

    /// Adds a suite- or class-scope budget on top of the run's own envelope.
    pub fn with_outer_budget(mut self, limit: BudgetLimit) -> Self {
        self.outer_budgets.push(limit);
        self
    }

    pub fn spec(&self) -> Option<&ExecutionSpecification> {
        self.spec.as_ref()
    }

    /// Test-phase configuration: classify the approach, derive the
    /// threshold, and vet feasibility, pacing, expiration, and factor
    /// consistency. Nothing executes yet.
    pub fn configure(
        &self,
        source: &dyn InputSource,
    ) -> Result<ConfiguredRun, ConfigurationError> {
        let mut resolved = approach::resolve(&self.config, self.spec.is_some())?;
        if source.is_empty() {
            return Err(ConfigurationError::EmptyInputSource {
                name: source.name().to_string(),
            });
        }

        let mut caveats = Vec::new();
        self.check_expiration(resolved.intent, &mut caveats)?;

        let (total_samples, derived) = self.derive_threshold(&resolved)?;
        resolved.samples = Some(total_samples);

        self.check_feasibility(&resolved, total_samples, &derived, &mut caveats)?;

        let factor_consistency = self.check_factor_consistency(source, total_samples);

        let scheduler = PacingScheduler::from_config(&resolved.budget.pacing);
        let pacing_report =
            scheduler.preflight(total_samples, resolved.budget.time_budget_ms);
        info!(
            target: "attest::driver",
            samples = total_samples,
            approach = derived.approach.as_str(),
            threshold = derived.value,
            "run configured"
        );
        if resolved.budget.transparent_stats {
            info!(
                target: "attest::driver",
                threshold = derived.value,
                confidence = ?derived.confidence(),
                sound = derived.is_statistically_sound,
                "threshold derivation"
            );
        }

        let budget = resolved.budget.clone();
        Ok(ConfiguredRun {
            resolved: Some(resolved),
            threshold: Some(derived),
            total_samples,
            budget,
            scheduler,
            pacing_report,
            factor_consistency,
            caveats,
            outer_budgets: self.outer_budgets.clone(),
        })
    }

    /// Measure-phase configuration: no threshold, no early termination; the
    /// run exists to produce a baseline observation.
    pub fn configure_measurement(
        &self,
        source: &dyn InputSource,
    ) -> Result<ConfiguredRun, ConfigurationError> {
        if source.is_empty() {
            return Err(ConfigurationError::EmptyInputSource {
                name: source.name().to_string(),
            });
        }
        let total_samples = self.config.samples.ok_or_else(|| {
            ConfigurationError::InvalidRange(
                "samples must be set for a measurement run".into(),
            )
        })?;
        if total_samples == 0 {
            return Err(ConfigurationError::InvalidRange(
                "samples must be positive".into(),
            ));
        }

        let budget = self.config.budget.clone();
        let scheduler = PacingScheduler::from_config(&budget.pacing);
        let pacing_report = scheduler.preflight(total_samples, budget.time_budget_ms);
        info!(target: "attest::driver", samples = total_samples, "measurement configured");

        Ok(ConfiguredRun {
            resolved: None,
            threshold: None,
            total_samples,
            budget,
            scheduler,
            pacing_report,
            factor_consistency: None,
            caveats: Vec::new(),
            outer_budgets: self.outer_budgets.clone(),
        })
    }

    fn check_expiration(
        &self,
        intent: TestIntent,
        caveats: &mut Vec<String>,
    ) -> Result<(), ConfigurationError> {
        let Some(spec) = &self.spec else {
            return Ok(());
        };
        match spec.expiration_status(Utc::now())? {
            ExpirationStatus::Expired { days_overdue } => {
                if intent == TestIntent::Verification {
                    Err(ConfigurationError::SpecExpired {
                        spec_id: spec.spec_id.clone(),
                        days_overdue,
                    })
                } else {
                    let caveat = format!(
                        "spec '{}' expired {days_overdue} day(s) ago; smoke run proceeding on a stale baseline",
                        spec.spec_id
                    );
                    warn!(target: "attest::driver", "{caveat}");
                    caveats.push(caveat);
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    fn baseline(&self) -> Result<BaselineData, ConfigurationError> {
        let spec = self.spec.as_ref().ok_or(ConfigurationError::SpecRequired)?;
        spec.empirical_basis
            .ok_or_else(|| ConfigurationError::MissingBaselineData {
                spec_id: spec.spec_id.clone(),
            })
    }

    fn derive_threshold(
        &self,
        resolved: &ResolvedConfiguration,
    ) -> Result<(u64, DerivedThreshold), ConfigurationError> {
        match resolved.approach {
            OperationalApproach::SampleSizeFirst => {
                let samples = resolved.samples.ok_or_else(|| {
                    ConfigurationError::InvalidRange(
                        "samples must be set for Sample-Size-First".into(),
                    )
                })?;
                let baseline = self.baseline()?;
                let confidence = resolved
                    .threshold_confidence
                    .expect("classification guarantees threshold_confidence");
                let derived = threshold::derive_sample_size_first(
                    baseline.samples,
                    baseline.successes,
                    samples,
                    confidence,
                )?;
                Ok((samples, derived))
            }
            OperationalApproach::ConfidenceFirst => {
                let baseline = self.baseline()?;
                let confidence = resolved
                    .confidence
                    .expect("classification guarantees confidence");
                let requirement = power::required_samples(
                    baseline.rate(),
                    resolved
                        .min_detectable_effect
                        .expect("classification guarantees min_detectable_effect"),
                    confidence,
                    resolved.power.expect("classification guarantees power"),
                )?;
                let samples = requirement.required_samples;
                let derived = threshold::derive_sample_size_first(
                    baseline.samples,
                    baseline.successes,
                    samples,
                    confidence,
                )?;
                Ok((samples, derived))
            }
            OperationalApproach::ThresholdFirst => {
                let samples = resolved.samples.ok_or_else(|| {
                    ConfigurationError::InvalidRange(
                        "samples must be set for Threshold-First".into(),
                    )
                })?;
                let rate = resolved
                    .min_pass_rate
                    .expect("classification guarantees min_pass_rate");
                if resolved.spec_driven {
                    let baseline = self.baseline()?;
                    let derived = threshold::derive_threshold_first(
                        baseline.samples,
                        baseline.successes,
                        samples,
                        rate,
                    )?;
                    Ok((samples, derived))
                } else {
                    Ok((
                        samples,
                        DerivedThreshold {
                            value: rate,
                            approach: OperationalApproach::ThresholdFirst,
                            context: None,
                            is_statistically_sound: true,
                        },
                    ))
                }
            }
        }
    }

    fn check_feasibility(
        &self,
        resolved: &ResolvedConfiguration,
        samples: u64,
        derived: &DerivedThreshold,
        caveats: &mut Vec<String>,
    ) -> Result<(), ConfigurationError> {
        // A spec-less threshold carries no confidence, and degenerate
        // thresholds (0 or 1) have nothing to verify against.
        let Some(confidence) = derived.confidence() else {
            return Ok(());
        };
        if !(derived.value > 0.0 && derived.value < 1.0) {
            return Ok(());
        }

        let result = feasibility::evaluate(samples, derived.value, confidence)?;
        if result.feasible {
            return Ok(());
        }
        match resolved.intent {
            TestIntent::Verification => Err(ConfigurationError::Infeasible(format!(
                "{samples} samples cannot verify target rate {:.4} at {:.1}% confidence; at least {} samples are needed; raise the sample count, or switch the test intent to smoke",
                result.target_rate,
                confidence * 100.0,
                result.minimum_samples
            ))),
            TestIntent::Smoke => {
                warn!(
                    target: "attest::driver",
                    samples,
                    minimum = result.minimum_samples,
                    "{SMOKE_CAVEAT}"
                );
                caveats.push(SMOKE_CAVEAT.to_string());
                Ok(())
            }
        }
    }

    fn check_factor_consistency(
        &self,
        source: &dyn InputSource,
        samples: u64,
    ) -> Option<ConsistencyOutcome> {
        let spec = self.spec.as_ref()?;
        let test_side = source.content_hash().map(|hash| TestFactorSource {
            name: source.name().to_string(),
            hash,
            samples_planned: samples,
        });
        let outcome = factor::validate(test_side.as_ref(), spec.factor_source.as_ref());
        match outcome.status {
            ConsistencyStatus::Mismatch => {
                warn!(target: "attest::driver", "{}", outcome.message)
            }
            _ => debug!(target: "attest::driver", "{}", outcome.message),
        }
        Some(outcome)
    }
}

/// A vetted run, ready to execute.
#[derive(Debug)]
pub struct ConfiguredRun {
    resolved: Option<ResolvedConfiguration>,
    threshold: Option<DerivedThreshold>,
    total_samples: u64,
    budget: crate::config::BudgetEnvelope,
    scheduler: PacingScheduler,
    pacing_report: PacingReport,
    factor_consistency: Option<ConsistencyOutcome>,
    caveats: Vec<String>,
    outer_budgets: Vec<BudgetLimit>,
}

impl ConfiguredRun {
    pub fn resolved(&self) -> Option<&ResolvedConfiguration> {
        self.resolved.as_ref()
    }

    pub fn threshold(&self) -> Option<&DerivedThreshold> {
        self.threshold.as_ref()
    }

    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    pub fn pacing_report(&self) -> &PacingReport {
        &self.pacing_report
    }

    pub fn factor_consistency(&self) -> Option<&ConsistencyOutcome> {
        self.factor_consistency.as_ref()
    }

    pub fn caveats(&self) -> &[String] {
        &self.caveats
    }

    /// Runs the sample loop to termination and renders the verdict.
    ///
    /// Samples run sequentially; the aggregator and budget tracker are owned
    /// here and never shared. A sample in flight is not preempted; budgets
    /// are observed between samples.
    pub async fn execute(
        self,
        source: &dyn InputSource,
        body: &dyn TestBody,
    ) -> anyhow::Result<RunReport> {
        let mut limits = vec![BudgetLimit {
            scope: BudgetScope::Method,
            time_budget_ms: self.budget.time_budget_ms,
            token_budget: self.budget.token_budget,
        }];
        limits.extend(self.outer_budgets.iter().copied());
        let mut tracker = BudgetTracker::new(limits);

        let mut aggregator =
            SampleAggregator::new(self.total_samples, self.budget.max_example_failures);
        let early = self
            .threshold
            .as_ref()
            .map(|t| EarlyTermination::new(self.total_samples, t.value));

        for index in 0..self.total_samples {
            if let Some(exhaustion) = tracker.check() {
                if self.budget.on_budget_exhausted == OnBudgetExhausted::Fail {
                    aggregator.set_forced_failure(true);
                }
                aggregator.set_terminated(exhaustion.reason, Some(exhaustion.detail));
                break;
            }

            let tuple = source.tuple(index as usize % source.len());
            let mut ctx = SampleContext::new(index, tuple);
            match body.invoke(&mut ctx).await {
                Ok(outcome) => {
                    if outcome.criteria.all_passed() {
                        aggregator.record_success();
                    } else {
                        aggregator.record_failure(outcome.criteria.first_failure());
                    }
                }
                Err(SampleFailure::Assertion(message)) => {
                    aggregator.record_failure(Some(message));
                }
                Err(SampleFailure::Unexpected(error)) => match self.budget.on_exception {
                    OnException::FailSample => {
                        aggregator.record_failure(Some(format!("unexpected error: {error}")));
                    }
                    OnException::AbortTest => {
                        warn!(target: "attest::driver", %error, "aborting run on unexpected error");
                        aggregator.set_terminated(
                            TerminationReason::ExceptionAbort,
                            Some(error.to_string()),
                        );
                        break;
                    }
                },
            }

            let tokens = self
                .budget
                .token_charge
                .unwrap_or_else(|| ctx.tokens_recorded());
            if tokens > 0 {
                tracker.charge_tokens(tokens);
            }

            if let Some(early) = &early {
                if let Some(reason) =
                    early.check(aggregator.successes(), aggregator.failures())
                {
                    let details =
                        early.details(reason, aggregator.successes(), aggregator.failures());
                    debug!(target: "attest::driver", reason = reason.as_str(), "{details}");
                    aggregator.set_terminated(reason, Some(details));
                    break;
                }
            }

            let delay = self.scheduler.inter_sample_delay();
            if index + 1 < self.total_samples && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        if aggregator.termination_reason().is_none() {
            aggregator.set_completed();
        }

        let verdict = match &self.threshold {
            Some(derived) => Some(render_verdict(&aggregator, derived)?),
            None => None,
        };

        let termination = aggregator
            .termination_reason()
            .unwrap_or(TerminationReason::Completed);
        info!(
            target: "attest::driver",
            termination = termination.as_str(),
            successes = aggregator.successes(),
            failures = aggregator.failures(),
            passed = verdict.as_ref().map(|v| v.passed),
            "run terminated"
        );

        Ok(RunReport {
            verdict,
            threshold: self.threshold,
            samples_planned: self.total_samples,
            samples_executed: aggregator.samples_executed(),
            successes: aggregator.successes(),
            failures: aggregator.failures(),
            observed_pass_rate: aggregator.observed_pass_rate(),
            elapsed_ms: aggregator.elapsed_ms(),
            tokens_used: tracker.tokens_used(),
            termination,
            termination_details: aggregator.termination_details().map(String::from),
            forced_failure: aggregator.forced_failure(),
            example_failures: aggregator.example_failures().to_vec(),
            pacing: self.pacing_report,
            factor_consistency: self.factor_consistency,
            caveats: self.caveats,
        })
    }
}

fn render_verdict(
    aggregator: &SampleAggregator,
    derived: &DerivedThreshold,
) -> anyhow::Result<VerdictWithConfidence> {
    let executed = aggregator.samples_executed();
    let mut verdict = if executed == 0 {
        VerdictWithConfidence {
            passed: false,
            observed_rate: 0.0,
            threshold: derived.clone(),
            false_positive_probability: None,
            interpretation: "no samples executed before termination".to_string(),
        }
    } else {
        verdict::evaluate(aggregator.successes(), executed, derived)?
    };

    if aggregator.forced_failure() && verdict.passed {
        verdict.passed = false;
        verdict.false_positive_probability = None;
        verdict.interpretation = format!(
            "budget exhausted under the FAIL policy; verdict forced to FAIL (observed pass rate {:.4} over {executed} samples)",
            verdict.observed_rate
        );
    }
    Ok(verdict)
}

/// Everything a run leaves behind.
#[derive(Debug)]
pub struct RunReport {
    pub verdict: Option<VerdictWithConfidence>,
    pub threshold: Option<DerivedThreshold>,
    pub samples_planned: u64,
    pub samples_executed: u64,
    pub successes: u64,
    pub failures: u64,
    pub observed_pass_rate: f64,
    pub elapsed_ms: u64,
    pub tokens_used: u64,
    pub termination: TerminationReason,
    pub termination_details: Option<String>,
    pub forced_failure: bool,
    pub example_failures: Vec<String>,
    pub pacing: PacingReport,
    pub factor_consistency: Option<ConsistencyOutcome>,
    pub caveats: Vec<String>,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.verdict.as_ref().map(|v| v.passed).unwrap_or(true)
    }
}

/// What a measurement run should stamp into the spec it produces.
#[derive(Debug, Clone)]
pub struct MeasurementOptions {
    pub use_case_id: String,
    pub covariates: Option<CovariateProfile>,
    pub expiration_days: Option<u32>,
}

/// Runs a measurement and packages the observation as a persistable spec.
pub async fn measure(
    config: HarnessConfig,
    options: MeasurementOptions,
    source: &dyn InputSource,
    body: &dyn TestBody,
) -> anyhow::Result<(ExecutionSpecification, RunReport)> {
    let driver = Driver::new(config);
    let run = driver.configure_measurement(source)?;
    let report = run.execute(source, body).await?;

    if report.samples_executed == 0 {
        anyhow::bail!("measurement terminated before any sample executed");
    }
    let basis = BaselineData::new(report.samples_executed, report.successes)?;

    let now = Utc::now().to_rfc3339();
    let spec = ExecutionSpecification {
        version: SPEC_VERSION,
        spec_id: uuid::Uuid::new_v4().to_string(),
        use_case_id: options.use_case_id,
        generated_at: now.clone(),
        empirical_basis: Some(basis),
        factor_source: source.content_hash().map(|hash| FactorSourceMetadata {
            hash,
            source_name: source.name().to_string(),
            samples_used: report.samples_executed,
        }),
        covariates: options.covariates,
        expiration: options.expiration_days.map(|days| ExpirationPolicy {
            days,
            baseline_end_time: now,
        }),
    };
    Ok((spec, report))
}
