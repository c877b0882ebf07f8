//! End-to-end driver behavior: early termination, budget policies,
//! exception policies, and input cycling, driven by scripted test bodies.

use async_trait::async_trait;
use attest_core::config::{
    BudgetEnvelope, HarnessConfig, OnBudgetExhausted, OnException, TestIntent,
};
use attest_core::engine::body::{SampleContext, SampleFailure, TestBody, UseCaseOutcome};
use attest_core::engine::driver::{Driver, SMOKE_CAVEAT};
use attest_core::engine::inputs::{InputSource, StaticInputSource, UnitInputSource};
use attest_core::errors::ConfigurationError;
use attest_core::factor::ConsistencyStatus;
use attest_core::model::spec::SPEC_VERSION;
use attest_core::model::{
    BaselineData, ExecutionSpecification, ExpirationPolicy, FactorSourceMetadata,
    TerminationReason,
};
use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Mutex;

struct ScriptedBody<F>(F);

#[async_trait]
impl<F> TestBody for ScriptedBody<F>
where
    F: Fn(&mut SampleContext) -> Result<UseCaseOutcome, SampleFailure> + Send + Sync,
{
    async fn invoke(&self, ctx: &mut SampleContext) -> Result<UseCaseOutcome, SampleFailure> {
        (self.0)(ctx)
    }
}

fn always_pass() -> ScriptedBody<impl Fn(&mut SampleContext) -> Result<UseCaseOutcome, SampleFailure> + Send + Sync>
{
    ScriptedBody(|_: &mut SampleContext| Ok(UseCaseOutcome::success()))
}

fn threshold_first(samples: u64, min_pass_rate: f64) -> HarnessConfig {
    HarnessConfig {
        samples: Some(samples),
        min_pass_rate: Some(min_pass_rate),
        ..HarnessConfig::default()
    }
}

fn spec_with_baseline(samples: u64, successes: u64) -> ExecutionSpecification {
    ExecutionSpecification {
        version: SPEC_VERSION,
        spec_id: "spec-under-test".into(),
        use_case_id: "checkout".into(),
        generated_at: Utc::now().to_rfc3339(),
        empirical_basis: Some(BaselineData::new(samples, successes).unwrap()),
        factor_source: None,
        covariates: None,
        expiration: None,
    }
}

#[tokio::test]
async fn six_straight_failures_terminate_a_ninety_five_percent_run() {
    let driver = Driver::new(threshold_first(100, 0.95));
    let source = UnitInputSource::new("unit");
    let body = ScriptedBody(|_: &mut SampleContext| {
        Err(SampleFailure::Assertion("degraded response".into()))
    });

    let report = driver
        .configure(&source)
        .unwrap()
        .execute(&source, &body)
        .await
        .unwrap();

    assert_eq!(report.termination, TerminationReason::Impossibility);
    assert_eq!(report.samples_executed, 6);
    assert_eq!(report.failures, 6);
    assert!(!report.passed());
}

#[tokio::test]
async fn eighty_straight_successes_guarantee_an_eighty_percent_run() {
    let driver = Driver::new(threshold_first(100, 0.80));
    let source = UnitInputSource::new("unit");
    let body = always_pass();

    let report = driver
        .configure(&source)
        .unwrap()
        .execute(&source, &body)
        .await
        .unwrap();

    assert_eq!(report.termination, TerminationReason::SuccessGuaranteed);
    assert_eq!(report.samples_executed, 80);
    assert_eq!(report.successes, 80);
    assert!(report.passed());
}

#[tokio::test]
async fn unexpected_errors_fail_the_sample_under_the_default_policy() {
    let driver = Driver::new(threshold_first(10, 0.5));
    let source = UnitInputSource::new("unit");
    let body = ScriptedBody(|ctx: &mut SampleContext| {
        if ctx.sample_index() % 2 == 0 {
            Ok(UseCaseOutcome::success())
        } else {
            Err(SampleFailure::Unexpected(anyhow::anyhow!(
                "connection reset"
            )))
        }
    });

    let report = driver
        .configure(&source)
        .unwrap()
        .execute(&source, &body)
        .await
        .unwrap();

    assert_eq!(report.samples_executed, report.successes + report.failures);
    assert!(report.failures >= 1);
    assert!(report
        .example_failures
        .iter()
        .any(|c| c.contains("connection reset")));
}

#[tokio::test]
async fn abort_policy_stops_the_run_on_the_first_unexpected_error() {
    let mut cfg = threshold_first(10, 0.5);
    cfg.budget.on_exception = OnException::AbortTest;
    let driver = Driver::new(cfg);
    let source = UnitInputSource::new("unit");
    let body = ScriptedBody(|ctx: &mut SampleContext| {
        if ctx.sample_index() < 2 {
            Ok(UseCaseOutcome::success())
        } else {
            Err(SampleFailure::Unexpected(anyhow::anyhow!("backend down")))
        }
    });

    let report = driver
        .configure(&source)
        .unwrap()
        .execute(&source, &body)
        .await
        .unwrap();

    assert_eq!(report.termination, TerminationReason::ExceptionAbort);
    assert_eq!(report.samples_executed, 2);
    assert_eq!(report.termination_details.as_deref(), Some("backend down"));
}

#[tokio::test]
async fn static_token_charges_exhaust_the_token_budget() {
    let mut cfg = threshold_first(10, 0.5);
    cfg.budget = BudgetEnvelope {
        token_budget: Some(25),
        token_charge: Some(10),
        on_budget_exhausted: OnBudgetExhausted::EvaluatePartial,
        ..BudgetEnvelope::default()
    };
    let driver = Driver::new(cfg);
    let source = UnitInputSource::new("unit");
    let body = always_pass();

    let report = driver
        .configure(&source)
        .unwrap()
        .execute(&source, &body)
        .await
        .unwrap();

    // Crossed at the third sample's charge (30 > 25), observed at the top of
    // the fourth iteration.
    assert_eq!(report.termination, TerminationReason::TokenBudget);
    assert_eq!(report.samples_executed, 3);
    assert_eq!(report.tokens_used, 30);
    // Partial evaluation: 3/3 observed ≥ 0.5 threshold.
    assert!(report.passed());
    assert!(!report.forced_failure);
}

#[tokio::test]
async fn fail_policy_forces_the_verdict_down_regardless_of_observed_rate() {
    let mut cfg = threshold_first(10, 0.5);
    cfg.budget = BudgetEnvelope {
        token_budget: Some(25),
        token_charge: Some(10),
        on_budget_exhausted: OnBudgetExhausted::Fail,
        ..BudgetEnvelope::default()
    };
    let driver = Driver::new(cfg);
    let source = UnitInputSource::new("unit");
    let body = always_pass();

    let report = driver
        .configure(&source)
        .unwrap()
        .execute(&source, &body)
        .await
        .unwrap();

    assert_eq!(report.termination, TerminationReason::TokenBudget);
    assert!(report.forced_failure);
    assert!(!report.passed());
    let verdict = report.verdict.unwrap();
    assert!(verdict.interpretation.contains("FAIL policy"));
}

#[tokio::test]
async fn zero_time_budget_terminates_before_any_sample() {
    let mut cfg = threshold_first(10, 0.5);
    cfg.budget.time_budget_ms = Some(0);
    let driver = Driver::new(cfg);
    let source = UnitInputSource::new("unit");
    let body = always_pass();

    let report = driver
        .configure(&source)
        .unwrap()
        .execute(&source, &body)
        .await
        .unwrap();

    assert_eq!(report.termination, TerminationReason::TimeBudget);
    assert_eq!(report.samples_executed, 0);
    assert!(!report.passed());
    assert!(report
        .verdict
        .unwrap()
        .interpretation
        .contains("no samples executed"));
}

#[tokio::test]
async fn dynamic_token_recording_feeds_the_tracker() {
    let driver = Driver::new(threshold_first(4, 0.5));
    let source = UnitInputSource::new("unit");
    let body = ScriptedBody(|ctx: &mut SampleContext| {
        ctx.record_tokens(7);
        Ok(UseCaseOutcome::success())
    });

    let report = driver
        .configure(&source)
        .unwrap()
        .execute(&source, &body)
        .await
        .unwrap();

    // Success is guaranteed after sample 2 of 4 at rate 0.5.
    assert_eq!(report.termination, TerminationReason::SuccessGuaranteed);
    assert_eq!(report.tokens_used, 7 * report.samples_executed);
}

#[tokio::test]
async fn inputs_cycle_modulo_the_source_length() {
    let seen = Mutex::new(Vec::new());
    let source = StaticInputSource::new(
        "letters",
        vec![vec![json!("a")], vec![json!("b")], vec![json!("c")]],
    );
    let body = ScriptedBody(|ctx: &mut SampleContext| {
        seen.lock()
            .unwrap()
            .push(ctx.input()[0].as_str().unwrap().to_string());
        Ok(UseCaseOutcome::success())
    });

    // A perfect-rate run can never terminate early while it keeps passing.
    let driver = Driver::new(threshold_first(7, 1.0));
    let report = driver
        .configure(&source)
        .unwrap()
        .execute(&source, &body)
        .await
        .unwrap();

    assert_eq!(report.termination, TerminationReason::Completed);
    assert_eq!(report.samples_executed, 7);
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["a", "b", "c", "a", "b", "c", "a"]
    );
}

#[tokio::test]
async fn example_failures_are_bounded_by_the_configured_window() {
    let mut cfg = threshold_first(10, 0.5);
    cfg.budget.max_example_failures = 2;
    let driver = Driver::new(cfg);
    let source = UnitInputSource::new("unit");
    let body = ScriptedBody(|ctx: &mut SampleContext| {
        Err(SampleFailure::Assertion(format!(
            "failure at sample {}",
            ctx.sample_index()
        )))
    });

    let report = driver
        .configure(&source)
        .unwrap()
        .execute(&source, &body)
        .await
        .unwrap();

    assert_eq!(report.termination, TerminationReason::Impossibility);
    assert_eq!(report.failures, 6);
    assert_eq!(report.example_failures.len(), 2);
}

#[tokio::test]
async fn criteria_failures_count_as_sample_failures() {
    use attest_core::model::CriteriaBundle;

    let driver = Driver::new(threshold_first(4, 0.5));
    let source = UnitInputSource::new("unit");
    let body = ScriptedBody(|ctx: &mut SampleContext| {
        let mut criteria = CriteriaBundle::new();
        criteria.passed("responds");
        if ctx.sample_index() == 0 {
            criteria.failed("correct total", "expected 42, got 41");
        } else {
            criteria.passed("correct total");
        }
        Ok(UseCaseOutcome::with_criteria(criteria))
    });

    let report = driver
        .configure(&source)
        .unwrap()
        .execute(&source, &body)
        .await
        .unwrap();

    assert_eq!(report.failures, 1);
    assert!(report.example_failures[0].contains("expected 42, got 41"));
}

#[test]
fn empty_sources_are_rejected_at_configure_time() {
    let driver = Driver::new(threshold_first(10, 0.5));
    let source = StaticInputSource::new("empty", Vec::new());
    assert!(matches!(
        driver.configure(&source),
        Err(ConfigurationError::EmptyInputSource { .. })
    ));
}

#[test]
fn undersized_verification_runs_are_rejected() {
    let cfg = HarnessConfig {
        samples: Some(5),
        threshold_confidence: Some(0.95),
        ..HarnessConfig::default()
    };
    let driver = Driver::new(cfg).with_spec(spec_with_baseline(1000, 951));
    let source = UnitInputSource::new("unit");
    match driver.configure(&source) {
        Err(ConfigurationError::Infeasible(msg)) => {
            assert!(msg.contains("5 samples"));
            assert!(msg.contains("smoke"));
        }
        other => panic!("expected Infeasible, got {other:?}"),
    }
}

#[test]
fn undersized_smoke_runs_proceed_with_a_caveat() {
    let cfg = HarnessConfig {
        samples: Some(5),
        threshold_confidence: Some(0.95),
        intent: TestIntent::Smoke,
        ..HarnessConfig::default()
    };
    let driver = Driver::new(cfg).with_spec(spec_with_baseline(1000, 951));
    let source = UnitInputSource::new("unit");
    let run = driver.configure(&source).unwrap();
    assert!(run.caveats().iter().any(|c| c == SMOKE_CAVEAT));
}

#[test]
fn expired_specs_block_verification_but_not_smoke() {
    let mut spec = spec_with_baseline(1000, 951);
    spec.expiration = Some(ExpirationPolicy {
        days: 5,
        baseline_end_time: (Utc::now() - Duration::days(30)).to_rfc3339(),
    });

    let cfg = HarnessConfig {
        samples: Some(100),
        threshold_confidence: Some(0.95),
        ..HarnessConfig::default()
    };
    let driver = Driver::new(cfg.clone()).with_spec(spec.clone());
    let source = UnitInputSource::new("unit");
    assert!(matches!(
        driver.configure(&source),
        Err(ConfigurationError::SpecExpired { .. })
    ));

    let smoke = HarnessConfig {
        intent: TestIntent::Smoke,
        ..cfg
    };
    let run = Driver::new(smoke)
        .with_spec(spec)
        .configure(&source)
        .unwrap();
    assert!(run.caveats().iter().any(|c| c.contains("expired")));
}

#[tokio::test]
async fn factor_mismatch_is_reported_but_not_fatal() {
    let mut spec = spec_with_baseline(1000, 951);
    spec.factor_source = Some(FactorSourceMetadata {
        hash: "0000000000000000".into(),
        source_name: "old-inputs".into(),
        samples_used: 1000,
    });

    let cfg = HarnessConfig {
        samples: Some(50),
        min_pass_rate: Some(0.5),
        ..HarnessConfig::default()
    };
    let source = StaticInputSource::new("new-inputs", vec![vec![json!("x")]]);
    let driver = Driver::new(cfg).with_spec(spec);
    let run = driver.configure(&source).unwrap();
    let outcome = run.factor_consistency().unwrap();
    assert_eq!(outcome.status, ConsistencyStatus::Mismatch);
    assert!(outcome.note.as_ref().unwrap().contains("1000"));

    let report = run.execute(&source, &always_pass()).await.unwrap();
    assert!(report.passed());
}

#[tokio::test]
async fn measurement_produces_a_spec_with_the_observed_baseline() {
    use attest_core::engine::driver::{measure, MeasurementOptions};
    use attest_core::model::{CovariateProfile, CovariateValue};

    let cfg = HarnessConfig {
        samples: Some(20),
        ..HarnessConfig::default()
    };
    let source = StaticInputSource::new("checkout-inputs", vec![vec![json!("x")], vec![json!("y")]]);
    let body = ScriptedBody(|ctx: &mut SampleContext| {
        if ctx.sample_index() % 10 == 9 {
            Err(SampleFailure::Assertion("flaky tail".into()))
        } else {
            Ok(UseCaseOutcome::success())
        }
    });

    let mut covariates = CovariateProfile::new();
    covariates.set(
        "region",
        CovariateValue::String {
            value: "eu-west-1".into(),
        },
    );
    let (spec, report) = measure(
        cfg,
        MeasurementOptions {
            use_case_id: "checkout".into(),
            covariates: Some(covariates),
            expiration_days: Some(30),
        },
        &source,
        &body,
    )
    .await
    .unwrap();

    assert_eq!(report.termination, TerminationReason::Completed);
    assert!(report.verdict.is_none());
    let basis = spec.empirical_basis.unwrap();
    assert_eq!(basis.samples, 20);
    assert_eq!(basis.successes, 18);
    assert_eq!(spec.use_case_id, "checkout");
    let factor = spec.factor_source.unwrap();
    assert_eq!(factor.source_name, "checkout-inputs");
    assert_eq!(factor.samples_used, 20);
    assert_eq!(factor.hash, source.content_hash().unwrap());
    assert_eq!(spec.expiration.unwrap().days, 30);
}

#[test]
fn spec_driven_modes_demand_baseline_data() {
    let mut spec = spec_with_baseline(1000, 951);
    spec.empirical_basis = None;

    let cfg = HarnessConfig {
        samples: Some(100),
        threshold_confidence: Some(0.95),
        ..HarnessConfig::default()
    };
    let driver = Driver::new(cfg).with_spec(spec);
    let source = UnitInputSource::new("unit");
    match driver.configure(&source) {
        Err(ConfigurationError::MissingBaselineData { spec_id }) => {
            assert_eq!(spec_id, "spec-under-test");
        }
        other => panic!("expected MissingBaselineData, got {other:?}"),
    }
}

#[tokio::test]
async fn outer_budget_scopes_bound_the_run() {
    use attest_core::engine::budget::{BudgetLimit, BudgetScope};

    let driver = Driver::new(threshold_first(10, 0.5)).with_outer_budget(BudgetLimit {
        scope: BudgetScope::Suite,
        time_budget_ms: Some(0),
        token_budget: None,
    });
    let source = UnitInputSource::new("unit");
    let body = always_pass();

    let report = driver
        .configure(&source)
        .unwrap()
        .execute(&source, &body)
        .await
        .unwrap();

    assert_eq!(report.termination, TerminationReason::TimeBudget);
    assert_eq!(report.samples_executed, 0);
    assert!(report
        .termination_details
        .as_deref()
        .unwrap()
        .contains("suite"));
}

#[tokio::test]
async fn confidence_first_derives_the_sample_count_from_power_analysis() {
    let cfg = HarnessConfig {
        confidence: Some(0.95),
        min_detectable_effect: Some(0.05),
        power: Some(0.80),
        ..HarnessConfig::default()
    };
    let driver = Driver::new(cfg).with_spec(spec_with_baseline(1000, 951));
    let source = UnitInputSource::new("unit");
    let run = driver.configure(&source).unwrap();

    let samples = run.total_samples();
    assert!((100..=200).contains(&samples), "derived {samples}");
    let threshold = run.threshold().unwrap();
    assert!((threshold.value - 0.9385).abs() < 1e-3);
    assert!(threshold.is_statistically_sound);
}
