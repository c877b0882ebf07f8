use crate::args::RunArgs;
use crate::body::CommandBody;
use crate::check_file;
use crate::exit_codes;
use attest_core::config::overrides::OverrideResolver;
use attest_core::engine::driver::{measure, Driver, MeasurementOptions};
use attest_core::report::console;
use attest_core::report::summary::{write_summary, RunSummary};
use attest_core::spec_store;
use attest_core::verdict;
use std::path::PathBuf;

pub async fn execute(args: RunArgs) -> anyhow::Result<i32> {
    let check = check_file::load_check(&args.check)?;
    let declared = check.harness_config()?;
    let config = OverrideResolver::new().resolve(declared)?;
    let source = check.input_source();
    let body = CommandBody::new(check.command.clone());
    tracing::info!(
        use_case = %check.use_case,
        inputs = source.len(),
        measure = args.measure,
        "check loaded"
    );

    if args.measure {
        let (spec, report) = measure(
            config,
            MeasurementOptions {
                use_case_id: check.use_case.clone(),
                covariates: None,
                expiration_days: args.expire_days,
            },
            source.as_ref(),
            &body,
        )
        .await?;
        console::print_report(&report);
        let out = args
            .out
            .unwrap_or_else(|| PathBuf::from(format!("{}.spec.yaml", check.use_case)));
        spec_store::save_spec(&spec, &out)?;
        eprintln!("spec '{}' written to {}", spec.spec_id, out.display());
        return Ok(exit_codes::EXIT_SUCCESS);
    }

    let mut driver = Driver::new(config);
    let mut spec_id = None;
    if let Some(spec_path) = &check.spec {
        let spec = spec_store::load_spec(spec_path)?;
        spec_id = Some(spec.spec_id.clone());
        driver = driver.with_spec(spec);
    }

    let runs = args.runs.max(1);
    let factor_hash = source.content_hash();
    let mut verdicts = Vec::new();
    let mut all_passed = true;

    for attempt in 0..runs {
        let run = match driver.configure(source.as_ref()) {
            Ok(run) => run,
            Err(e) => {
                eprintln!("configuration error: {e}");
                return Ok(exit_codes::EXIT_CONFIG_ERROR);
            }
        };
        if attempt == 0 {
            console::print_preflight(run.pacing_report());
        }

        let report = run.execute(source.as_ref(), &body).await?;
        console::print_report(&report);
        all_passed = all_passed && report.passed();
        if let Some(verdict) = &report.verdict {
            verdicts.push(verdict.clone());
        }

        // The summary file captures the most recent run.
        if let Some(out) = &args.summary {
            let summary = RunSummary::from_report(&report, spec_id.clone())
                .with_factor_hash(factor_hash.clone());
            write_summary(&summary, out)?;
        }
    }

    if runs > 1 {
        eprintln!("{}", verdict::summarize_runs(&verdicts));
    }

    Ok(if all_passed {
        exit_codes::EXIT_SUCCESS
    } else {
        exit_codes::EXIT_VERDICT_FAIL
    })
}
