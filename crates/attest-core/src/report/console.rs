//! Human-readable run rendering.

use crate::engine::driver::RunReport;
use crate::engine::pacing::PacingReport;

pub fn print_preflight(report: &PacingReport) {
    if report.inter_sample_delay_ms == 0 {
        eprintln!("Pacing: unconstrained ({} samples)", report.planned_samples);
    } else {
        eprintln!(
            "Pacing: {} samples at {} ms between samples (~{:.0}/h), estimated {} ms, completing around {}",
            report.planned_samples,
            report.inter_sample_delay_ms,
            report.effective_throughput_per_hour.unwrap_or(0.0),
            report.estimated_duration_ms,
            report.estimated_completion
        );
    }
    if let Some(warning) = &report.feasibility_warning {
        eprintln!("⚠️ {warning}");
    }
}

pub fn print_report(report: &RunReport) {
    match &report.verdict {
        Some(verdict) => {
            let marker = if verdict.passed { "✅" } else { "❌" };
            eprintln!(
                "{marker} {}: observed {:.4} vs threshold {:.4} ({} of {} samples, termination: {})",
                if verdict.passed { "PASS" } else { "FAIL" },
                verdict.observed_rate,
                verdict.threshold.value,
                report.samples_executed,
                report.samples_planned,
                report.termination.as_str()
            );
            eprintln!("   {}", verdict.interpretation);
            if let Some(alpha) = verdict.false_positive_probability {
                if !verdict.passed {
                    eprintln!("   false-positive probability: {alpha:.4}");
                }
            }
        }
        None => {
            eprintln!(
                "Measured {} of {} samples: pass rate {:.4} (termination: {})",
                report.samples_executed,
                report.samples_planned,
                report.observed_pass_rate,
                report.termination.as_str()
            );
        }
    }

    if let Some(details) = &report.termination_details {
        eprintln!("   {details}");
    }
    if let Some(factor) = &report.factor_consistency {
        eprintln!("   {}", factor.message);
        if let Some(note) = &factor.note {
            eprintln!("   note: {note}");
        }
    }
    for caveat in &report.caveats {
        eprintln!("   ⚠️ {caveat}");
    }
    if !report.example_failures.is_empty() {
        eprintln!("   example failures:");
        for cause in &report.example_failures {
            eprintln!("     - {cause}");
        }
    }
}
