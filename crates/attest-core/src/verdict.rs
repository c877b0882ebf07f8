//! Verdict evaluation.
//!
//! A verdict compares the observed pass rate against a derived threshold and
//! qualifies the outcome: a failing verdict carries α, the probability that
//! the failure is sampling variance rather than true degradation.

use crate::errors::InvalidArgument;
use crate::model::{DerivedThreshold, VerdictWithConfidence};

/// Compares `successes`/`samples` against the threshold.
pub fn evaluate(
    successes: u64,
    samples: u64,
    threshold: &DerivedThreshold,
) -> Result<VerdictWithConfidence, InvalidArgument> {
    if samples == 0 {
        return Err(InvalidArgument("samples must be positive".into()));
    }
    if successes > samples {
        return Err(InvalidArgument(format!(
            "successes ({successes}) must not exceed samples ({samples})"
        )));
    }

    let observed_rate = successes as f64 / samples as f64;
    let passed = observed_rate >= threshold.value;
    let confidence = threshold.confidence();

    let (false_positive_probability, interpretation) = if passed {
        (
            Some(0.0),
            format!(
                "observed pass rate {:.4} meets threshold {:.4}; no evidence of degradation from baseline",
                observed_rate, threshold.value
            ),
        )
    } else {
        let shortfall = threshold.value - observed_rate;
        match confidence {
            Some(c) => {
                let alpha = 1.0 - c;
                (
                    Some(alpha),
                    format!(
                        "observed pass rate {:.4} fell {:.4} short of threshold {:.4}; at {:.1}% confidence there is a {:.1}% probability this failure is sampling variance rather than true degradation",
                        observed_rate,
                        shortfall,
                        threshold.value,
                        c * 100.0,
                        alpha * 100.0
                    ),
                )
            }
            None => (
                None,
                format!(
                    "observed pass rate {:.4} fell {:.4} short of threshold {:.4}; the threshold carries no recoverable confidence, so the false-positive probability is unknown",
                    observed_rate, shortfall, threshold.value
                ),
            ),
        }
    };

    Ok(VerdictWithConfidence {
        passed,
        observed_rate,
        threshold: threshold.clone(),
        false_positive_probability,
        interpretation,
    })
}

/// Summarizes several runs of the same contract.
///
/// With two or more failures the α values multiply under the assumption that
/// runs are independent and identically distributed; runs whose α is not
/// recoverable are excluded from the product and called out.
pub fn summarize_runs(verdicts: &[VerdictWithConfidence]) -> String {
    if verdicts.is_empty() {
        return "No test runs to summarize.".to_string();
    }

    let failing: Vec<&VerdictWithConfidence> =
        verdicts.iter().filter(|v| !v.passed).collect();
    let total = verdicts.len();

    if failing.is_empty() {
        return format!("all {total} runs passed");
    }

    if failing.len() == 1 {
        return match failing[0].false_positive_probability {
            Some(alpha) => format!(
                "1 of {total} runs failed; the probability of that single failure being a false positive is {alpha:.4}"
            ),
            None => format!(
                "1 of {total} runs failed; its false-positive probability is not recoverable"
            ),
        };
    }

    let alphas: Vec<f64> = failing
        .iter()
        .filter_map(|v| v.false_positive_probability)
        .collect();
    let excluded = failing.len() - alphas.len();
    if alphas.is_empty() {
        return format!(
            "{} of {total} runs failed; no false-positive probabilities are recoverable",
            failing.len()
        );
    }

    let product: f64 = alphas.iter().product();
    let mut summary = format!(
        "{} of {total} runs failed; assuming independent runs, the probability of all being false positives is {product:.2e}; strong evidence of actual degradation",
        failing.len()
    );
    if excluded > 0 {
        summary.push_str(&format!(
            " ({excluded} failing run(s) without a recoverable confidence excluded)"
        ));
    }
    summary
}
