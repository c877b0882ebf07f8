//! Binomial proportion primitives.
//!
//! Wilson score forms are used throughout: they keep usable coverage near 0
//! and 1 where the plain normal approximation collapses. `standard_error`
//! returns 0 at the boundaries; callers needing a bound near a perfect or
//! zero rate must use the Wilson functions instead.

use crate::errors::InvalidArgument;
use crate::model::ProportionEstimate;
use statrs::distribution::{ContinuousCDF, Normal};

fn std_normal() -> Normal {
    Normal::new(0.0, 1.0).expect("standard normal is well-formed")
}

fn check_counts(successes: u64, trials: u64) -> Result<(), InvalidArgument> {
    if trials == 0 {
        return Err(InvalidArgument("trials must be positive".into()));
    }
    if successes > trials {
        return Err(InvalidArgument(format!(
            "successes ({successes}) must not exceed trials ({trials})"
        )));
    }
    Ok(())
}

fn check_confidence(confidence: f64) -> Result<(), InvalidArgument> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(InvalidArgument(format!(
            "confidence must lie in (0, 1), got {confidence}"
        )));
    }
    Ok(())
}

/// √(p̂(1−p̂)/n). Collapses to 0 when p̂ is 0 or 1.
pub fn standard_error(successes: u64, trials: u64) -> Result<f64, InvalidArgument> {
    check_counts(successes, trials)?;
    let n = trials as f64;
    let p = successes as f64 / n;
    Ok((p * (1.0 - p) / n).sqrt())
}

/// Φ⁻¹(1−α) with α = 1−confidence.
pub fn z_score_one_sided(confidence: f64) -> Result<f64, InvalidArgument> {
    check_confidence(confidence)?;
    Ok(std_normal().inverse_cdf(confidence))
}

/// Φ⁻¹(1−α/2) with α = 1−confidence.
pub fn z_score_two_sided(confidence: f64) -> Result<f64, InvalidArgument> {
    check_confidence(confidence)?;
    let alpha = 1.0 - confidence;
    Ok(std_normal().inverse_cdf(1.0 - alpha / 2.0))
}

/// Two-sided Wilson score interval around p̂ = k/n.
pub fn estimate(
    successes: u64,
    trials: u64,
    confidence: f64,
) -> Result<ProportionEstimate, InvalidArgument> {
    check_counts(successes, trials)?;
    let z = z_score_two_sided(confidence)?;
    let n = trials as f64;
    let p = successes as f64 / n;
    let z2 = z * z;
    let denominator = 1.0 + z2 / n;
    let center = (p + z2 / (2.0 * n)) / denominator;
    let margin = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denominator;
    Ok(ProportionEstimate {
        point_estimate: p,
        sample_size: trials,
        lower_bound: (center - margin).max(0.0),
        upper_bound: (center + margin).min(1.0),
        confidence_level: confidence,
    })
}

/// One-sided Wilson lower bound: the whole error budget sits in the lower
/// tail, so z = Φ⁻¹(1−α) rather than Φ⁻¹(1−α/2).
pub fn lower_bound(
    successes: u64,
    trials: u64,
    confidence: f64,
) -> Result<f64, InvalidArgument> {
    check_counts(successes, trials)?;
    let z = z_score_one_sided(confidence)?;
    let n = trials as f64;
    let p = successes as f64 / n;
    let z2 = z * z;
    let denominator = 1.0 + z2 / n;
    let center = p + z2 / (2.0 * n);
    let margin = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt();
    Ok(((center - margin) / denominator).max(0.0))
}

/// (p̂ − π₀)/√(π₀(1−π₀)/n); 0 when the denominator collapses.
pub fn z_test_statistic(
    observed: f64,
    hypothesised: f64,
    trials: u64,
) -> Result<f64, InvalidArgument> {
    if trials == 0 {
        return Err(InvalidArgument("trials must be positive".into()));
    }
    for (name, v) in [("observed", observed), ("hypothesised", hypothesised)] {
        if !(0.0..=1.0).contains(&v) {
            return Err(InvalidArgument(format!(
                "{name} rate must lie in [0, 1], got {v}"
            )));
        }
    }
    let se = (hypothesised * (1.0 - hypothesised) / trials as f64).sqrt();
    if se == 0.0 {
        return Ok(0.0);
    }
    Ok((observed - hypothesised) / se)
}

/// 1 − Φ(z).
pub fn one_sided_p_value(z: f64) -> f64 {
    1.0 - std_normal().cdf(z)
}
