//! Power analysis for one-sided binomial tests.
//!
//! Sizes a test to detect a drop of δ below the baseline rate p₀ with the
//! requested confidence (1−α) and power (1−β), using the two-sigma normal
//! approximation n = ⌈((z_α·σ₀ + z_β·σ₁)/δ)²⌉ with σᵢ = √(pᵢ(1−pᵢ)).

use crate::errors::InvalidArgument;
use crate::model::SampleSizeRequirement;
use crate::stats::binomial;
use statrs::distribution::{ContinuousCDF, Normal};

fn check_unit_open(name: &str, v: f64) -> Result<(), InvalidArgument> {
    if !(v > 0.0 && v < 1.0) {
        return Err(InvalidArgument(format!(
            "{name} must lie in (0, 1), got {v}"
        )));
    }
    Ok(())
}

/// Required sample size for detecting a degradation of `min_detectable_effect`
/// below `baseline_rate`.
pub fn required_samples(
    baseline_rate: f64,
    min_detectable_effect: f64,
    confidence: f64,
    power: f64,
) -> Result<SampleSizeRequirement, InvalidArgument> {
    check_unit_open("baseline_rate", baseline_rate)?;
    check_unit_open("min_detectable_effect", min_detectable_effect)?;
    check_unit_open("confidence", confidence)?;
    check_unit_open("power", power)?;

    let alternative_rate = baseline_rate - min_detectable_effect;
    if alternative_rate < 0.0 {
        return Err(InvalidArgument(format!(
            "min_detectable_effect {min_detectable_effect} exceeds baseline rate {baseline_rate}"
        )));
    }

    let sigma0 = (baseline_rate * (1.0 - baseline_rate)).sqrt();
    let sigma1 = (alternative_rate * (1.0 - alternative_rate)).sqrt();
    let z_alpha = binomial::z_score_one_sided(confidence)?;
    let normal = Normal::new(0.0, 1.0).expect("standard normal is well-formed");
    let z_beta = normal.inverse_cdf(power);

    let n = ((z_alpha * sigma0 + z_beta * sigma1) / min_detectable_effect).powi(2);
    Ok(SampleSizeRequirement {
        required_samples: n.ceil() as u64,
        baseline_rate,
        alternative_rate,
        min_detectable_effect,
        confidence,
        power,
    })
}

/// Power actually achieved by a test of `samples` trials: Φ(z_β) with
/// z_β = (δ·√n − z_α·σ₀)/σ₁.
pub fn achieved_power(
    samples: u64,
    baseline_rate: f64,
    min_detectable_effect: f64,
    confidence: f64,
) -> Result<f64, InvalidArgument> {
    if samples == 0 {
        return Err(InvalidArgument("samples must be positive".into()));
    }
    check_unit_open("baseline_rate", baseline_rate)?;
    check_unit_open("min_detectable_effect", min_detectable_effect)?;
    check_unit_open("confidence", confidence)?;

    let alternative_rate = baseline_rate - min_detectable_effect;
    if alternative_rate < 0.0 {
        return Err(InvalidArgument(format!(
            "min_detectable_effect {min_detectable_effect} exceeds baseline rate {baseline_rate}"
        )));
    }

    let sigma0 = (baseline_rate * (1.0 - baseline_rate)).sqrt();
    let sigma1 = (alternative_rate * (1.0 - alternative_rate)).sqrt();
    let z_alpha = binomial::z_score_one_sided(confidence)?;
    let numerator = min_detectable_effect * (samples as f64).sqrt() - z_alpha * sigma0;

    // Degenerate alternative (p₁ = 0): the detection either always or never
    // clears the critical value.
    if sigma1 == 0.0 {
        return Ok(if numerator >= 0.0 { 1.0 } else { 0.0 });
    }

    let normal = Normal::new(0.0, 1.0).expect("standard normal is well-formed");
    Ok(normal.cdf(numerator / sigma1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detecting_five_points_below_ninety_five() {
        let req = required_samples(0.95, 0.05, 0.95, 0.80).unwrap();
        assert!((100..=200).contains(&req.required_samples), "n = {}", req.required_samples);
        assert!((req.alternative_rate - 0.90).abs() < 1e-12);
    }

    #[test]
    fn required_samples_monotone_in_confidence() {
        let mut last = 0;
        for c in [0.80, 0.90, 0.95, 0.99] {
            let n = required_samples(0.95, 0.05, c, 0.80).unwrap().required_samples;
            assert!(n >= last, "n not monotone at c={c}");
            last = n;
        }
    }

    #[test]
    fn required_samples_monotone_in_power() {
        let mut last = 0;
        for p in [0.50, 0.80, 0.90, 0.99] {
            let n = required_samples(0.95, 0.05, 0.95, p).unwrap().required_samples;
            assert!(n >= last, "n not monotone at power={p}");
            last = n;
        }
    }

    #[test]
    fn required_samples_antitone_in_effect_size() {
        let mut last = u64::MAX;
        for d in [0.02, 0.05, 0.10, 0.20] {
            let n = required_samples(0.95, d, 0.95, 0.80).unwrap().required_samples;
            assert!(n <= last, "n not antitone at delta={d}");
            last = n;
        }
    }

    #[test]
    fn achieved_power_recovers_the_target() {
        let req = required_samples(0.95, 0.05, 0.95, 0.80).unwrap();
        let power = achieved_power(req.required_samples, 0.95, 0.05, 0.95).unwrap();
        assert!(power >= 0.80, "power {power} below target");
        assert!(power < 0.90, "power {power} suspiciously far above target");
    }

    #[test]
    fn effect_larger_than_baseline_is_rejected() {
        assert!(required_samples(0.10, 0.20, 0.95, 0.80).is_err());
        assert!(achieved_power(100, 0.10, 0.20, 0.95).is_err());
    }

    #[test]
    fn degenerate_alternative_rate() {
        // p₁ = 0 exactly: still sizable, σ₁ = 0.
        let req = required_samples(0.05, 0.05, 0.95, 0.80).unwrap();
        assert!(req.required_samples >= 1);
        let p = achieved_power(req.required_samples, 0.05, 0.05, 0.95).unwrap();
        assert_eq!(p, 1.0);
    }
}
