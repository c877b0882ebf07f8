//! Verification feasibility.
//!
//! A run of n samples can only demonstrate a target rate p₀ at confidence c
//! if even a *perfect* run clears it: the one-sided Wilson lower bound of
//! n/n successes is n/(n+z²), so n must reach ⌈p₀·z²/(1−p₀)⌉.

use crate::errors::InvalidArgument;
use crate::model::FeasibilityResult;
use crate::stats::binomial;

pub const FEASIBILITY_CRITERION: &str = "Wilson score one-sided lower bound";

pub fn evaluate(
    samples: u64,
    target_rate: f64,
    confidence: f64,
) -> Result<FeasibilityResult, InvalidArgument> {
    if samples == 0 {
        return Err(InvalidArgument("samples must be positive".into()));
    }
    if !(target_rate > 0.0 && target_rate < 1.0) {
        return Err(InvalidArgument(format!(
            "target rate must lie in (0, 1), got {target_rate}"
        )));
    }

    let z = binomial::z_score_one_sided(confidence)?;
    let z2 = z * z;
    let minimum_samples = (target_rate * z2 / (1.0 - target_rate)).ceil() as u64;
    let feasible = binomial::lower_bound(samples, samples, confidence)? >= target_rate;

    Ok(FeasibilityResult {
        feasible,
        minimum_samples: minimum_samples.max(1),
        alpha: 1.0 - confidence,
        target_rate,
        samples,
        criterion: FEASIBILITY_CRITERION.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twenty_samples_cannot_verify_ninety_percent() {
        let r = evaluate(20, 0.90, 0.95).unwrap();
        assert!(!r.feasible);
        assert_eq!(r.minimum_samples, 25);
        assert!((r.alpha - 0.05).abs() < 1e-12);
    }

    #[test]
    fn the_minimum_is_tight() {
        for (p0, c) in [(0.90, 0.95), (0.95, 0.95), (0.80, 0.90), (0.99, 0.99)] {
            let min = evaluate(1, p0, c).unwrap().minimum_samples;
            assert!(
                evaluate(min, p0, c).unwrap().feasible,
                "minimum {min} infeasible for p0={p0} c={c}"
            );
            if min > 1 {
                assert!(
                    !evaluate(min - 1, p0, c).unwrap().feasible,
                    "minimum {min} not tight for p0={p0} c={c}"
                );
            }
        }
    }

    #[test]
    fn preconditions() {
        assert!(evaluate(0, 0.9, 0.95).is_err());
        assert!(evaluate(10, 0.0, 0.95).is_err());
        assert!(evaluate(10, 1.0, 0.95).is_err());
        assert!(evaluate(10, 0.9, 1.0).is_err());
    }
}
