//! Threshold derivation.
//!
//! Sample-size-first: the one-sided Wilson lower bound of the baseline at
//! confidence c is the largest hypothesis p₀ the baseline would fail to
//! reject at level α = 1−c, so using it as the test threshold bounds the
//! long-run false-positive rate under "system unchanged" at α.
//!
//! Threshold-first: the caller fixes the threshold; the confidence that
//! *would have* produced it is recovered by bisection over the strictly
//! decreasing lower bound, and the result is flagged unsound when that
//! implied confidence is low.

use crate::errors::InvalidArgument;
use crate::model::{DerivationContext, DerivedThreshold, OperationalApproach};
use crate::stats::binomial;

/// Bisection bracket for implied-confidence recovery.
const MIN_CONFIDENCE: f64 = 0.01;
const MAX_CONFIDENCE: f64 = 0.999_999_9;
/// Bracket width at which the bisection stops.
const CONFIDENCE_TOLERANCE: f64 = 1e-4;
const MAX_ITERATIONS: u32 = 100;

/// Implied confidence below which a threshold-first derivation is flagged
/// as statistically unsound.
pub const SOUND_CONFIDENCE_FLOOR: f64 = 0.80;

/// Threshold = one-sided Wilson lower bound of the baseline at `confidence`.
///
/// A perfect baseline (k = n) yields n/(n+z²) < 1, so no special case is
/// needed there.
pub fn derive_sample_size_first(
    baseline_samples: u64,
    baseline_successes: u64,
    test_samples: u64,
    confidence: f64,
) -> Result<DerivedThreshold, InvalidArgument> {
    if test_samples == 0 {
        return Err(InvalidArgument("test_samples must be positive".into()));
    }
    let value = binomial::lower_bound(baseline_successes, baseline_samples, confidence)?;
    Ok(DerivedThreshold {
        value,
        approach: OperationalApproach::SampleSizeFirst,
        context: Some(DerivationContext {
            baseline_rate: baseline_successes as f64 / baseline_samples as f64,
            baseline_samples,
            test_samples,
            confidence,
        }),
        is_statistically_sound: true,
    })
}

/// Keeps the caller's explicit threshold and recovers the confidence it
/// implies against the baseline.
pub fn derive_threshold_first(
    baseline_samples: u64,
    baseline_successes: u64,
    test_samples: u64,
    explicit_threshold: f64,
) -> Result<DerivedThreshold, InvalidArgument> {
    if test_samples == 0 {
        return Err(InvalidArgument("test_samples must be positive".into()));
    }
    if !(0.0..=1.0).contains(&explicit_threshold) {
        return Err(InvalidArgument(format!(
            "threshold must lie in [0, 1], got {explicit_threshold}"
        )));
    }

    let implied =
        implied_confidence(baseline_samples, baseline_successes, explicit_threshold)?;
    Ok(DerivedThreshold {
        value: explicit_threshold,
        approach: OperationalApproach::ThresholdFirst,
        context: Some(DerivationContext {
            baseline_rate: baseline_successes as f64 / baseline_samples as f64,
            baseline_samples,
            test_samples,
            confidence: implied,
        }),
        is_statistically_sound: implied >= SOUND_CONFIDENCE_FLOOR,
    })
}

/// Bisects c over the bracket for the value whose lower bound equals
/// `target`. The lower bound is strictly decreasing in c, so the bracket
/// halves cleanly; targets outside the attainable range converge onto the
/// nearest bracket edge.
fn implied_confidence(
    baseline_samples: u64,
    baseline_successes: u64,
    target: f64,
) -> Result<f64, InvalidArgument> {
    let bound_at = |c: f64| binomial::lower_bound(baseline_successes, baseline_samples, c);

    let mut lo = MIN_CONFIDENCE;
    let mut hi = MAX_CONFIDENCE;
    if bound_at(lo)? <= target {
        return Ok(lo);
    }
    if bound_at(hi)? >= target {
        return Ok(hi);
    }

    let mut iterations = 0;
    while hi - lo > CONFIDENCE_TOLERANCE && iterations < MAX_ITERATIONS {
        let mid = (lo + hi) / 2.0;
        if bound_at(mid)? > target {
            lo = mid;
        } else {
            hi = mid;
        }
        iterations += 1;
    }
    Ok((lo + hi) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_size_first_at_ninety_five() {
        let t = derive_sample_size_first(1000, 951, 100, 0.95).unwrap();
        assert!((t.value - 0.9385).abs() < 1e-3, "value {}", t.value);
        assert!(t.is_statistically_sound);
        let ctx = t.context.unwrap();
        assert!((ctx.baseline_rate - 0.951).abs() < 1e-12);
        // Gap between baseline rate and derived threshold.
        assert!((ctx.baseline_rate - t.value) > 0.01);
        assert!((ctx.baseline_rate - t.value) < 0.02);
    }

    #[test]
    fn threshold_at_the_baseline_rate_implies_coin_flip_confidence() {
        // The lower bound equals p̂ exactly at c = 0.5 (z = 0).
        let t = derive_threshold_first(1000, 951, 100, 0.951).unwrap();
        assert_eq!(t.value, 0.951);
        let implied = t.context.unwrap().confidence;
        assert!(implied <= 0.51, "implied {implied}");
        assert!(!t.is_statistically_sound);
    }

    #[test]
    fn round_trip_recovers_the_original_confidence() {
        for c in [0.85, 0.90, 0.95, 0.99] {
            let derived = derive_sample_size_first(1000, 951, 100, c).unwrap();
            let inverted = derive_threshold_first(1000, 951, 100, derived.value).unwrap();
            let implied = inverted.context.unwrap().confidence;
            assert!(
                (implied - c).abs() < 1e-3,
                "c = {c}, implied = {implied}"
            );
        }
    }

    #[test]
    fn sound_flag_tracks_the_floor() {
        let generous = derive_sample_size_first(1000, 951, 100, 0.95).unwrap();
        let strict = derive_threshold_first(1000, 951, 100, generous.value).unwrap();
        assert!(strict.is_statistically_sound);

        let lax = derive_threshold_first(1000, 951, 100, 0.950).unwrap();
        assert!(!lax.is_statistically_sound);
    }

    #[test]
    fn extreme_thresholds_converge_to_the_bracket_edges() {
        // Far below anything the baseline supports: maximal confidence.
        let low = derive_threshold_first(1000, 951, 100, 0.10).unwrap();
        assert!(low.context.unwrap().confidence > 0.999);

        // Above the c→0.01 bound: minimal confidence.
        let high = derive_threshold_first(1000, 951, 100, 0.999).unwrap();
        assert!((high.context.unwrap().confidence - 0.01).abs() < 1e-9);
        assert!(!high.is_statistically_sound);
    }

    #[test]
    fn perfect_baseline_threshold_stays_below_one() {
        for n in [1u64, 10, 100, 1000] {
            for c in [0.5, 0.9, 0.99, 0.999] {
                let t = derive_sample_size_first(n, n, 10, c).unwrap();
                assert!(t.value < 1.0, "n={n} c={c} value={}", t.value);
            }
        }
    }
}
