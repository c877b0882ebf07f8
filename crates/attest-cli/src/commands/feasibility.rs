use crate::args::FeasibilityArgs;
use crate::exit_codes;
use attest_core::stats::feasibility;

pub fn execute(args: FeasibilityArgs) -> anyhow::Result<i32> {
    let result = feasibility::evaluate(args.samples, args.target_rate, args.confidence)?;
    if result.feasible {
        println!(
            "✅ {} samples can verify target rate {:.4} at {:.1}% confidence ({})",
            result.samples,
            result.target_rate,
            args.confidence * 100.0,
            result.criterion
        );
    } else {
        println!(
            "❌ {} samples cannot verify target rate {:.4} at {:.1}% confidence; at least {} samples are needed",
            result.samples,
            result.target_rate,
            args.confidence * 100.0,
            result.minimum_samples
        );
    }
    Ok(exit_codes::EXIT_SUCCESS)
}
