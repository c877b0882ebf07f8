use crate::args::PlanArgs;
use crate::exit_codes;
use attest_core::stats::power;

pub fn execute(args: PlanArgs) -> anyhow::Result<i32> {
    let req = power::required_samples(
        args.baseline_rate,
        args.min_detectable_effect,
        args.confidence,
        args.power,
    )?;
    println!(
        "{} samples required to detect a drop from {:.4} to {:.4} (δ = {:.4}) at {:.1}% confidence with {:.0}% power",
        req.required_samples,
        req.baseline_rate,
        req.alternative_rate,
        req.min_detectable_effect,
        req.confidence * 100.0,
        req.power * 100.0
    );
    let achieved =
        power::achieved_power(req.required_samples, args.baseline_rate, args.min_detectable_effect, args.confidence)?;
    println!("achieved power at that size: {achieved:.4}");
    Ok(exit_codes::EXIT_SUCCESS)
}
