use crate::args::{SpecArgs, SpecCommand};
use crate::check_file;
use crate::exit_codes;
use attest_core::factor::{self, ConsistencyStatus, TestFactorSource};
use attest_core::model::ExpirationStatus;
use attest_core::spec_store;
use chrono::Utc;

pub fn execute(args: SpecArgs) -> anyhow::Result<i32> {
    match args.cmd {
        SpecCommand::Show { path } => {
            let spec = spec_store::load_spec(&path)?;
            println!("{}", serde_yaml::to_string(&spec)?);
            Ok(exit_codes::EXIT_SUCCESS)
        }
        SpecCommand::Validate { path, check } => {
            let spec = spec_store::load_spec(&path)?;
            let mut healthy = true;

            match spec.expiration_status(Utc::now())? {
                ExpirationStatus::NoPolicy => {
                    println!("ℹ️ spec '{}' has no expiration policy", spec.spec_id)
                }
                ExpirationStatus::NotExpired { days_remaining } => {
                    println!(
                        "✅ spec '{}' valid for another {days_remaining} day(s)",
                        spec.spec_id
                    )
                }
                ExpirationStatus::Expired { days_overdue } => {
                    println!("❌ spec '{}' expired {days_overdue} day(s) ago", spec.spec_id);
                    healthy = false;
                }
            }

            if let Some(check_path) = check {
                let check = check_file::load_check(&check_path)?;
                let source = check.input_source();
                let test_side = source.content_hash().map(|hash| TestFactorSource {
                    name: source.name().to_string(),
                    hash,
                    samples_planned: check.samples.unwrap_or(source.len() as u64),
                });
                let outcome = factor::validate(test_side.as_ref(), spec.factor_source.as_ref());
                println!("{}", outcome.message);
                if let Some(note) = &outcome.note {
                    println!("note: {note}");
                }
                if outcome.status == ConsistencyStatus::Mismatch {
                    healthy = false;
                }
            }

            Ok(if healthy {
                exit_codes::EXIT_SUCCESS
            } else {
                exit_codes::EXIT_VERDICT_FAIL
            })
        }
    }
}
