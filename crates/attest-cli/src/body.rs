//! The command-line SUT adapter.
//!
//! Each sample spawns the configured command with the sample's input tuple
//! appended as arguments. Exit status 0 is a success, any other exit status
//! is an assertion-style failure, and a spawn error is an unexpected one.

use async_trait::async_trait;
use attest_core::engine::body::{SampleContext, SampleFailure, TestBody, UseCaseOutcome};

pub struct CommandBody {
    command: Vec<String>,
}

impl CommandBody {
    pub fn new(command: Vec<String>) -> Self {
        debug_assert!(!command.is_empty());
        Self { command }
    }
}

#[async_trait]
impl TestBody for CommandBody {
    async fn invoke(&self, ctx: &mut SampleContext) -> Result<UseCaseOutcome, SampleFailure> {
        let mut cmd = tokio::process::Command::new(&self.command[0]);
        cmd.args(&self.command[1..]);
        for value in ctx.input() {
            match value {
                serde_json::Value::String(s) => cmd.arg(s),
                other => cmd.arg(other.to_string()),
            };
        }
        cmd.env("ATTEST_SAMPLE_INDEX", ctx.sample_index().to_string());

        let status = cmd.status().await.map_err(|e| {
            SampleFailure::Unexpected(anyhow::anyhow!(
                "failed to spawn '{}': {e}",
                self.command[0]
            ))
        })?;
        if status.success() {
            Ok(UseCaseOutcome::success())
        } else {
            Err(SampleFailure::Assertion(format!(
                "command exited with {status}"
            )))
        }
    }
}
