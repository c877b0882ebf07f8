//! Coarse, CI-stable exit codes.

pub use attest_core::report::summary::{EXIT_CONFIG_ERROR, EXIT_SUCCESS, EXIT_VERDICT_FAIL};
