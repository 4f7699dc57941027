//! Exit codes for the derive-parity binary.
//!
//! A comparison run only ever distinguishes "everything matched" from "something
//! did not"; anything that stops the run before the first schema is a startup error.

/// Process exit codes.
pub struct ExitCode;

impl ExitCode {
    /// Every enabled schema passed.
    pub const SUCCESS: i32 = 0;

    /// At least one schema mismatched, faulted or timed out.
    pub const COMPARISON_FAILURE: i32 = 1;

    /// Bad arguments, configuration, registry or datasets; nothing was compared.
    pub const STARTUP_ERROR: i32 = 2;

    /// Human-readable description of an exit code.
    #[must_use]
    pub const fn description(code: i32) -> &'static str {
        match code {
            0 => "all schemas passed",
            1 => "comparison failure",
            2 => "startup error",
            _ => "unknown",
        }
    }

    /// Whether `code` is [`SUCCESS`](Self::SUCCESS).
    #[must_use]
    pub const fn is_success(code: i32) -> bool {
        code == Self::SUCCESS
    }

    /// Whether `code` signals any failure.
    #[must_use]
    pub const fn is_failure(code: i32) -> bool {
        code != Self::SUCCESS
    }
}
