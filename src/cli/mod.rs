//! Command-line plumbing for the derive-parity binary.
//!
//! - **Exit codes**: 0 all schemas passed, 1 a comparison failed, 2 startup error
//! - **Structured errors**: RFC 9457-style startup errors with suggestions
//! - **Output**: the line report for humans, the verdict as JSON for tooling
//!
//! # Color Support
//!
//! Colors are automatically enabled for terminals and respect:
//! - `NO_COLOR` environment variable (disables colors)
//! - `CLICOLOR_FORCE` environment variable (forces colors)

pub mod args;
pub mod error;
pub mod exit;
pub mod output;

pub use args::{parse_color_choice, parse_output_format, CommonArgs};
pub use error::{errors, CliError};
pub use exit::ExitCode;
pub use output::{ColorChoice, Output, OutputFormat, Outputtable};
