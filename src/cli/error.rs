//! Structured startup errors.
//!
//! Follows RFC 9457 (Problem Details) style with human-friendly formatting.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::exit::ExitCode;
use crate::error::{ConfigError, RegistryError, TableError};

/// Structured error following RFC 9457 (Problem Details) style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliError {
    /// Error type identifier (machine-readable).
    #[serde(rename = "type")]
    pub error_type: String,

    /// Short human-readable title.
    pub title: String,

    /// Detailed explanation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,

    /// Suggested action for recovery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    /// Additional context (varies by error type).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, serde_json::Value>,

    /// Exit code for this error.
    pub exit_code: i32,
}

impl CliError {
    /// Create a new startup error.
    #[must_use]
    pub fn new(error_type: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            title: title.into(),
            detail: String::new(),
            suggestion: None,
            context: BTreeMap::new(),
            exit_code: ExitCode::STARTUP_ERROR,
        }
    }

    /// Add detailed explanation.
    #[must_use]
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Add a suggested recovery action.
    #[must_use]
    pub fn suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add context field.
    #[must_use]
    pub fn context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Set exit code.
    #[must_use]
    pub const fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Format for human output.
    ///
    /// When `color` is true, includes ANSI escape codes for terminal coloring.
    #[must_use]
    pub fn human_format(&self, color: bool) -> String {
        let mut out = String::new();

        if color {
            out.push_str("\x1b[1;31m");
        }
        out.push_str("Error: ");
        out.push_str(&self.title);
        if color {
            out.push_str("\x1b[0m");
        }
        out.push('\n');

        if !self.detail.is_empty() {
            out.push_str(&self.detail);
            out.push('\n');
        }

        if let Some(ref suggestion) = self.suggestion {
            out.push('\n');
            if color {
                out.push_str("\x1b[33m");
            }
            out.push_str("Suggestion: ");
            out.push_str(suggestion);
            if color {
                out.push_str("\x1b[0m");
            }
            out.push('\n');
        }

        if !self.context.is_empty() {
            out.push('\n');
            if color {
                out.push_str("\x1b[2m");
            }
            out.push_str("Context:\n");
            for (k, v) in &self.context {
                out.push_str(&format!("  {k}: {v}\n"));
            }
            if color {
                out.push_str("\x1b[0m");
            }
        }

        out
    }

    /// Format as JSON.
    #[must_use]
    pub fn json_format(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.title.clone())
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_type, self.title)
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(error: ConfigError) -> Self {
        errors::config_error(&error)
    }
}

impl From<RegistryError> for CliError {
    fn from(error: RegistryError) -> Self {
        errors::registry_error(&error)
    }
}

/// Standard error constructors.
pub mod errors {
    use super::*;

    /// Configuration could not be loaded.
    #[must_use]
    pub fn config_error(error: &ConfigError) -> CliError {
        let err = CliError::new("config_error", "Invalid configuration").detail(error.to_string());
        match error {
            ConfigError::Env { var, .. } => err
                .suggestion(format!("Unset {var} or give it a valid value"))
                .context("variable", var),
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => err
                .suggestion("Check the file passed with --config")
                .context("path", path.display().to_string()),
        }
    }

    /// Registry could not be read or the schema filter is invalid.
    #[must_use]
    pub fn registry_error(error: &RegistryError) -> CliError {
        let err = CliError::new("registry_error", "Invalid schema selection").detail(error.to_string());
        match error {
            RegistryError::Read { path, .. } => err.context("path", path.display().to_string()),
            RegistryError::Unknown(name) => err
                .suggestion("Name only schemas listed in the registry")
                .context("schema", name),
            RegistryError::Disabled(name) => err
                .suggestion(format!("Enable it by removing the leading // from {name} in the registry"))
                .context("schema", name),
        }
    }

    /// The reference dataset could not be opened.
    #[must_use]
    pub fn reference_unavailable(path: &Path, error: &TableError) -> CliError {
        CliError::new("reference_unavailable", "Reference implementation unavailable")
            .detail(error.to_string())
            .suggestion("Point --reference (or DERIVE_PARITY_REFERENCE) at the trusted dataset")
            .context("path", path.display().to_string())
    }

    /// The candidate dataset could not be opened.
    #[must_use]
    pub fn candidate_missing(path: &Path, error: &TableError) -> CliError {
        CliError::new("candidate_missing", "Candidate implementation not found")
            .detail(error.to_string())
            .suggestion(
                "Export the candidate build as a dataset and pass it with --candidate \
                 (or set DERIVE_PARITY_CANDIDATE)",
            )
            .context("path", path.display().to_string())
    }

    /// Writing the report failed.
    #[must_use]
    pub fn output_failed(error: &std::io::Error) -> CliError {
        CliError::new("output_failed", "Failed to write report").detail(error.to_string())
    }
}
