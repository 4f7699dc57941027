//! Report rendering for comparison runs.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::exit::ExitCode;
use crate::comparator::RunSummary;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// How one schema's run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SchemaOutcome {
    /// The comparison ran to completion or truncation.
    Completed(RunSummary),
    /// Loading, the reference side or the worker itself failed.
    Faulted {
        /// Failure description.
        reason: String,
    },
    /// The worker did not report before its deadline.
    TimedOut {
        /// The deadline that expired.
        after: Duration,
    },
}

impl SchemaOutcome {
    /// Whether the schema passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        matches!(self, Self::Completed(summary) if summary.passed())
    }

    /// Diagnostic lines for this outcome.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::Completed(summary) => summary.lines.clone(),
            Self::Faulted { reason } => vec![format!("Faulted: {reason}")],
            Self::TimedOut { after } => vec![format!("Timed out after {after:?}")],
        }
    }
}

/// Outcome of one registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaResult {
    /// Schema name.
    pub schema: String,
    /// How the run ended.
    pub outcome: SchemaOutcome,
}

impl SchemaResult {
    /// Whether the schema passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome.passed()
    }
}

/// Aggregate result of a dispatch, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Per-schema results.
    pub results: Vec<SchemaResult>,
    /// Schemas that passed.
    pub passed: usize,
    /// Schemas that failed, faulted or timed out.
    pub failed: usize,
}

impl Verdict {
    /// Tally `results`.
    #[must_use]
    pub fn from_results(results: Vec<SchemaResult>) -> Self {
        let passed = results.iter().filter(|result| result.passed()).count();
        let failed = results.len() - passed;
        Self {
            results,
            passed,
            failed,
        }
    }

    /// Whether every schema passed.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Process exit status for this verdict.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.succeeded() {
            ExitCode::SUCCESS
        } else {
            ExitCode::COMPARISON_FAILURE
        }
    }

    /// `<passed>/<total> schemas passed`.
    #[must_use]
    pub fn aggregate_line(&self) -> String {
        format!("{}/{} schemas passed", self.passed, self.results.len())
    }

    /// Per-schema pass flags, in order.
    #[must_use]
    pub fn verdicts(&self) -> Vec<(&str, bool)> {
        self.results
            .iter()
            .map(|result| (result.schema.as_str(), result.passed()))
            .collect()
    }
}

/// Wrap `text` in an ANSI color when `color` is set.
#[must_use]
pub fn paint(text: &str, ansi: &str, color: bool) -> String {
    if color {
        format!("{ansi}{text}{RESET}")
    } else {
        text.to_string()
    }
}

/// `Testing via <schema>`.
#[must_use]
pub fn progress_line(schema: &str) -> String {
    format!("Testing via {schema}")
}

/// `[PASS] <schema>` or `[FAIL] <schema>`.
#[must_use]
pub fn section_header(result: &SchemaResult, color: bool) -> String {
    let tag = if result.passed() {
        paint("[PASS]", GREEN, color)
    } else {
        paint("[FAIL]", RED, color)
    };
    format!("{tag} {}", result.schema)
}

/// Write the lines of one outcome followed by a blank line.
pub fn write_outcome(out: &mut dyn Write, outcome: &SchemaOutcome) -> io::Result<()> {
    for line in outcome.lines() {
        writeln!(out, "{line}")?;
    }
    writeln!(out)
}

/// Write a buffered section: header, lines, blank line.
pub fn write_section(out: &mut dyn Write, result: &SchemaResult, color: bool) -> io::Result<()> {
    writeln!(out, "{}", section_header(result, color))?;
    write_outcome(out, &result.outcome)
}

/// Render a console-friendly summary of a verdict.
#[must_use]
pub fn render_console_summary(verdict: &Verdict) -> String {
    let mut out = String::new();
    for result in &verdict.results {
        let status = if result.passed() { "OK" } else { "FAILED" };
        let detail = match &result.outcome {
            SchemaOutcome::Completed(summary) => format!(
                "{}/{} failed, {}ms",
                summary.error_count, summary.run_count, summary.duration_ms
            ),
            SchemaOutcome::Faulted { .. } => "faulted".to_string(),
            SchemaOutcome::TimedOut { after } => format!("timed out after {after:?}"),
        };
        out.push_str(&format!("- {} [{status}] {detail}\n", result.schema));
    }
    out.push_str(&verdict.aggregate_line());
    out.push('\n');
    out
}

/// Write a JSON report for any serializable summary.
pub fn write_json_report<T: Serialize>(summary: &T, path: &Path) -> io::Result<()> {
    let data = serde_json::to_vec_pretty(summary)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    fs::write(path, data)
}
