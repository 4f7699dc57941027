//! Differential comparison of one schema across two implementations.
//!
//! The [`Comparator`] loads a schema against the reference and the candidate,
//! walks the reference domain in enumeration order and records a diagnostic line
//! for every position whose candidate output differs from the reference output.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::{panic_message, CompareError, DeriveError};
use crate::loader::SchemaLoader;
use crate::options::{resolve_default_options, OptionMapping};
use crate::position::{Implementation, Position};
use crate::routine::DerivationRoutine;

/// Mismatches tolerated before a run is cut short.
pub const DEFAULT_ERROR_LIMIT: usize = 20;

/// Line recorded when a run is cut short.
pub const TRUNCATION_LINE: &str = "Interrupted: too many errors";

/// Result of comparing one schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Schema name.
    pub schema: String,
    /// Positions processed.
    pub run_count: usize,
    /// Positions that mismatched or failed on the candidate side.
    pub error_count: usize,
    /// Whether the error limit stopped the run early.
    pub truncated: bool,
    /// Diagnostic lines, ending with the summary line.
    pub lines: Vec<String>,
    /// Wall time of the run.
    pub duration_ms: u64,
}

impl RunSummary {
    /// Whether every processed position matched.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.error_count == 0
    }

    /// The `(passed, diagnosticLines)` pair.
    #[must_use]
    pub fn into_parts(self) -> (bool, Vec<String>) {
        (self.passed(), self.lines)
    }

    /// The trailing summary line.
    #[must_use]
    pub fn summary_line(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }
}

/// `e/n test(s) failed`, with `+` on both counts when truncated, or `All n tests passed`.
#[must_use]
pub fn summary_line(error_count: usize, run_count: usize, truncated: bool) -> String {
    if error_count == 0 {
        return format!("All {run_count} tests passed");
    }
    let plus = if truncated { "+" } else { "" };
    format!("{error_count}{plus}/{run_count}{plus} test(s) failed")
}

fn mismatch_line(description: &str, expected: &str, received: &str) -> String {
    format!("{description}:\n  Expected: {expected}\n  Received: {received}")
}

/// Compares schemas between a trusted reference and a candidate implementation.
#[derive(Clone)]
pub struct Comparator {
    reference: Arc<dyn Implementation>,
    candidate: Arc<dyn Implementation>,
    loader: Arc<dyn SchemaLoader>,
    error_limit: usize,
}

impl fmt::Debug for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Comparator")
            .field("reference", &self.reference.name())
            .field("candidate", &self.candidate.name())
            .field("error_limit", &self.error_limit)
            .finish_non_exhaustive()
    }
}

impl Comparator {
    /// Comparator with the default error limit.
    pub fn new(
        reference: Arc<dyn Implementation>,
        candidate: Arc<dyn Implementation>,
        loader: Arc<dyn SchemaLoader>,
    ) -> Self {
        Self {
            reference,
            candidate,
            loader,
            error_limit: DEFAULT_ERROR_LIMIT,
        }
    }

    /// Set the error limit.
    #[must_use]
    pub fn with_error_limit(mut self, error_limit: usize) -> Self {
        self.error_limit = error_limit;
        self
    }

    /// Current error limit.
    #[must_use]
    pub fn error_limit(&self) -> usize {
        self.error_limit
    }

    /// The trusted implementation.
    #[must_use]
    pub fn reference(&self) -> &Arc<dyn Implementation> {
        &self.reference
    }

    /// The implementation under validation.
    #[must_use]
    pub fn candidate(&self) -> &Arc<dyn Implementation> {
        &self.candidate
    }

    /// Compare `schema` across both implementations.
    ///
    /// Candidate-side failures, including panics, become diagnostic lines. Load
    /// failures and reference-side failures abort the run.
    pub fn compare(&self, schema: &str) -> Result<RunSummary, CompareError> {
        let started = Instant::now();
        let reference_routine = self.loader.load(schema, Arc::clone(&self.reference))?;
        let options = resolve_default_options(reference_routine.as_ref());
        let candidate_routine = self.loader.load(schema, Arc::clone(&self.candidate))?;

        tracing::info!(
            schema,
            reference = %self.reference.name(),
            candidate = %self.candidate.name(),
            options = options.len(),
            error_limit = self.error_limit,
            "comparison started"
        );

        let positions = self
            .reference
            .positions()
            .map_err(CompareError::Enumeration)?;

        let mut run_count = 0usize;
        let mut error_count = 0usize;
        let mut truncated = false;
        let mut lines = Vec::new();

        for position in positions {
            run_count += 1;
            let description = position.description();
            let expected = reference_routine
                .derive(position.as_ref(), position.representative(), &options)
                .map_err(|source| CompareError::Reference {
                    description: description.clone(),
                    source,
                })?;

            match self.derive_candidate(candidate_routine.as_ref(), position.as_ref(), &options) {
                Ok(received) if received == expected => {}
                Ok(received) => {
                    error_count += 1;
                    tracing::debug!(schema, code = %position.code(), "output mismatch");
                    lines.push(mismatch_line(&description, &expected, &received));
                }
                Err(failure) => {
                    error_count += 1;
                    tracing::debug!(schema, code = %position.code(), %failure, "candidate failed");
                    lines.push(format!("{description}: {failure}"));
                }
            }

            if error_count >= self.error_limit {
                lines.push(TRUNCATION_LINE.to_string());
                truncated = true;
                break;
            }
        }

        lines.push(summary_line(error_count, run_count, truncated));
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        tracing::info!(
            schema,
            run_count,
            error_count,
            truncated,
            duration_ms,
            "comparison finished"
        );

        Ok(RunSummary {
            schema: schema.to_string(),
            run_count,
            error_count,
            truncated,
            lines,
            duration_ms,
        })
    }

    fn derive_candidate(
        &self,
        routine: &dyn DerivationRoutine,
        reference_position: &dyn Position,
        options: &OptionMapping,
    ) -> Result<String, CandidateFailure> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let position = self
                .candidate
                .position_from_code(reference_position.code())?;
            routine.derive(position.as_ref(), position.representative(), options)
        }));
        match outcome {
            Ok(result) => result.map_err(CandidateFailure::Error),
            Err(payload) => Err(CandidateFailure::Panic(panic_message(payload.as_ref()))),
        }
    }
}

/// Why the candidate side produced no output.
#[derive(Debug)]
enum CandidateFailure {
    Error(DeriveError),
    Panic(String),
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(error) => write!(f, "{error}"),
            Self::Panic(message) => write!(f, "panicked: {message}"),
        }
    }
}
