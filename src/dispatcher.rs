//! Running a comparison for every enabled schema.
//!
//! Sequential mode compares schemas one after another and prints each schema's
//! lines as soon as it finishes. Parallel mode launches one worker thread per
//! schema, gathers every result over a channel and then prints the sections in
//! registry order.

use std::fmt;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::comparator::{Comparator, RunSummary};
use crate::error::panic_message;
use crate::registry::SchemaRegistry;
use crate::report::{self, SchemaOutcome, SchemaResult, Verdict};

/// Execution model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// One schema at a time on the calling thread.
    #[default]
    Sequential,
    /// One worker thread per schema.
    Parallel,
}

impl DispatchMode {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(Self::Sequential),
            "parallel" | "par" => Ok(Self::Parallel),
            other => Err(format!(
                "unknown dispatch mode {other:?}; expected sequential or parallel"
            )),
        }
    }
}

/// Message a worker sends when its schema settles.
#[derive(Debug)]
struct WorkerReport {
    index: usize,
    outcome: Result<RunSummary, String>,
}

impl WorkerReport {
    fn into_outcome(self) -> SchemaOutcome {
        match self.outcome {
            Ok(summary) => SchemaOutcome::Completed(summary),
            Err(reason) => SchemaOutcome::Faulted { reason },
        }
    }
}

struct Worker {
    index: usize,
    handle: thread::JoinHandle<()>,
}

/// Runs the comparator over a registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    comparator: Comparator,
    mode: DispatchMode,
    schema_timeout: Option<Duration>,
    color: bool,
}

impl Dispatcher {
    /// Sequential dispatcher without a timeout.
    #[must_use]
    pub fn new(comparator: Comparator) -> Self {
        Self {
            comparator,
            mode: DispatchMode::Sequential,
            schema_timeout: None,
            color: false,
        }
    }

    /// Set the execution model.
    #[must_use]
    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Bound how long a parallel worker may run. Sequential runs ignore it.
    #[must_use]
    pub fn with_schema_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.schema_timeout = timeout;
        self
    }

    /// Color the `[PASS]`/`[FAIL]` headers.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Current execution model.
    #[must_use]
    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Compare every enabled schema, writing the report to `out`.
    ///
    /// The returned verdict lists schemas in registry order whatever the mode.
    pub fn run_all(&self, registry: &SchemaRegistry, out: &mut dyn Write) -> io::Result<Verdict> {
        let schemas: Vec<String> = registry.enabled().map(str::to_string).collect();
        tracing::info!(
            mode = %self.mode,
            schemas = schemas.len(),
            skipped = registry.len() - schemas.len(),
            "dispatch started"
        );

        let results = match self.mode {
            DispatchMode::Sequential => self.run_sequential(&schemas, out)?,
            DispatchMode::Parallel => {
                let results = self.run_parallel(&schemas);
                for result in &results {
                    report::write_section(out, result, self.color)?;
                }
                results
            }
        };

        let verdict = Verdict::from_results(results);
        writeln!(out, "{}", verdict.aggregate_line())?;
        out.flush()?;
        tracing::info!(
            passed = verdict.passed,
            failed = verdict.failed,
            "dispatch finished"
        );
        Ok(verdict)
    }

    fn run_sequential(
        &self,
        schemas: &[String],
        out: &mut dyn Write,
    ) -> io::Result<Vec<SchemaResult>> {
        let mut results = Vec::with_capacity(schemas.len());
        for schema in schemas {
            writeln!(out, "{}", report::progress_line(schema))?;
            out.flush()?;

            let outcome = self.compare_guarded(schema);
            report::write_outcome(out, &outcome)?;
            results.push(SchemaResult {
                schema: schema.clone(),
                outcome,
            });
        }
        Ok(results)
    }

    fn compare_guarded(&self, schema: &str) -> SchemaOutcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.comparator.compare(schema))) {
            Ok(Ok(summary)) => SchemaOutcome::Completed(summary),
            Ok(Err(error)) => {
                tracing::warn!(schema, %error, "schema faulted");
                SchemaOutcome::Faulted {
                    reason: error.to_string(),
                }
            }
            Err(payload) => {
                let reason = format!("panicked: {}", panic_message(payload.as_ref()));
                tracing::warn!(schema, %reason, "schema faulted");
                SchemaOutcome::Faulted { reason }
            }
        }
    }

    fn run_parallel(&self, schemas: &[String]) -> Vec<SchemaResult> {
        let launched = Instant::now();
        let deadline = self.schema_timeout.map(|timeout| launched + timeout);
        let (tx, rx) = mpsc::channel::<WorkerReport>();
        let mut slots: Vec<Option<SchemaOutcome>> = vec![None; schemas.len()];
        let mut workers = Vec::with_capacity(schemas.len());

        for (index, schema) in schemas.iter().enumerate() {
            let comparator = self.comparator.clone();
            let name = schema.clone();
            let tx = tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("derive-parity:{schema}"))
                .spawn(move || {
                    let outcome = comparator.compare(&name).map_err(|error| error.to_string());
                    // The coordinator may have stopped listening after a timeout.
                    let _ = tx.send(WorkerReport { index, outcome });
                });
            match spawned {
                Ok(handle) => {
                    tracing::debug!(schema = %schema, index, "worker launched");
                    workers.push(Worker { index, handle });
                }
                Err(error) => {
                    tracing::error!(schema = %schema, %error, "worker launch failed");
                    slots[index] = Some(SchemaOutcome::Faulted {
                        reason: format!("failed to launch worker: {error}"),
                    });
                }
            }
        }
        drop(tx);

        let mut pending = workers.len();
        while pending > 0 {
            let received = match deadline {
                Some(deadline) => {
                    rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                }
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(report) => {
                    tracing::debug!(index = report.index, "worker reported");
                    let index = report.index;
                    slots[index] = Some(report.into_outcome());
                    pending -= 1;
                }
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(pending, "schema deadline expired");
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        drain_reports(&rx, &mut slots);

        for worker in workers {
            let schema = &schemas[worker.index];
            settle_worker(worker, schema, &rx, &mut slots, self.schema_timeout);
        }

        tracing::debug!(elapsed = ?launched.elapsed(), "parallel run settled");
        schemas
            .iter()
            .zip(slots)
            .map(|(schema, slot)| SchemaResult {
                schema: schema.clone(),
                outcome: slot.unwrap_or_else(|| SchemaOutcome::Faulted {
                    reason: "worker never settled".to_string(),
                }),
            })
            .collect()
    }
}

/// Store every report already on the channel. A slot that is already settled keeps
/// its outcome.
fn drain_reports(rx: &mpsc::Receiver<WorkerReport>, slots: &mut [Option<SchemaOutcome>]) {
    while let Ok(report) = rx.try_recv() {
        let slot = &mut slots[report.index];
        if slot.is_none() {
            *slot = Some(report.into_outcome());
        }
    }
}

/// Settle one worker after the coordinator stopped waiting.
///
/// A worker that has not reported and is still running is detached as timed out.
/// Otherwise it is joined, and the channel is drained again before the worker is
/// declared silent, since its report may have landed after the last drain.
fn settle_worker(
    worker: Worker,
    schema: &str,
    rx: &mpsc::Receiver<WorkerReport>,
    slots: &mut [Option<SchemaOutcome>],
    schema_timeout: Option<Duration>,
) {
    let index = worker.index;
    if slots[index].is_none() && !worker.handle.is_finished() {
        let after = schema_timeout.unwrap_or_default();
        tracing::warn!(schema, ?after, "worker timed out, detaching");
        slots[index] = Some(SchemaOutcome::TimedOut { after });
        return;
    }
    match worker.handle.join() {
        Ok(()) => {
            drain_reports(rx, slots);
            if slots[index].is_none() {
                slots[index] = Some(SchemaOutcome::Faulted {
                    reason: "worker exited without reporting".to_string(),
                });
            }
        }
        Err(payload) => {
            let reason = format!("worker panicked: {}", panic_message(payload.as_ref()));
            tracing::warn!(schema, %reason, "worker faulted");
            slots[index] = Some(SchemaOutcome::Faulted { reason });
        }
    }
}
