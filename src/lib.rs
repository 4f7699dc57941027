//! derive-parity: differential testing of a candidate derivation library against a
//! trusted reference.
//!
//! # Overview
//!
//! A *schema* is a named derivation scheme (a romanization or reconstruction
//! convention). For every schema in a registry the harness loads the schema's
//! routine twice, once bound to the reference implementation and once bound to the
//! candidate, derives an output for every position of the reference domain on both
//! sides and reports each position where the outputs differ.
//!
//! # Module Structure
//!
//! - [`position`]: the position and implementation contracts
//! - [`table`]: JSON-backed implementations
//! - [`options`]: typed option declarations and default resolution
//! - [`routine`]: the derivation routine contract
//! - [`script`]: declarative JSON schemas
//! - [`loader`]: resolving schema names to routines
//! - [`comparator`]: comparing one schema
//! - [`registry`]: ordered schema lists
//! - [`dispatcher`]: sequential and parallel runs over a registry
//! - [`report`]: verdicts and report rendering
//! - [`config`]: defaults, TOML file and environment overrides
//! - [`cli`]: exit codes, startup errors and output formats for the binary
//! - [`error`]: error types
//! - [`test_utils`]: fixtures and logging for tests
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use derive_parity::{Comparator, StaticLoader};
//! use derive_parity::test_utils::{FixtureImplementation, FnRoutine};
//!
//! let reference = Arc::new(FixtureImplementation::sample("reference", 8));
//! let candidate = Arc::new(FixtureImplementation::sample("candidate", 8));
//! let loader = Arc::new(StaticLoader::new().with("tones", |_| FnRoutine::attribute("tone")));
//!
//! let summary = Comparator::new(reference, candidate, loader).compare("tones").unwrap();
//! assert!(summary.passed());
//! assert_eq!(summary.lines, vec!["All 8 tests passed".to_string()]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod comparator;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod loader;
pub mod options;
pub mod position;
pub mod registry;
pub mod report;
pub mod routine;
pub mod script;
pub mod table;
pub mod test_utils;

pub use comparator::{Comparator, RunSummary, DEFAULT_ERROR_LIMIT};
pub use config::HarnessConfig;
pub use dispatcher::{DispatchMode, Dispatcher};
pub use error::{
    CompareError, ConfigError, DeriveError, LoadError, OptionError, RegistryError, TableError,
};
pub use loader::{SchemaLoader, ScriptLoader, StaticLoader};
pub use options::{resolve_default_options, OptionDescriptor, OptionMapping, OptionValue};
pub use position::{Implementation, Position};
pub use registry::{RegistryEntry, SchemaRegistry};
pub use report::{SchemaOutcome, SchemaResult, Verdict};
pub use routine::{DerivationRoutine, OptionDeclarations};
pub use script::ScriptRoutine;
pub use table::TableImplementation;
