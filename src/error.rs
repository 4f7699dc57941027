//! Error types for the harness.
//!
//! Errors are split by where they surface:
//!
//! - **Per item**: [`DeriveError`] is raised by an implementation or a routine for one
//!   position. On the candidate side it becomes a diagnostic line and a counted mismatch.
//! - **Configuration**: [`OptionError`] is raised while resolving declared options and is
//!   always downgraded to an empty option mapping.
//! - **Per schema**: [`LoadError`] and [`CompareError`] abort one schema's run. The
//!   dispatcher records them as a faulted schema.
//! - **Startup**: [`ConfigError`], [`RegistryError`] and [`TableError`] abort the whole
//!   invocation before any comparison starts.

use std::any::Any;
use std::io;
use std::path::PathBuf;

/// Failure while deriving or reconstructing a single position.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeriveError {
    /// The implementation does not know the serialization code.
    #[error("{implementation} has no position with code {code:?}")]
    UnknownCode {
        /// Implementation that rejected the code.
        implementation: String,
        /// The rejected code.
        code: String,
    },
    /// A schema read an attribute the position does not carry.
    #[error("position {code} has no attribute {attribute:?}")]
    MissingAttribute {
        /// Code of the position being derived.
        code: String,
        /// Attribute name the schema asked for.
        attribute: String,
    },
    /// A rule table has no entry (and no default) for an attribute value.
    #[error("no rule for {attribute} = {value:?}")]
    Unmapped {
        /// Attribute being translated.
        attribute: String,
        /// Value without a rule.
        value: String,
    },
    /// A choice option did not select any rule table.
    #[error("option {option:?} does not select a rule table")]
    Unselected {
        /// Option consulted for the selection.
        option: String,
    },
    /// Free-form failure reported by a routine or an implementation.
    #[error("{0}")]
    Custom(String),
}

impl DeriveError {
    /// Construct a free-form derivation error.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// An option declaration that cannot be resolved to a default.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionError {
    /// The declared value has a shape the resolver does not understand.
    #[error("unrecognized option: {key} {value}")]
    Unrecognized {
        /// Option key.
        key: String,
        /// Rendered declaration.
        value: String,
    },
    /// Introspection output is not a list of `(key, value)` pairs.
    #[error("malformed option declarations: {reason}")]
    Malformed {
        /// What was wrong with the output.
        reason: String,
    },
    /// The routine failed while describing its options.
    #[error("option introspection failed: {0}")]
    Introspection(#[from] DeriveError),
}

/// Failure to turn a schema name into a routine.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// No source is registered under the name.
    #[error("no schema named {name:?}")]
    UnknownSchema {
        /// Requested schema name.
        name: String,
    },
    /// The schema source could not be read.
    #[error("cannot read schema {name:?} from {}: {source}", path.display())]
    Read {
        /// Requested schema name.
        name: String,
        /// Lookup path for the source.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The schema source was read but is not a valid schema.
    #[error("cannot compile schema {name:?}: {reason}")]
    Compile {
        /// Requested schema name.
        name: String,
        /// What is wrong with the source.
        reason: String,
    },
}

/// Failure that aborts one schema's comparison run.
#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    /// One of the routines could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// The reference implementation could not enumerate its positions.
    #[error("reference enumeration failed: {0}")]
    Enumeration(#[source] DeriveError),
    /// The trusted side failed to derive an output.
    #[error("reference derivation failed for {description}: {source}")]
    Reference {
        /// Description of the position being derived.
        description: String,
        /// Failure reported by the reference routine.
        #[source]
        source: DeriveError,
    },
}

/// Invalid harness configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment override could not be parsed.
    #[error("invalid value for {var}: expected {expected}, got {value:?}")]
    Env {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
        /// Human description of the expected type.
        expected: &'static str,
    },
    /// The config file could not be read.
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The config file is not valid TOML for the harness.
    #[error("failed to parse config file {}: {message}", path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
}

/// Invalid schema registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The registry file could not be read.
    #[error("failed to read registry {}: {source}", path.display())]
    Read {
        /// Registry file path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// A requested schema is not in the registry.
    #[error("schema {0:?} is not registered")]
    Unknown(String),
    /// A requested schema is registered but disabled.
    #[error("schema {0:?} is disabled in the registry")]
    Disabled(String),
}

/// Failure to open a table-backed implementation.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// The dataset file could not be read.
    #[error("failed to read dataset {}: {source}", path.display())]
    Read {
        /// Dataset path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The dataset is not valid JSON for a position table.
    #[error("failed to parse dataset {}: {source}", path.display())]
    Parse {
        /// Dataset path.
        path: PathBuf,
        /// Parser failure.
        #[source]
        source: serde_json::Error,
    },
    /// Two positions share a serialization code.
    #[error("dataset {} lists code {code:?} more than once", path.display())]
    DuplicateCode {
        /// Dataset path.
        path: PathBuf,
        /// Repeated code.
        code: String,
    },
}

/// Render a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
