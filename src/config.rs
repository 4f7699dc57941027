//! Harness configuration.
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Command line**: flags applied by the binary after loading
//! 2. **Environment variables**: values from `DERIVE_PARITY_*` env vars
//! 3. **Config file**: values loaded from a TOML file (`--config`)
//! 4. **Defaults**: built-in defaults from [`HarnessConfig::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `DERIVE_PARITY_SCHEMA_DIR` | path | `schema_dir` |
//! | `DERIVE_PARITY_REFERENCE` | path | `reference` |
//! | `DERIVE_PARITY_CANDIDATE` | path | `candidate` |
//! | `DERIVE_PARITY_REGISTRY` | path | `registry` |
//! | `DERIVE_PARITY_ERROR_LIMIT` | `usize` | `error_limit` |
//! | `DERIVE_PARITY_MODE` | `sequential`/`parallel` | `mode` |
//! | `DERIVE_PARITY_TIMEOUT_SECS` | `u64` | `schema_timeout` |

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::comparator::DEFAULT_ERROR_LIMIT;
use crate::dispatcher::DispatchMode;
use crate::error::ConfigError;

/// Environment variable name for the schema directory.
pub const ENV_SCHEMA_DIR: &str = "DERIVE_PARITY_SCHEMA_DIR";
/// Environment variable name for the reference dataset.
pub const ENV_REFERENCE: &str = "DERIVE_PARITY_REFERENCE";
/// Environment variable name for the candidate dataset.
pub const ENV_CANDIDATE: &str = "DERIVE_PARITY_CANDIDATE";
/// Environment variable name for the registry file.
pub const ENV_REGISTRY: &str = "DERIVE_PARITY_REGISTRY";
/// Environment variable name for the per-schema error limit.
pub const ENV_ERROR_LIMIT: &str = "DERIVE_PARITY_ERROR_LIMIT";
/// Environment variable name for the dispatch mode.
pub const ENV_MODE: &str = "DERIVE_PARITY_MODE";
/// Environment variable name for the parallel worker timeout.
pub const ENV_TIMEOUT_SECS: &str = "DERIVE_PARITY_TIMEOUT_SECS";

/// Resolved harness settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Directory holding `<schema>.json` sources.
    pub schema_dir: PathBuf,
    /// Reference dataset.
    pub reference: PathBuf,
    /// Candidate dataset.
    pub candidate: PathBuf,
    /// Registry file; the built-in list when unset.
    pub registry: Option<PathBuf>,
    /// Mismatches tolerated per schema.
    pub error_limit: usize,
    /// Execution model.
    pub mode: DispatchMode,
    /// Parallel worker deadline.
    pub schema_timeout: Option<Duration>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            schema_dir: PathBuf::from("schemas"),
            reference: PathBuf::from("data/reference.json"),
            candidate: PathBuf::from("data/candidate.json"),
            registry: None,
            error_limit: DEFAULT_ERROR_LIMIT,
            mode: DispatchMode::Sequential,
            schema_timeout: None,
        }
    }
}

impl HarnessConfig {
    /// Defaults, then `config_file`, then the process environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(config_file, read_env)
    }

    /// Like [`load`](Self::load) with an explicit environment lookup.
    pub fn load_with<F>(config_file: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(path) = config_file {
            let parsed = parse_toml_file(path)?;
            apply_toml_config(&mut config, &parsed, path.parent());
            tracing::debug!(path = %path.display(), "applied config file");
        }
        apply_env_overrides_from(&mut config, lookup)?;
        Ok(config)
    }
}

/// Apply `DERIVE_PARITY_*` overrides read through `lookup`.
///
/// Only variables that are set are applied. A set but unparseable value is an error.
pub fn apply_env_overrides_from<F>(config: &mut HarnessConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup(ENV_SCHEMA_DIR) {
        config.schema_dir = PathBuf::from(val);
    }
    if let Some(val) = lookup(ENV_REFERENCE) {
        config.reference = PathBuf::from(val);
    }
    if let Some(val) = lookup(ENV_CANDIDATE) {
        config.candidate = PathBuf::from(val);
    }
    if let Some(val) = lookup(ENV_REGISTRY) {
        config.registry = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup(ENV_ERROR_LIMIT) {
        config.error_limit = parse_usize(ENV_ERROR_LIMIT, &val)?;
    }
    if let Some(val) = lookup(ENV_MODE) {
        config.mode = val.parse().map_err(|_| ConfigError::Env {
            var: ENV_MODE,
            value: val.clone(),
            expected: "sequential or parallel",
        })?;
    }
    if let Some(val) = lookup(ENV_TIMEOUT_SECS) {
        config.schema_timeout = Some(Duration::from_secs(parse_u64(ENV_TIMEOUT_SECS, &val)?));
    }
    Ok(())
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_usize(var: &'static str, val: &str) -> Result<usize, ConfigError> {
    val.trim().parse::<usize>().map_err(|_| ConfigError::Env {
        var,
        value: val.to_string(),
        expected: "unsigned integer",
    })
}

fn parse_u64(var: &'static str, val: &str) -> Result<u64, ConfigError> {
    val.trim().parse::<u64>().map_err(|_| ConfigError::Env {
        var,
        value: val.to_string(),
        expected: "whole number of seconds",
    })
}

// =========================================================================
// TOML config file
// =========================================================================

/// TOML-deserializable harness configuration.
///
/// ```toml
/// [paths]
/// schema_dir = "schemas"
/// reference = "data/reference.json"
/// candidate = "data/candidate.json"
/// registry = "registry.txt"
///
/// [run]
/// error_limit = 20
/// mode = "parallel"
/// timeout_secs = 60
/// ```
///
/// Relative paths resolve against the directory holding the file.
#[derive(Deserialize, Default, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HarnessTomlConfig {
    /// Input locations.
    #[serde(default)]
    pub paths: PathsToml,
    /// Run settings.
    #[serde(default)]
    pub run: RunToml,
}

/// `[paths]` section.
#[derive(Deserialize, Default, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PathsToml {
    /// Schema source directory.
    pub schema_dir: Option<PathBuf>,
    /// Reference dataset.
    pub reference: Option<PathBuf>,
    /// Candidate dataset.
    pub candidate: Option<PathBuf>,
    /// Registry file.
    pub registry: Option<PathBuf>,
}

/// `[run]` section.
#[derive(Deserialize, Default, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RunToml {
    /// Mismatches tolerated per schema.
    pub error_limit: Option<usize>,
    /// Execution model.
    pub mode: Option<DispatchMode>,
    /// Parallel worker deadline in seconds.
    pub timeout_secs: Option<u64>,
}

/// Apply a parsed TOML config. Only fields present in the file override.
pub fn apply_toml_config(config: &mut HarnessConfig, toml: &HarnessTomlConfig, base: Option<&Path>) {
    let resolve = |path: &PathBuf| match base {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.clone(),
    };
    if let Some(ref v) = toml.paths.schema_dir {
        config.schema_dir = resolve(v);
    }
    if let Some(ref v) = toml.paths.reference {
        config.reference = resolve(v);
    }
    if let Some(ref v) = toml.paths.candidate {
        config.candidate = resolve(v);
    }
    if let Some(ref v) = toml.paths.registry {
        config.registry = Some(resolve(v));
    }
    if let Some(v) = toml.run.error_limit {
        config.error_limit = v;
    }
    if let Some(v) = toml.run.mode {
        config.mode = v;
    }
    if let Some(v) = toml.run.timeout_secs {
        config.schema_timeout = Some(Duration::from_secs(v));
    }
}

/// Parse TOML text read from `origin`.
pub fn parse_toml_str(origin: &Path, toml_str: &str) -> Result<HarnessTomlConfig, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::Parse {
        path: origin.to_path_buf(),
        message: e.to_string(),
    })
}

/// Read and parse a TOML config file.
pub fn parse_toml_file(path: &Path) -> Result<HarnessTomlConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_toml_str(path, &content)
}
