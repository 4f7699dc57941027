//! Test utilities for derive-parity.
//!
//! This module provides shared helpers for unit and integration tests:
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - In-memory implementations with controllable divergences
//! - Closure-backed routines
//!
//! # Example
//! ```
//! use derive_parity::test_utils::{init_test_logging, FixtureImplementation, FnRoutine};
//!
//! init_test_logging();
//! let reference = FixtureImplementation::sample("reference", 4);
//! let candidate = FixtureImplementation::sample("candidate", 4).with_attribute("P002", "tone", "X");
//! let routine = FnRoutine::attribute("tone");
//! # let _ = (reference, candidate, routine);
//! ```

use std::collections::BTreeMap;
use std::sync::Once;

use tracing_subscriber::fmt::format::FmtSpan;

use crate::error::{DeriveError, OptionError};
use crate::options::OptionMapping;
use crate::position::{Implementation, Position, PositionIter};
use crate::routine::{DerivationRoutine, OptionDeclarations};

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_names(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}

// ============================================================================
// Fixture implementations
// ============================================================================

const SAMPLE_INITIALS: [&str; 4] = ["端", "透", "定", "泥"];
const SAMPLE_TONES: [&str; 4] = ["平", "上", "去", "入"];

/// Position owned by a [`FixtureImplementation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixturePosition {
    code: String,
    representative: Option<String>,
    description: String,
    attributes: BTreeMap<String, String>,
}

impl Position for FixturePosition {
    fn code(&self) -> &str {
        &self.code
    }

    fn representative(&self) -> Option<&str> {
        self.representative.as_deref()
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// In-memory implementation for tests.
#[derive(Debug, Clone, Default)]
pub struct FixtureImplementation {
    name: String,
    version: String,
    positions: Vec<FixturePosition>,
    enumeration_error: Option<String>,
}

impl FixtureImplementation {
    /// An implementation with no positions.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "0.0.0-test".to_string(),
            ..Self::default()
        }
    }

    /// `count` positions coded `P000`, `P001`, ... with `initial`, `tone` and `index`
    /// attributes.
    pub fn sample(name: impl Into<String>, count: usize) -> Self {
        (0..count).fold(Self::new(name), |fixture, i| {
            let code = format!("P{i:03}");
            let head = format!("h{i}");
            let index = i.to_string();
            let initial = SAMPLE_INITIALS[i % SAMPLE_INITIALS.len()];
            let tone = SAMPLE_TONES[i % SAMPLE_TONES.len()];
            fixture.with_position(
                &code,
                Some(&head),
                &format!("{initial}{tone} #{i}"),
                &[("initial", initial), ("tone", tone), ("index", &index)],
            )
        })
    }

    /// Append a position.
    #[must_use]
    pub fn with_position(
        mut self,
        code: &str,
        representative: Option<&str>,
        description: &str,
        attributes: &[(&str, &str)],
    ) -> Self {
        self.positions.push(FixturePosition {
            code: code.to_string(),
            representative: representative.map(str::to_string),
            description: description.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        });
        self
    }

    /// Override one attribute of the position coded `code`.
    #[must_use]
    pub fn with_attribute(mut self, code: &str, attribute: &str, value: &str) -> Self {
        if let Some(position) = self.positions.iter_mut().find(|p| p.code == code) {
            position
                .attributes
                .insert(attribute.to_string(), value.to_string());
        }
        self
    }

    /// Drop the position coded `code`, so rebuilding it fails.
    #[must_use]
    pub fn without_position(mut self, code: &str) -> Self {
        self.positions.retain(|p| p.code != code);
        self
    }

    /// Make [`Implementation::positions`] fail.
    #[must_use]
    pub fn with_failing_enumeration(mut self, message: impl Into<String>) -> Self {
        self.enumeration_error = Some(message.into());
        self
    }
}

impl Implementation for FixtureImplementation {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn positions(&self) -> Result<PositionIter<'_>, DeriveError> {
        if let Some(message) = &self.enumeration_error {
            return Err(DeriveError::custom(message.clone()));
        }
        Ok(Box::new(
            self.positions
                .iter()
                .map(|p| Box::new(p.clone()) as Box<dyn Position>),
        ))
    }

    fn position_from_code(&self, code: &str) -> Result<Box<dyn Position>, DeriveError> {
        self.positions
            .iter()
            .find(|p| p.code == code)
            .map(|p| Box::new(p.clone()) as Box<dyn Position>)
            .ok_or_else(|| DeriveError::UnknownCode {
                implementation: self.name.clone(),
                code: code.to_string(),
            })
    }
}

// ============================================================================
// Closure-backed routines
// ============================================================================

type DeriveFn =
    Box<dyn Fn(&dyn Position, Option<&str>, &OptionMapping) -> Result<String, DeriveError> + Send + Sync>;
type IntrospectFn = Box<dyn Fn() -> Result<OptionDeclarations, OptionError> + Send + Sync>;

/// Routine built from closures.
pub struct FnRoutine {
    derive: DeriveFn,
    introspect: IntrospectFn,
}

impl std::fmt::Debug for FnRoutine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnRoutine").finish_non_exhaustive()
    }
}

impl FnRoutine {
    /// Routine deriving with `derive` and declaring no options.
    pub fn new<F>(derive: F) -> Self
    where
        F: Fn(&dyn Position, Option<&str>, &OptionMapping) -> Result<String, DeriveError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            derive: Box::new(derive),
            introspect: Box::new(|| Ok(Vec::new())),
        }
    }

    /// Routine that always outputs `text`.
    pub fn constant(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_, _, _| Ok(text.clone()))
    }

    /// Routine that outputs one attribute of the position.
    pub fn attribute(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(move |position, _, _| {
            position
                .attribute(&name)
                .map(str::to_string)
                .ok_or_else(|| DeriveError::MissingAttribute {
                    code: position.code().to_string(),
                    attribute: name.clone(),
                })
        })
    }

    /// Declare `declarations` in introspection mode.
    #[must_use]
    pub fn with_options(mut self, declarations: OptionDeclarations) -> Self {
        self.introspect = Box::new(move || Ok(declarations.clone()));
        self
    }

    /// Replace introspection with `introspect`.
    #[must_use]
    pub fn with_introspection<F>(mut self, introspect: F) -> Self
    where
        F: Fn() -> Result<OptionDeclarations, OptionError> + Send + Sync + 'static,
    {
        self.introspect = Box::new(introspect);
        self
    }
}

impl DerivationRoutine for FnRoutine {
    fn describe_options(&self) -> Result<OptionDeclarations, OptionError> {
        (self.introspect)()
    }

    fn derive(
        &self,
        position: &dyn Position,
        head: Option<&str>,
        options: &OptionMapping,
    ) -> Result<String, DeriveError> {
        (self.derive)(position, head, options)
    }
}
