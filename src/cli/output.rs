//! Output formatting for the comparison report.
//!
//! Human output is the line report written while schemas run. JSON output is the
//! final verdict serialized once the run settles.

use serde::Serialize;
use std::io::{self, IsTerminal, Write};

use crate::report::{self, Verdict};

/// Output format selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Line-oriented report.
    #[default]
    Human,

    /// Compact JSON verdict.
    Json,

    /// Pretty-printed JSON verdict.
    JsonPretty,
}

impl OutputFormat {
    /// Detect the format from `DERIVE_PARITY_OUTPUT_FORMAT`, defaulting to human.
    #[must_use]
    pub fn auto_detect() -> Self {
        std::env::var("DERIVE_PARITY_OUTPUT_FORMAT")
            .ok()
            .and_then(|format| super::args::parse_output_format(&format).ok())
            .unwrap_or_default()
    }

    /// Check if this format produces JSON output.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::JsonPretty)
    }
}

/// Color choice for output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorChoice {
    /// Automatically detect based on terminal.
    #[default]
    Auto,

    /// Always use colors.
    Always,

    /// Never use colors.
    Never,
}

impl ColorChoice {
    /// Detect appropriate color setting based on environment.
    ///
    /// Respects:
    /// - `NO_COLOR` environment variable (<https://no-color.org/>)
    /// - `CLICOLOR_FORCE` environment variable
    /// - Terminal detection
    #[must_use]
    pub fn auto_detect() -> Self {
        if std::env::var("NO_COLOR").is_ok() {
            return Self::Never;
        }

        if std::env::var("CLICOLOR_FORCE").is_ok() {
            return Self::Always;
        }

        if io::stdout().is_terminal() {
            Self::Auto
        } else {
            Self::Never
        }
    }

    /// Check if colors should be used.
    #[must_use]
    pub fn should_colorize(&self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => io::stdout().is_terminal(),
        }
    }
}

/// Types that can be written in every [`OutputFormat`].
pub trait Outputtable: Serialize {
    /// Human-readable representation.
    fn human_format(&self) -> String;
}

impl Outputtable for Verdict {
    fn human_format(&self) -> String {
        report::render_console_summary(self)
    }
}

/// Output writer that handles format switching.
pub struct Output {
    format: OutputFormat,
    writer: Box<dyn Write>,
}

impl Output {
    /// Output writer to stdout.
    #[must_use]
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            writer: Box::new(io::stdout()),
        }
    }

    /// Output writer to a custom sink.
    #[must_use]
    pub fn with_writer<W: Write + 'static>(format: OutputFormat, writer: W) -> Self {
        Self {
            format,
            writer: Box::new(writer),
        }
    }

    /// Get the output format.
    #[must_use]
    pub const fn format(&self) -> OutputFormat {
        self.format
    }

    /// Write a single value.
    pub fn write<T: Outputtable>(&mut self, value: &T) -> io::Result<()> {
        match self.format {
            OutputFormat::Human => {
                write!(self.writer, "{}", value.human_format())?;
            }
            OutputFormat::Json => {
                let json = serde_json::to_string(value)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                writeln!(self.writer, "{json}")?;
            }
            OutputFormat::JsonPretty => {
                let json = serde_json::to_string_pretty(value)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                writeln!(self.writer, "{json}")?;
            }
        }
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn init_test(name: &str) {
        crate::test_utils::init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn output_format_default_is_human() {
        init_test("output_format_default_is_human");
        let is_human = matches!(OutputFormat::default(), OutputFormat::Human);
        crate::assert_with_log!(is_human, "default is human", true, is_human);
        let json = OutputFormat::JsonPretty.is_json();
        crate::assert_with_log!(json, "json pretty", true, json);
        crate::test_complete!("output_format_default_is_human");
    }

    #[test]
    fn color_choice_explicit_values() {
        init_test("color_choice_explicit_values");
        let never = ColorChoice::Never.should_colorize();
        crate::assert_with_log!(!never, "never colorize", false, never);
        let always = ColorChoice::Always.should_colorize();
        crate::assert_with_log!(always, "always colorize", true, always);
        crate::test_complete!("color_choice_explicit_values");
    }

    #[test]
    fn verdict_writes_as_json() {
        init_test("verdict_writes_as_json");
        let buf = SharedBuf::default();
        let mut output = Output::with_writer(OutputFormat::Json, buf.clone());
        output.write(&Verdict::default()).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(buf.text().trim()).unwrap();
        crate::assert_with_log!(parsed["passed"] == 0, "passed", 0, parsed["passed"].clone());
        crate::assert_with_log!(
            parsed["results"].as_array().is_some_and(Vec::is_empty),
            "results",
            "[]",
            parsed["results"].clone()
        );
        crate::test_complete!("verdict_writes_as_json");
    }

    #[test]
    fn verdict_writes_human_summary() {
        let buf = SharedBuf::default();
        let mut output = Output::with_writer(OutputFormat::Human, buf.clone());
        output.write(&Verdict::default()).unwrap();
        assert_eq!(buf.text(), "0/0 schemas passed\n");
    }
}
