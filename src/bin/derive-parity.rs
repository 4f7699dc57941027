//! derive-parity: compare a candidate derivation library against a trusted reference.

use derive_parity::cli::{
    errors, parse_color_choice, parse_output_format, CliError, ColorChoice, CommonArgs, Output,
    OutputFormat,
};
use derive_parity::{
    Comparator, DispatchMode, Dispatcher, HarnessConfig, Implementation, SchemaRegistry,
    ScriptLoader, TableImplementation,
};
use clap::{ArgAction, Args, Parser};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "derive-parity",
    version,
    about = "Differential harness for derivation schemas"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgsCli,

    /// Only run these schemas (registry order is kept)
    schemas: Vec<String>,

    /// Reference dataset (trusted implementation)
    #[arg(long = "reference")]
    reference: Option<PathBuf>,

    /// Candidate dataset (implementation under validation)
    #[arg(long = "candidate")]
    candidate: Option<PathBuf>,

    /// Directory holding <schema>.json sources
    #[arg(long = "schema-dir")]
    schema_dir: Option<PathBuf>,

    /// Registry file; the built-in schema list when omitted
    #[arg(long = "registry")]
    registry: Option<PathBuf>,

    /// Mismatches tolerated per schema before the run is cut short
    #[arg(long = "error-limit")]
    error_limit: Option<usize>,

    /// Run one worker thread per schema
    #[arg(long = "parallel", action = ArgAction::SetTrue, conflicts_with = "sequential")]
    parallel: bool,

    /// Run schemas one after another (default)
    #[arg(long = "sequential", action = ArgAction::SetTrue)]
    sequential: bool,

    /// Give up on a parallel worker after this many seconds
    #[arg(long = "timeout-secs")]
    timeout_secs: Option<u64>,

    /// Also write the verdict as JSON to this path
    #[arg(long = "json-report")]
    json_report: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct CommonArgsCli {
    /// Output format: human, json, json-pretty
    #[arg(short = 'f', long = "format", value_parser = parse_output_format)]
    format: Option<OutputFormat>,

    /// Color output: auto, always, never
    #[arg(short = 'c', long = "color", value_parser = parse_color_choice)]
    color: Option<ColorChoice>,

    /// Increase log verbosity on stderr (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbosity: u8,

    /// Print only the final summary
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,

    /// Configuration file path
    #[arg(long = "config")]
    config: Option<PathBuf>,
}

impl CommonArgsCli {
    fn to_common_args(&self) -> CommonArgs {
        CommonArgs {
            format: self.format,
            color: self.color,
            verbosity: self.verbosity,
            quiet: self.quiet,
            config: self.config.clone(),
        }
    }
}

impl Cli {
    fn apply_to(&self, config: &mut HarnessConfig) {
        if let Some(ref v) = self.reference {
            config.reference.clone_from(v);
        }
        if let Some(ref v) = self.candidate {
            config.candidate.clone_from(v);
        }
        if let Some(ref v) = self.schema_dir {
            config.schema_dir.clone_from(v);
        }
        if let Some(ref v) = self.registry {
            config.registry = Some(v.clone());
        }
        if let Some(v) = self.error_limit {
            config.error_limit = v;
        }
        if self.parallel {
            config.mode = DispatchMode::Parallel;
        } else if self.sequential {
            config.mode = DispatchMode::Sequential;
        }
        if let Some(v) = self.timeout_secs {
            config.schema_timeout = Some(Duration::from_secs(v));
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let common = cli.common.to_common_args();
    let format = common.output_format();
    let color = common.color_choice();

    tracing_subscriber::fmt()
        .with_max_level(common.log_level())
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(color.should_colorize())
        .init();

    match run(&cli, &common, format, color) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            let _ = write_cli_error(&err, format, color);
            std::process::exit(err.exit_code);
        }
    }
}

fn run(
    cli: &Cli,
    common: &CommonArgs,
    format: OutputFormat,
    color: ColorChoice,
) -> Result<i32, CliError> {
    let mut config = HarnessConfig::load(common.config.as_deref())?;
    cli.apply_to(&mut config);
    tracing::debug!(?config, "resolved configuration");

    let registry = match config.registry {
        Some(ref path) => SchemaRegistry::load(path)?,
        None => SchemaRegistry::builtin(),
    };
    let registry = registry.retain_named(&cli.schemas)?;

    let reference = TableImplementation::open(&config.reference)
        .map_err(|err| errors::reference_unavailable(&config.reference, &err))?;
    let candidate = TableImplementation::open(&config.candidate)
        .map_err(|err| errors::candidate_missing(&config.candidate, &err))?;
    tracing::info!(
        reference = %format_args!("{} {}", reference.name(), reference.version()),
        candidate = %format_args!("{} {}", candidate.name(), candidate.version()),
        positions = reference.len(),
        "implementations ready"
    );

    let comparator = Comparator::new(
        Arc::new(reference),
        Arc::new(candidate),
        Arc::new(ScriptLoader::new(&config.schema_dir)),
    )
    .with_error_limit(config.error_limit);
    let dispatcher = Dispatcher::new(comparator)
        .with_mode(config.mode)
        .with_schema_timeout(config.schema_timeout)
        .with_color(color.should_colorize());

    let streaming = format == OutputFormat::Human && !common.is_quiet();
    let outcome = if streaming {
        dispatcher.run_all(&registry, &mut io::stdout().lock())
    } else {
        dispatcher.run_all(&registry, &mut io::sink())
    };
    let verdict = outcome.map_err(|err| errors::output_failed(&err))?;

    if !streaming {
        Output::new(format)
            .write(&verdict)
            .map_err(|err| errors::output_failed(&err))?;
    }
    if let Some(ref path) = cli.json_report {
        derive_parity::report::write_json_report(&verdict, path)
            .map_err(|err| errors::output_failed(&err))?;
    }

    Ok(verdict.exit_code())
}

fn write_cli_error(err: &CliError, format: OutputFormat, color: ColorChoice) -> io::Result<()> {
    let mut stderr = io::stderr();
    if format.is_json() {
        writeln!(stderr, "{}", err.json_format())
    } else {
        write!(stderr, "{}", err.human_format(color.should_colorize()))
    }
}
