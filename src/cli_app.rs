//! Top-level CLI definition and dispatch.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use scene_vaccine_sweeper::cleaner::batch::{BatchCleaner, BatchReport};
use scene_vaccine_sweeper::core::config::Config;
use scene_vaccine_sweeper::core::errors::SvsError;
use scene_vaccine_sweeper::logger::sink::{FanoutSink, JsonlSink, StderrSink};
use scene_vaccine_sweeper::scanner::walker::{DirectoryWalker, WalkerConfig, is_scene_file};

/// Scene Vaccine Sweeper: strips "vaccine" script blocks from Maya ASCII scenes.
#[derive(Debug, Parser)]
#[command(
    name = "svs",
    author,
    version,
    about = "Scene Vaccine Sweeper - removes vaccine blocks from .ma scene files",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Scene files or directories (directories are searched recursively).
    #[arg(value_name = "PATH", required_unless_present = "completions")]
    paths: Vec<PathBuf>,
    /// Replace original files in place instead of writing `<file>.clean`.
    #[arg(short, long)]
    replace: bool,
    /// Keep the original as `<file>.bkp` when replacing.
    #[arg(short, long)]
    backup: bool,
    /// Directory for sanitized temp files (defaults to the system temp dir).
    #[arg(long, value_name = "DIR")]
    temp_dir: Option<PathBuf>,
    /// Override config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Also append activity events to this JSONL file.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long)]
    json: bool,
    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
    /// Print shell completions and exit.
    #[arg(long, value_name = "SHELL", exclusive = true)]
    completions: Option<CompletionShell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

impl From<SvsError> for CliError {
    fn from(err: SvsError) -> Self {
        Self::User(err.to_string())
    }
}

/// A command-line path that was not processed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Skipped {
    path: PathBuf,
    reason: String,
}

/// Run the sweep described by the command line.
///
/// Per-file failures are reported but never turned into an error; only bad
/// configuration or an unwritable stdout is.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        let binary_name = command.get_name().to_string();
        generate(shell, &mut command, binary_name, &mut io::stdout());
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    apply_cli_overrides(cli, &mut config);
    config.validate()?;

    let walker = DirectoryWalker::new(WalkerConfig::from_settings(&config.walker)?);
    let sink = build_sink(cli, &config);
    let cleaner = BatchCleaner::new(&config, &sink);

    let mut report = BatchReport::default();
    let mut skipped = Vec::new();
    for arg in &cli.paths {
        let path = match fs::canonicalize(arg) {
            Ok(path) => path,
            Err(err) => {
                skipped.push(Skipped {
                    path: arg.clone(),
                    reason: err.to_string(),
                });
                continue;
            }
        };

        if path.is_dir() {
            match cleaner.sweep(&walker, &path) {
                Ok(batch) => report.absorb(batch),
                Err(err) => skipped.push(Skipped {
                    path,
                    reason: err.to_string(),
                }),
            }
        } else if path.is_file() && is_scene_file(&path) {
            report.absorb(cleaner.clean_paths(&path, [path.clone()]));
        } else {
            skipped.push(Skipped {
                path,
                reason: "not a directory or .ma file".to_string(),
            });
        }
    }

    match output_mode(cli) {
        OutputMode::Human => emit_human(cli, &report, &skipped),
        OutputMode::Json => write_json_line(&report_payload(&report, &skipped)),
    }
}

/// Command-line flags win over file and environment settings.
fn apply_cli_overrides(cli: &Cli, config: &mut Config) {
    if cli.replace {
        config.replace.in_place = true;
    }
    if cli.backup {
        config.replace.backup = true;
    }
    if let Some(dir) = &cli.temp_dir {
        config.cleaner.temp_dir = Some(dir.clone());
    }
    if let Some(path) = &cli.log_file {
        config.logging.jsonl_path = Some(path.clone());
    }
    if cli.verbose {
        config.logging.verbose = true;
    }
}

fn build_sink(cli: &Cli, config: &Config) -> FanoutSink {
    let verbose = config.logging.verbose && !cli.quiet;
    let mut sink = FanoutSink::new().with(StderrSink::from_verbosity(verbose, cli.quiet));
    if let Some(path) = &config.logging.jsonl_path {
        sink = sink.with(JsonlSink::open(path));
    }
    sink
}

fn emit_human(cli: &Cli, report: &BatchReport, skipped: &[Skipped]) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    for path in &report.cleaned {
        writeln!(stdout, "{}", path.display())?;
    }
    stdout.flush()?;

    if cli.quiet {
        return Ok(());
    }
    let mut stderr = io::stderr().lock();
    for skip in skipped {
        let _ = writeln!(
            stderr,
            "{} skipped {}: {}",
            "warning:".yellow().bold(),
            skip.path.display(),
            skip.reason
        );
    }
    let failed = report.failed_count();
    let summary = format!(
        "{} scanned, {} cleaned, {} failed",
        report.files_seen,
        report.cleaned_count(),
        failed
    );
    let summary = if failed > 0 {
        summary.red().to_string()
    } else if report.cleaned_count() > 0 {
        summary.green().to_string()
    } else {
        summary
    };
    let _ = writeln!(stderr, "svs: {summary}");
    Ok(())
}

fn report_payload(report: &BatchReport, skipped: &[Skipped]) -> Value {
    json!({
        "command": "clean",
        "files_seen": report.files_seen,
        "untouched": report.untouched,
        "cleaned": report
            .cleaned
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>(),
        "failed": report
            .failures
            .iter()
            .map(|f| json!({
                "path": f.path.display().to_string(),
                "error_code": f.error_code,
                "error": f.error,
                "retryable": f.retryable,
            }))
            .collect::<Vec<_>>(),
        "skipped": skipped
            .iter()
            .map(|s| json!({
                "path": s.path.display().to_string(),
                "reason": s.reason,
            }))
            .collect::<Vec<_>>(),
        "elapsed_seconds": report.duration.as_secs_f64(),
    })
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("SVS_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref())
}

/// `auto` stays human so piped output is still one path per line.
fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        _ => OutputMode::Human,
    }
}
