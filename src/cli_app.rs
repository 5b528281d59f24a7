//! Top-level CLI definition and dispatch.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::Command as ProcessCommand;
use std::time::SystemTime;

use clap::{Args, Parser, Subcommand};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use tempdir_retention::core::config::Config;
use tempdir_retention::core::errors::TdrError;
use tempdir_retention::core::paths::working_root;
use tempdir_retention::platform::pal::{StdTempFs, TempFs};
use tempdir_retention::retention::manager::{ScopeOptions, TempDirManager};
use tempdir_retention::retention::queue::{PurgeReport, list_historic};
use tempdir_retention::retention::registry::RetentionRegistry;

/// tdr: run commands in scoped temp directories that keep the last N runs.
#[derive(Debug, Parser)]
#[command(
    name = "tdr",
    author,
    version,
    about = "Scoped temporary directories with delayed, bounded cleanup",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Report purges and other details on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run a command inside a fresh scoped directory.
    Run(RunArgs),
    /// List directories on disk matching the naming pattern, oldest first.
    List(ListArgs),
    /// Print the effective configuration.
    Config,
}

/// Overrides for the `[retention]` config section.
#[derive(Debug, Clone, Args, Default)]
struct KeyArgs {
    /// Parent directory for scoped directories.
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,
    /// Leading component of directory names.
    #[arg(long)]
    prefix: Option<String>,
    /// Trailing component of directory names.
    #[arg(long)]
    suffix: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    #[command(flatten)]
    key: KeyArgs,
    /// Directories to retain for this key.
    #[arg(long, value_name = "N")]
    keep_max: Option<usize>,
    /// Queue directories without ever deleting them.
    #[arg(long)]
    no_delete_historic: bool,
    /// Do not change into the scoped directory before running.
    #[arg(long)]
    no_cd: bool,
    /// Command and arguments to run.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[derive(Debug, Clone, Args)]
struct ListArgs {
    #[command(flatten)]
    key: KeyArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
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
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

/// Dispatch the parsed command. Returns the process exit code.
pub fn run(cli: &Cli) -> Result<i32, CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    let config =
        Config::load(cli.config.as_deref()).map_err(|e| CliError::User(e.to_string()))?;

    match &cli.command {
        Command::Run(args) => run_scoped(cli, &config, args),
        Command::List(args) => run_list(cli, &config, args).map(|()| 0),
        Command::Config => run_config(cli, &config).map(|()| 0),
    }
}

fn run_scoped(cli: &Cli, config: &Config, args: &RunArgs) -> Result<i32, CliError> {
    let mut options = apply_key_args(ScopeOptions::from_config(config), &args.key);
    if let Some(keep_max) = args.keep_max {
        options = options.keep_max(keep_max);
    }
    if args.no_delete_historic {
        options = options.delete_historic(false);
    }

    let mut effective = config.clone();
    effective.retention.prefix.clone_from(&options.prefix);
    effective.retention.suffix.clone_from(&options.suffix);
    effective.retention.root.clone_from(&options.root);
    effective.retention.keep_max = options.keep_max;
    effective.retention.delete_historic = options.delete_historic;

    let mut manager =
        TempDirManager::from_config(&effective).map_err(|e| CliError::Runtime(e.to_string()))?;
    let dir = manager
        .enter()
        .map_err(|e| CliError::Runtime(e.to_string()))?;
    let dir_path = dir.path().to_path_buf();

    if cli.verbose || output_mode(cli) == OutputMode::Human {
        eprintln!("{} {}", "tdr: scope".dimmed(), dir_path.display());
    }

    let (program, rest) = args
        .command
        .split_first()
        .ok_or_else(|| CliError::User("missing command".to_string()))?;
    let mut child = ProcessCommand::new(program);
    child.args(rest).env("TDR_DIR", &dir_path);
    if !args.no_cd {
        child.current_dir(&dir_path);
    }
    // The scope still exits (via drop) if spawning fails.
    let status = child.status().map_err(|e| {
        let err = TdrError::Runtime {
            details: format!("failed to run {program}: {e}"),
        };
        CliError::Runtime(err.to_string())
    })?;
    let report = dir.exit();

    let code = status.code().unwrap_or(1);
    match output_mode(cli) {
        OutputMode::Human => {
            if cli.verbose {
                print_report_human(&report);
                for key in RetentionRegistry::global().keys() {
                    eprintln!("{} {key}", "tdr: tracking".dimmed());
                }
            }
        }
        OutputMode::Json => {
            let tracked: Vec<String> = RetentionRegistry::global()
                .keys()
                .iter()
                .map(ToString::to_string)
                .collect();
            let payload = json!({
                "command": "run",
                "dir": dir_path.to_string_lossy(),
                "exit_code": code,
                "report": report_json(&report),
                "tracked": tracked,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(code)
}

fn run_list(cli: &Cli, config: &Config, args: &ListArgs) -> Result<(), CliError> {
    let options = apply_key_args(ScopeOptions::from_config(config), &args.key);
    let root = working_root(options.root.as_deref());
    let fs = StdTempFs;
    let dirs = list_historic(&fs, &root, &options.prefix, &options.suffix)
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    match output_mode(cli) {
        OutputMode::Human => {
            if dirs.is_empty() {
                println!(
                    "no directories matching {}*{} under {}",
                    options.prefix,
                    options.suffix,
                    root.display()
                );
            }
            for dir in &dirs {
                let age = fs
                    .created_at(dir)
                    .ok()
                    .and_then(|t| SystemTime::now().duration_since(t).ok())
                    .map_or_else(|| "?".to_string(), |d| format_age(d.as_secs()));
                println!("{:>8}  {}", age.dimmed(), dir.display());
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "list",
                "root": root.to_string_lossy(),
                "prefix": options.prefix,
                "suffix": options.suffix,
                "dirs": dirs.iter().map(|d| d.to_string_lossy()).collect::<Vec<_>>(),
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_config(cli: &Cli, config: &Config) -> Result<(), CliError> {
    let hash = config
        .stable_hash()
        .map_err(|e| CliError::Runtime(e.to_string()))?;
    match output_mode(cli) {
        OutputMode::Human => {
            let toml_str = toml::to_string_pretty(config)
                .map_err(|e| CliError::Runtime(format!("serialize config: {e}")))?;
            println!("# source: {}", config.config_file.display());
            println!("# hash: {hash}");
            println!("{toml_str}");
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "config",
                "source": config.config_file.to_string_lossy(),
                "hash": hash,
                "config": serde_json::to_value(config)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn apply_key_args(mut options: ScopeOptions, key: &KeyArgs) -> ScopeOptions {
    if let Some(root) = &key.root {
        options = options.root(root.clone());
    }
    if let Some(prefix) = &key.prefix {
        options = options.prefix(prefix.clone());
    }
    if let Some(suffix) = &key.suffix {
        options = options.suffix(suffix.clone());
    }
    options
}

fn print_report_human(report: &PurgeReport) {
    for path in &report.purged {
        eprintln!("{} {}", "tdr: purged".dimmed(), path.display());
    }
    for failure in &report.failed {
        eprintln!(
            "{} {}: {}",
            "tdr: purge failed".yellow(),
            failure.path.display(),
            failure.error
        );
    }
    eprintln!("{} {}", "tdr: retained".dimmed(), report.remaining);
}

fn report_json(report: &PurgeReport) -> Value {
    json!({
        "queued": report.queued.to_string_lossy(),
        "purged": report.purged.iter().map(|p| p.to_string_lossy()).collect::<Vec<_>>(),
        "failed": report.failed.iter().map(|f| json!({
            "path": f.path.to_string_lossy(),
            "error_code": f.error.code(),
            "error": f.error.to_string(),
        })).collect::<Vec<_>>(),
        "remaining": report.remaining,
    })
}

fn format_age(secs: u64) -> String {
    match secs {
        0..60 => format!("{secs}s"),
        60..3_600 => format!("{}m", secs / 60),
        3_600..86_400 => format!("{}h", secs / 3_600),
        _ => format!("{}d", secs / 86_400),
    }
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    stdout.write_all(b"\n")?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("TDR_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }
    match env_mode.map(str::trim) {
        Some(mode) if mode.eq_ignore_ascii_case("json") => OutputMode::Json,
        _ => OutputMode::Human,
    }
}
