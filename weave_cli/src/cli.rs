//! Argument parsing (spec.md §6's "argument/config parser", explicitly
//! out of scope for `weave_core`): turns a command line — plus an optional
//! layered `--config` file — into a `weave_core::Config` and runs the
//! weaver, the way `bsharp_cli::cli::run` turns `Commands::Analyze` into an
//! `AnalyzeArgs` and calls `commands::analyze::execute`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::config_file::FileConfig;

/// Static bytecode-rewriting tool that instruments a compiled module so
/// every method invocation increments a per-method counter at runtime.
#[derive(Parser, Debug)]
#[command(name = "weave")]
#[command(about = "Instrument a module with per-method invocation counters", version, author)]
pub struct Cli {
    /// Target module path to instrument.
    #[arg(required = true)]
    pub input: PathBuf,

    /// Overrides the counter-field prefix (default `_invokeCount_`).
    #[arg(long, value_name = "STR")]
    pub prefix: Option<String>,

    /// Namespaces to include (comma-separated, repeatable).
    #[arg(long, value_name = "NS1,NS2,...", value_delimiter = ',')]
    pub include: Vec<String>,

    /// Namespaces to exclude (comma-separated, repeatable); takes
    /// precedence over `--include`.
    #[arg(long, value_name = "NS1,NS2,...", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Write the instrumented module to a distinct path rather than
    /// overwriting the input.
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Disable backup creation.
    #[arg(long)]
    pub no_backup: bool,

    /// Directory for backup files and `.bak.path` sidecars.
    #[arg(long, value_name = "DIR")]
    pub backup_dir: Option<PathBuf>,

    /// Include compiler-generated types/methods.
    #[arg(long)]
    pub instrument_compiler_generated: bool,

    /// Directory to search when resolving references to dependent modules
    /// (repeatable).
    #[arg(long = "search-dir", value_name = "DIR")]
    pub search_dirs: Vec<PathBuf>,

    /// Layered config file (TOML or JSON); CLI flags override its values.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Report eligible work without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the machine-readable run summary as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Verbosity level implied by repeated `-v` flags, consulted by `main`
/// before the logger is initialized (env_logger's filter is fixed at
/// `init()`, so this has to happen ahead of argument-independent setup).
pub fn verbosity_level(args: &[String]) -> u8 {
    args.iter()
        .map(|a| match a.as_str() {
            "--verbose" => 1,
            flag if flag.starts_with('-') && !flag.starts_with("--") => {
                flag.chars().filter(|&c| c == 'v').count() as u8
            }
            _ => 0,
        })
        .sum()
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let file_config = match &cli.config {
        Some(path) => Some(FileConfig::load(path).with_context(|| {
            format!("failed to read config file: {}", path.display())
        })?),
        None => None,
    };

    let print_json = cli.json;
    let config = build_config(cli, file_config);

    let summary = weave_core::weave(&config)?;

    if config.dry_run {
        log::info!("dry run complete, nothing written");
    } else if summary.skipped_already_instrumented {
        log::info!("{} is already instrumented, nothing to do", config.input.display());
    } else {
        log::info!(
            "instrumented {} method bodies and {} call sites across {} types",
            summary.methods_body_instrumented,
            summary.call_sites_instrumented,
            summary.types_scanned
        );
    }

    if print_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}

/// Layers CLI flags over an optional file config: file values are the base,
/// CLI-provided values (anything the user actually typed) override them.
/// Matches `bsharp_cli::commands::analyze::execute`'s "prefer file config,
/// override with CLI flags if provided" layering.
fn build_config(cli: Cli, file: Option<FileConfig>) -> weave_core::Config {
    let mut config = weave_core::Config::new(cli.input.clone());

    if let Some(file) = file {
        file.apply_to(&mut config);
    }

    if let Some(prefix) = cli.prefix {
        config.field_prefix = prefix;
    }
    if !cli.include.is_empty() {
        config.include_namespaces.extend(cli.include);
    }
    if !cli.exclude.is_empty() {
        config.exclude_namespaces.extend(cli.exclude);
    }
    if cli.output.is_some() {
        config.output = cli.output;
    }
    if cli.no_backup {
        config.no_backup = true;
    }
    if cli.backup_dir.is_some() {
        config.backup_dir = cli.backup_dir;
    }
    if cli.instrument_compiler_generated {
        config.instrument_compiler_generated = true;
    }
    if !cli.search_dirs.is_empty() {
        config.search_dirs.extend(cli.search_dirs);
    }
    if cli.dry_run {
        config.dry_run = true;
    }

    config
}
