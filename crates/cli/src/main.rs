// ftymerge CLI - deduplicate and reconcile extracted factory records

mod exit_codes;
mod logging;
mod merge;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};
use logging::LogFormat;

#[derive(Parser)]
#[command(name = "ftymerge")]
#[command(about = "Deduplicate and reconcile extracted factory records")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log format on stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    /// Suppress the summary and info-level logs
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge duplicate factory records into one record per factory
    #[command(after_help = "\
Examples:
  ftymerge merge all_factories.json merged.json
  ftymerge merge all.json merged.json --config zh.merge.toml --report report.json
  ftymerge merge all.json merged.json --workers 4 --json | jq .summary")]
    Merge {
        /// Combined JSON array of extracted records
        input: PathBuf,

        /// Where to write the merged array
        output: PathBuf,

        /// Merge config (TOML). Defaults apply when omitted
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Write the run report (summary, per-group decisions, skips) here
        #[arg(long)]
        report: Option<PathBuf>,

        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Worker threads for group merges (0 = sequential). Overrides the config
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Concatenate per-document JSON outputs into one record array
    #[command(after_help = "\
Examples:
  ftymerge combine extracted/ all_factories.json")]
    Combine {
        /// Directory searched recursively for *.json files
        dir: PathBuf,

        /// Where to write the combined array
        output: PathBuf,
    },

    /// Check a merge config without running a merge
    Validate {
        /// Merge config (TOML)
        config: PathBuf,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  ftymerge-dedup ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  ftymerge-dedup ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_format, cli.quiet);

    let result = match cli.command {
        Commands::Merge {
            input,
            output,
            config,
            report,
            json,
            workers,
        } => merge::cmd_merge(input, output, config, report, json, workers, cli.quiet),
        Commands::Combine { dir, output } => merge::cmd_combine(dir, output, cli.quiet),
        Commands::Validate { config } => merge::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("error: {}", e.message);
            if let Some(hint) = &e.hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(e.code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
