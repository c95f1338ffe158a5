//! `ftymerge merge|combine|validate` command implementations.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use ftymerge_dedup::{combine_dir, run_files, CancelToken, MergeConfig, MergeError, MergeResult};

use crate::exit_codes::{merge_exit_code, merge_hint, EXIT_MERGE_OUTPUT};
use crate::CliError;

fn merge_err(err: MergeError) -> CliError {
    let hint = merge_hint(&err).map(String::from);
    CliError {
        code: merge_exit_code(&err),
        message: err.to_string(),
        hint,
    }
}

pub fn load_config(path: Option<&Path>) -> Result<MergeConfig, CliError> {
    let Some(path) = path else {
        return Ok(MergeConfig::default());
    };
    let text = fs::read_to_string(path).map_err(|e| {
        merge_err(MergeError::ConfigParse(format!(
            "cannot read {}: {e}",
            path.display()
        )))
    })?;
    MergeConfig::from_toml(&text).map_err(merge_err)
}

pub fn cmd_merge(
    input: PathBuf,
    output: PathBuf,
    config_path: Option<PathBuf>,
    report: Option<PathBuf>,
    json: bool,
    workers: Option<usize>,
    quiet: bool,
) -> Result<(), CliError> {
    if input == output {
        return Err(CliError::usage("input and output must be different files")
            .with_hint("write the merged batch next to the input, e.g. merged.json"));
    }
    if report.as_ref() == Some(&output) {
        return Err(CliError::usage("--report must not point at the output file"));
    }

    let mut config = load_config(config_path.as_deref())?;
    if let Some(workers) = workers {
        config.run.workers = workers;
    }
    info!(config = %config.name, workers = config.run.workers, "starting merge");

    let result = run_files(&input, &output, &config, &CancelToken::new()).map_err(merge_err)?;

    if !quiet {
        print_summary(&result, &output);
    }

    if report.is_some() || json {
        let rendered = serde_json::to_string_pretty(&result).map_err(|e| CliError {
            code: EXIT_MERGE_OUTPUT,
            message: format!("cannot serialize report: {e}"),
            hint: None,
        })?;
        if let Some(path) = &report {
            write_report(path, &rendered)?;
        }
        if json {
            println!("{rendered}");
        }
    }

    Ok(())
}

fn print_summary(result: &MergeResult, output: &Path) {
    let s = &result.summary;
    eprintln!(
        "merge: {} records -> {} factories ({} merged away, {} skipped)",
        s.input_records, s.output_records, s.reduction, s.skipped_records
    );
    for (scenario, count) in &s.scenario_counts {
        eprintln!("  {:<20} {}", scenario.to_string(), count);
    }
    if s.date_parse_failures > 0 {
        eprintln!("  date parse failures  {}", s.date_parse_failures);
    }
    eprintln!("wrote {}", output.display());
}

fn write_report(path: &Path, rendered: &str) -> Result<(), CliError> {
    let fail = |e: std::io::Error| CliError {
        code: EXIT_MERGE_OUTPUT,
        message: format!("cannot write report {}: {e}", path.display()),
        hint: None,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(fail)?;
    }
    fs::write(path, format!("{rendered}\n")).map_err(fail)
}

pub fn cmd_combine(dir: PathBuf, output: PathBuf, quiet: bool) -> Result<(), CliError> {
    let summary = combine_dir(&dir, &output).map_err(merge_err)?;
    if !quiet {
        eprintln!(
            "combine: {} records from {} files ({} skipped) -> {}",
            summary.records,
            summary.files_read,
            summary.files_skipped,
            output.display()
        );
    }
    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(&config_path))?;
    println!(
        "ok: '{}' (name key '{}', {} date formats, {}-day window, workers {})",
        config.name,
        config.fields.vendor_name,
        config.dates.formats.len(),
        config.dates.recency_window_days,
        config.run.workers
    );
    Ok(())
}
