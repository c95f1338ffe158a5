//! File boundary: one read at the start of a run, one write at the end.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::config::MergeConfig;
use crate::engine::{load_records, run, CancelToken};
use crate::error::MergeError;
use crate::model::MergeResult;

/// Read `input`, merge, and write the merged array to `output`.
///
/// The output's parent directory is created when missing. Nothing is written
/// unless the merge completes.
pub fn run_files(
    input: &Path,
    output: &Path,
    config: &MergeConfig,
    cancel: &CancelToken,
) -> Result<MergeResult, MergeError> {
    info!(input = %input.display(), "reading input");
    let value = read_json(input)?;
    let batch = load_records(value, config)?;

    let result = run(config, batch, cancel)?;

    write_json(output, &result.records)?;
    info!(output = %output.display(), records = result.records.len(), "wrote merged records");
    Ok(result)
}

/// Counts from [`combine_dir`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CombineSummary {
    pub files_read: usize,
    pub files_skipped: usize,
    pub records: usize,
}

/// Concatenate every `*.json` file under `dir` into one record array.
///
/// Files are visited in sorted path order. An object contributes one record,
/// an array contributes each element. Files that do not parse are skipped.
pub fn combine_dir(dir: &Path, output: &Path) -> Result<CombineSummary, MergeError> {
    if !dir.is_dir() {
        return Err(MergeError::InputUnreadable {
            path: dir.display().to_string(),
            message: "not a directory".into(),
        });
    }

    let output_abs = absolute(output);
    let mut summary = CombineSummary::default();
    let mut records: Vec<Value> = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("error accessing entry: {e}");
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || !is_json(path) || absolute(path) == output_abs {
            continue;
        }

        match read_json(path) {
            Ok(Value::Array(items)) => {
                summary.records += items.len();
                records.extend(items);
                summary.files_read += 1;
            }
            Ok(Value::Object(object)) => {
                summary.records += 1;
                records.push(Value::Object(object));
                summary.files_read += 1;
            }
            Ok(_) => {
                error!(
                    path = %path.display(),
                    "skipping file: top level is neither object nor array"
                );
                summary.files_skipped += 1;
            }
            Err(e) => {
                error!(path = %path.display(), "skipping file: {e}");
                summary.files_skipped += 1;
            }
        }
    }

    write_json(output, &records)?;
    info!(
        files_read = summary.files_read,
        files_skipped = summary.files_skipped,
        records = summary.records,
        output = %output.display(),
        "combined record files"
    );
    Ok(summary)
}

fn read_json(path: &Path) -> Result<Value, MergeError> {
    let unreadable = |message: String| MergeError::InputUnreadable {
        path: path.display().to_string(),
        message,
    };
    let text = fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| unreadable(e.to_string()))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), MergeError> {
    let failed = |message: String| MergeError::OutputWrite {
        path: path.display().to_string(),
        message,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| failed(e.to_string()))?;
    }
    let mut text = serde_json::to_string_pretty(value).map_err(|e| failed(e.to_string()))?;
    text.push('\n');
    fs::write(path, text).map_err(|e| failed(e.to_string()))
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn run_files_creates_output_parent() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("combined.json");
        fs::write(
            &input,
            r#"[{"vendor_name": "甲厂", "markets": "EU"}, {"vendor_name": "甲厂", "markets": "EU,US"}]"#,
        )
        .unwrap();
        let output = dir.path().join("nested/out/merged.json");

        let result =
            run_files(&input, &output, &MergeConfig::default(), &CancelToken::new()).unwrap();
        assert_eq!(result.summary.output_records, 1);

        let written: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written[0]["markets"], json!("EU,US"));
    }

    #[test]
    fn missing_input_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_files(
            &dir.path().join("nope.json"),
            &dir.path().join("out.json"),
            &MergeConfig::default(),
            &CancelToken::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MergeError::InputUnreadable { ref path, .. } if path.ends_with("nope.json")
        ));
        assert!(!dir.path().join("out.json").exists());
    }

    #[test]
    fn cancelled_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.json");
        fs::write(&input, r#"[{"vendor_name": "甲厂"}]"#).unwrap();
        let output = dir.path().join("out.json");
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = run_files(&input, &output, &MergeConfig::default(), &cancel).unwrap_err();
        assert!(matches!(err, MergeError::Cancelled { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn unwritable_output_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.json");
        fs::write(&input, r#"[{"vendor_name": "甲厂"}]"#).unwrap();
        // a regular file where a directory is needed
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();

        let err = run_files(
            &input,
            &blocker.join("out.json"),
            &MergeConfig::default(),
            &CancelToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, MergeError::OutputWrite { .. }));
    }

    #[test]
    fn combine_concatenates_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("extracted");
        fs::create_dir_all(src.join("pdf")).unwrap();
        fs::write(src.join("b.json"), r#"{"vendor_name": "乙厂"}"#).unwrap();
        fs::write(
            src.join("a.JSON"),
            r#"[{"vendor_name": "甲厂"}, {"vendor_name": "丙厂"}]"#,
        )
        .unwrap();
        fs::write(src.join("pdf/c.json"), r#"[{"vendor_name": "丁厂"}]"#).unwrap();
        fs::write(src.join("broken.json"), "{not json").unwrap();
        fs::write(src.join("notes.txt"), "ignored").unwrap();

        let output = dir.path().join("combined/all.json");
        let summary = combine_dir(&src, &output).unwrap();
        assert_eq!(
            summary,
            CombineSummary {
                files_read: 3,
                files_skipped: 1,
                records: 4
            }
        );

        let written: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        let names: Vec<&str> = written
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["vendor_name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["甲厂", "丙厂", "乙厂", "丁厂"]);
    }

    #[test]
    fn combine_rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err =
            combine_dir(&dir.path().join("missing"), &dir.path().join("out.json")).unwrap_err();
        assert!(matches!(err, MergeError::InputUnreadable { .. }));
    }
}
