use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::MergeConfig;
use crate::dispatch::merge_group;
use crate::error::MergeError;
use crate::group::group_records;
use crate::model::{
    FactoryRecord, Field, FieldValue, Group, GroupDecision, GroupOutcome, LoadedBatch, MergeMeta,
    MergeResult, MergeSummary, Scenario, SkipReason, SkippedRecord,
};
use crate::normalize::normalize_name;

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cooperative stop signal, checked before each group is merged.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Group and merge a loaded batch. Returns merged records + summary.
///
/// Nothing is returned for a cancelled run; the caller writes no output.
pub fn run(
    config: &MergeConfig,
    batch: LoadedBatch,
    cancel: &CancelToken,
) -> Result<MergeResult, MergeError> {
    let LoadedBatch {
        input_records,
        records,
        skipped,
    } = batch;
    let accepted_records = records.len();

    let groups = group_records(records);
    let merged_groups = groups.iter().filter(|g| g.members.len() > 1).count();
    info!(
        name = %config.name,
        input_records,
        accepted_records,
        skipped_records = skipped.len(),
        groups = groups.len(),
        merged_groups,
        "grouped records by vendor name"
    );

    let outcomes = if config.run.workers > 0 {
        merge_parallel(&groups, config, cancel)?
    } else {
        merge_sequential(&groups, config, cancel)?
    };

    let summary = summarize(input_records, accepted_records, skipped.len(), &outcomes);
    info!(
        input_records = summary.input_records,
        groups = summary.groups,
        output_records = summary.output_records,
        reduction = summary.reduction,
        date_parse_failures = summary.date_parse_failures,
        "merge complete"
    );

    let (decisions, records): (Vec<GroupDecision>, Vec<Value>) = outcomes
        .into_iter()
        .map(|o| (o.decision, Value::Object(o.record)))
        .unzip();

    Ok(MergeResult {
        meta: MergeMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        decisions,
        skipped,
        records,
    })
}

fn merge_sequential(
    groups: &[Group],
    config: &MergeConfig,
    cancel: &CancelToken,
) -> Result<Vec<GroupOutcome>, MergeError> {
    let mut outcomes = Vec::with_capacity(groups.len());
    for group in groups {
        if cancel.is_cancelled() {
            return Err(cancelled(outcomes.len()));
        }
        outcomes.push(merge_group(group, config));
    }
    Ok(outcomes)
}

fn merge_parallel(
    groups: &[Group],
    config: &MergeConfig,
    cancel: &CancelToken,
) -> Result<Vec<GroupOutcome>, MergeError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.run.workers)
        .build()
        .map_err(|e| MergeError::Io(format!("cannot start worker pool: {e}")))?;

    // indexed collect keeps group order
    let outcomes: Vec<Option<GroupOutcome>> = pool.install(|| {
        groups
            .par_iter()
            .map(|group| (!cancel.is_cancelled()).then(|| merge_group(group, config)))
            .collect()
    });

    let completed = outcomes.iter().filter(|o| o.is_some()).count();
    if completed < outcomes.len() {
        return Err(cancelled(completed));
    }
    Ok(outcomes.into_iter().flatten().collect())
}

fn cancelled(completed_groups: usize) -> MergeError {
    warn!(completed_groups, "merge cancelled");
    MergeError::Cancelled { completed_groups }
}

fn summarize(
    input_records: usize,
    accepted_records: usize,
    skipped_records: usize,
    outcomes: &[GroupOutcome],
) -> MergeSummary {
    let mut scenario_counts: BTreeMap<Scenario, usize> = BTreeMap::new();
    for outcome in outcomes {
        *scenario_counts.entry(outcome.decision.scenario).or_default() += 1;
    }
    let merged_groups = outcomes.iter().filter(|o| o.decision.members > 1).count();

    MergeSummary {
        input_records,
        accepted_records,
        skipped_records,
        groups: outcomes.len(),
        merged_groups,
        output_records: outcomes.len(),
        reduction: accepted_records.saturating_sub(outcomes.len()),
        date_parse_failures: outcomes.iter().map(|o| o.decision.date_parse_failures).sum(),
        scenario_counts,
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Decode JSON text holding an array of factory records.
pub fn load_json_records(text: &str, config: &MergeConfig) -> Result<LoadedBatch, MergeError> {
    let value: Value = serde_json::from_str(text).map_err(|e| MergeError::InputUnreadable {
        path: "<text>".into(),
        message: e.to_string(),
    })?;
    load_records(value, config)
}

/// Decode an already-parsed JSON array. Records that cannot take part in
/// grouping are skipped, not fatal.
pub fn load_records(value: Value, config: &MergeConfig) -> Result<LoadedBatch, MergeError> {
    let kind = json_kind(&value);
    let Value::Array(items) = value else {
        return Err(MergeError::InputShape(format!(
            "expected a JSON array, found {kind}"
        )));
    };

    let mut batch = LoadedBatch {
        input_records: items.len(),
        ..LoadedBatch::default()
    };

    for (index, item) in items.into_iter().enumerate() {
        match decode_record(index, item, config) {
            Ok(record) => batch.records.push(record),
            Err(reason) => {
                warn!(index, %reason, "skipping record");
                batch.skipped.push(SkippedRecord { index, reason });
            }
        }
    }

    Ok(batch)
}

/// Typed view of one raw record.
pub fn decode_record(
    index: usize,
    value: Value,
    config: &MergeConfig,
) -> Result<FactoryRecord, SkipReason> {
    let Value::Object(raw) = value else {
        return Err(SkipReason::NotAnObject);
    };

    let keys = &config.fields;
    let sentinel = config.sentinel();

    let vendor_name = present_text(&raw, &keys.vendor_name, sentinel)
        .ok_or(SkipReason::MissingVendorName)?;
    let key = normalize_name(&vendor_name);
    if key.is_empty() {
        return Err(SkipReason::EmptyNormalizedName { vendor_name });
    }

    let mut values = BTreeMap::new();
    let mut raw_values = BTreeMap::new();
    for field in Field::ALL {
        let Some(value) = raw.get(keys.key(field)) else {
            continue;
        };
        if let Some(typed) = FieldValue::from_json(value, sentinel) {
            values.insert(field, typed);
            raw_values.insert(field, value.clone());
        }
    }

    Ok(FactoryRecord {
        index,
        vendor_name,
        key,
        date: present_text(&raw, &keys.date, sentinel),
        source_file_path: present_text(&raw, &keys.source_file_path, sentinel),
        values,
        raw_values,
        raw,
    })
}

fn present_text(raw: &Map<String, Value>, key: &str, sentinel: &str) -> Option<String> {
    raw.get(key)
        .and_then(|v| FieldValue::from_json(v, sentinel))
        .map(|v| v.text())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn load_basic_batch() {
        let text = r#"[
            {"vendor_name": "甲厂", "markets": "EU", "date": "无"},
            {"vendor_name": "乙厂 Yi Factory", "date": "2024-05-01", "source_file_path": "a.pdf"}
        ]"#;
        let batch = load_json_records(text, &MergeConfig::default()).unwrap();
        assert_eq!(batch.input_records, 2);
        assert!(batch.skipped.is_empty());
        assert_eq!(batch.records[0].key, "甲厂");
        assert_eq!(batch.records[0].date, None);
        assert_eq!(batch.records[1].key, "乙厂");
        assert_eq!(batch.records[1].vendor_name, "乙厂 Yi Factory");
        assert_eq!(batch.records[1].date.as_deref(), Some("2024-05-01"));
        assert_eq!(batch.records[1].source_file_path.as_deref(), Some("a.pdf"));
    }

    #[test]
    fn malformed_records_are_skipped() {
        let text = r#"[
            {"vendor_name": "甲厂"},
            {"markets": "EU"},
            {"vendor_name": "无"},
            "not a record",
            {"vendor_name": "/二厂"}
        ]"#;
        let batch = load_json_records(text, &MergeConfig::default()).unwrap();
        assert_eq!(batch.input_records, 5);
        assert_eq!(batch.records.len(), 1);
        let reasons: Vec<(usize, &SkipReason)> =
            batch.skipped.iter().map(|s| (s.index, &s.reason)).collect();
        assert_eq!(
            reasons,
            vec![
                (1, &SkipReason::MissingVendorName),
                (2, &SkipReason::MissingVendorName),
                (3, &SkipReason::NotAnObject),
                (
                    4,
                    &SkipReason::EmptyNormalizedName {
                        vendor_name: "/二厂".into()
                    }
                ),
            ]
        );
    }

    #[test]
    fn corrupt_json_is_unreadable() {
        let err = load_json_records("[{", &MergeConfig::default()).unwrap_err();
        assert!(matches!(err, MergeError::InputUnreadable { .. }));
    }

    #[test]
    fn object_root_is_a_shape_error() {
        let err =
            load_json_records(r#"{"vendor_name": "甲厂"}"#, &MergeConfig::default()).unwrap_err();
        assert!(matches!(err, MergeError::InputShape(ref m) if m.contains("an object")));
    }

    #[test]
    fn configured_keys_drive_decoding() {
        let mut config = MergeConfig::default();
        config.fields = crate::config::FieldKeys::chinese();
        let record = decode_record(
            0,
            json!({"厂商名称": "甲厂", "主销市场": "EU", "日期": "2024/05/01", "markets": "ignored"}),
            &config,
        )
        .unwrap();
        assert_eq!(record.get(Field::Markets), Some(&FieldValue::Text("EU".into())));
        assert_eq!(record.raw_value(Field::Markets), Some(&json!("EU")));
        assert_eq!(record.raw_value(Field::Website), None);
        assert_eq!(record.date.as_deref(), Some("2024/05/01"));
    }

    #[test]
    fn run_counts_groups_and_reduction() {
        let text = r#"[
            {"vendor_name": "甲厂", "source_file_path": "1.pdf"},
            {"vendor_name": "乙厂"},
            {"vendor_name": "甲厂（总部）", "source_file_path": "2.pdf"},
            {"markets": "EU"}
        ]"#;
        let config = MergeConfig::default();
        let batch = load_json_records(text, &config).unwrap();
        let result = run(&config, batch, &CancelToken::new()).unwrap();

        assert_eq!(result.summary.input_records, 4);
        assert_eq!(result.summary.accepted_records, 3);
        assert_eq!(result.summary.skipped_records, 1);
        assert_eq!(result.summary.groups, 2);
        assert_eq!(result.summary.merged_groups, 1);
        assert_eq!(result.summary.output_records, 2);
        assert_eq!(result.summary.reduction, 1);
        assert_eq!(result.summary.scenario_counts[&Scenario::UndatedAggregate], 1);
        assert_eq!(result.summary.scenario_counts[&Scenario::SinglePassthrough], 1);
        assert_eq!(result.records[0]["merge_sources"], json!(["1.pdf", "2.pdf"]));
        assert_eq!(result.records[1], json!({"vendor_name": "乙厂"}));
        assert_eq!(result.meta.config_name, "factory merge");
    }

    #[test]
    fn cancelled_before_start_merges_nothing() {
        let config = MergeConfig::default();
        let batch = load_json_records(r#"[{"vendor_name": "甲厂"}]"#, &config).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = run(&config, batch, &cancel).unwrap_err();
        assert!(matches!(err, MergeError::Cancelled { completed_groups: 0 }));
    }

    #[test]
    fn worker_pool_keeps_group_order() {
        let records: Vec<Value> = (0..200)
            .map(|i| json!({"vendor_name": format!("工厂{}", i % 50), "markets": format!("m{i}")}))
            .collect();
        let text = serde_json::to_string(&records).unwrap();

        let sequential = MergeConfig::default();
        let mut parallel = MergeConfig::default();
        parallel.run.workers = 4;

        let a = run(
            &sequential,
            load_json_records(&text, &sequential).unwrap(),
            &CancelToken::new(),
        )
        .unwrap();
        let b = run(
            &parallel,
            load_json_records(&text, &parallel).unwrap(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(a.records, b.records);
        assert_eq!(a.records.len(), 50);
        assert_eq!(a.records[0]["vendor_name"], json!("工厂0"));
        assert_eq!(a.records[49]["vendor_name"], json!("工厂49"));
    }
}
