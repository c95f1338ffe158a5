use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::presence::is_absent;

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// Merge-relevant record fields. Identity, date and provenance keys are
/// handled separately by [`crate::config::FieldKeys`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    MainProducts,
    Certifications,
    Tags,
    Markets,
    Remarks,
    CooperationStatus,
    ContactInfo,
    WechatQrPath,
    Website,
    ImageFolderPath,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::MainProducts,
        Field::Certifications,
        Field::Tags,
        Field::Markets,
        Field::Remarks,
        Field::CooperationStatus,
        Field::ContactInfo,
        Field::WechatQrPath,
        Field::Website,
        Field::ImageFolderPath,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::MainProducts => "main_products",
            Self::Certifications => "certifications",
            Self::Tags => "tags",
            Self::Markets => "markets",
            Self::Remarks => "remarks",
            Self::CooperationStatus => "cooperation_status",
            Self::ContactInfo => "contact_info",
            Self::WechatQrPath => "wechat_qr_path",
            Self::Website => "website",
            Self::ImageFolderPath => "image_folder_path",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A present text value: either a single string or an itemized list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Typed view of a raw value. `None` when the value is absent.
    pub fn from_json(value: &Value, sentinel: &str) -> Option<Self> {
        if is_absent(value, sentinel) {
            return None;
        }
        match value {
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Array(items) => Some(Self::List(items.iter().map(json_text).collect())),
            other => Some(Self::Text(other.to_string())),
        }
    }

    /// Length in characters. A list counts as its items joined with `,`.
    pub fn char_len(&self) -> usize {
        match self {
            Self::Text(s) => s.chars().count(),
            Self::List(items) => {
                let chars: usize = items.iter().map(|s| s.chars().count()).sum();
                chars + items.len().saturating_sub(1)
            }
        }
    }

    /// Flat display text, used for date fields and log lines.
    pub fn text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::List(items) => items.join(","),
        }
    }
}

fn json_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One observation of one factory from one source document.
#[derive(Debug, Clone)]
pub struct FactoryRecord {
    /// Position in the input batch.
    pub index: usize,
    pub vendor_name: String,
    /// Normalized vendor name; the grouping key.
    pub key: String,
    pub date: Option<String>,
    pub source_file_path: Option<String>,
    /// Present merge-relevant values only, as compared.
    pub values: BTreeMap<Field, FieldValue>,
    /// The same present values as loaded; merged records are written from these.
    pub raw_values: BTreeMap<Field, Value>,
    /// The record exactly as loaded.
    pub raw: Map<String, Value>,
}

impl FactoryRecord {
    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    pub fn raw_value(&self, field: Field) -> Option<&Value> {
        self.raw_values.get(&field)
    }

    pub fn has_date(&self) -> bool {
        self.date.is_some()
    }
}

/// Records sharing one normalized vendor name, in input order.
#[derive(Debug, Clone)]
pub struct Group {
    pub key: String,
    pub members: Vec<FactoryRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    NotAnObject,
    MissingVendorName,
    EmptyNormalizedName { vendor_name: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "not an object"),
            Self::MissingVendorName => write!(f, "missing vendor name"),
            Self::EmptyNormalizedName { vendor_name } => {
                write!(f, "vendor name '{vendor_name}' normalizes to empty")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedRecord {
    pub index: usize,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Decoded batch ready for grouping.
#[derive(Debug, Clone, Default)]
pub struct LoadedBatch {
    pub input_records: usize,
    pub records: Vec<FactoryRecord>,
    pub skipped: Vec<SkippedRecord>,
}

// ---------------------------------------------------------------------------
// Per-group outcome
// ---------------------------------------------------------------------------

/// Terminal state of a group merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    SinglePassthrough,
    DatedUnique,
    DatedTieMerge,
    UndatedAggregate,
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SinglePassthrough => write!(f, "single_passthrough"),
            Self::DatedUnique => write!(f, "dated_unique"),
            Self::DatedTieMerge => write!(f, "dated_tie_merge"),
            Self::UndatedAggregate => write!(f, "undated_aggregate"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupDecision {
    pub key: String,
    pub scenario: Scenario,
    pub members: usize,
    /// Records inside the recency window (dated scenarios only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_date: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub date_parse_failures: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

#[derive(Debug, Clone)]
pub struct GroupOutcome {
    pub decision: GroupDecision,
    pub record: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeSummary {
    pub input_records: usize,
    pub accepted_records: usize,
    pub skipped_records: usize,
    pub groups: usize,
    pub merged_groups: usize,
    pub output_records: usize,
    pub reduction: usize,
    pub date_parse_failures: usize,
    pub scenario_counts: BTreeMap<Scenario, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeResult {
    pub meta: MergeMeta,
    pub summary: MergeSummary,
    pub decisions: Vec<GroupDecision>,
    pub skipped: Vec<SkippedRecord>,
    #[serde(skip)]
    pub records: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_maps_absence_to_none() {
        assert_eq!(FieldValue::from_json(&json!("无"), "无"), None);
        assert_eq!(FieldValue::from_json(&Value::Null, "无"), None);
        assert_eq!(
            FieldValue::from_json(&json!("EU"), "无"),
            Some(FieldValue::Text("EU".into()))
        );
        assert_eq!(
            FieldValue::from_json(&json!(["a", 3]), "无"),
            Some(FieldValue::List(vec!["a".into(), "3".into()]))
        );
        assert_eq!(
            FieldValue::from_json(&json!(0), "无"),
            Some(FieldValue::Text("0".into()))
        );
    }

    #[test]
    fn char_len_counts_characters_not_bytes() {
        assert_eq!(FieldValue::Text("欧洲".into()).char_len(), 2);
        assert_eq!(FieldValue::List(vec!["EU".into(), "US".into()]).char_len(), 5);
        assert_eq!(FieldValue::List(vec![]).char_len(), 0);
    }

    #[test]
    fn scenario_display_matches_serde() {
        for s in [
            Scenario::SinglePassthrough,
            Scenario::DatedUnique,
            Scenario::DatedTieMerge,
            Scenario::UndatedAggregate,
        ] {
            assert_eq!(serde_json::to_value(s).unwrap(), json!(s.to_string()));
        }
    }
}
