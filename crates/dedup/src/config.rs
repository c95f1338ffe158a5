use std::collections::HashSet;

use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;

use crate::error::MergeError;
use crate::model::Field;
use crate::presence::DEFAULT_ABSENT_SENTINEL;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MergeConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub fields: FieldKeys,
    #[serde(default)]
    pub values: ValueConfig,
    #[serde(default)]
    pub dates: DateConfig,
    #[serde(default)]
    pub compat: CompatConfig,
    #[serde(default)]
    pub run: RunConfig,
}

fn default_name() -> String {
    "factory merge".into()
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            fields: FieldKeys::default(),
            values: ValueConfig::default(),
            dates: DateConfig::default(),
            compat: CompatConfig::default(),
            run: RunConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Field keys
// ---------------------------------------------------------------------------

/// JSON key for every logical field of a factory record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawFieldKeys")]
pub struct FieldKeys {
    pub vendor_name: String,
    pub main_products: String,
    pub certifications: String,
    pub tags: String,
    pub markets: String,
    pub remarks: String,
    pub cooperation_status: String,
    pub contact_info: String,
    pub wechat_qr_path: String,
    pub website: String,
    pub image_folder_path: String,
    pub source_file_path: String,
    pub date: String,
    pub merge_sources: String,
}

impl Default for FieldKeys {
    fn default() -> Self {
        Self::english()
    }
}

impl FieldKeys {
    pub fn english() -> Self {
        Self {
            vendor_name: "vendor_name".into(),
            main_products: "main_products".into(),
            certifications: "certifications".into(),
            tags: "tags".into(),
            markets: "markets".into(),
            remarks: "remarks".into(),
            cooperation_status: "cooperation_status".into(),
            contact_info: "contact_info".into(),
            wechat_qr_path: "wechat_qr_path".into(),
            website: "website".into(),
            image_folder_path: "image_folder_path".into(),
            source_file_path: "source_file_path".into(),
            date: "date".into(),
            merge_sources: "merge_sources".into(),
        }
    }

    /// Column names written by the upstream Chinese-language extractors.
    pub fn chinese() -> Self {
        Self {
            vendor_name: "厂商名称".into(),
            main_products: "主营产品".into(),
            certifications: "验厂/认证".into(),
            tags: "标签".into(),
            markets: "主销市场".into(),
            remarks: "备注".into(),
            cooperation_status: "合作情况".into(),
            contact_info: "联系方式".into(),
            wechat_qr_path: "微信".into(),
            website: "网址".into(),
            image_folder_path: "图片文件夹路径".into(),
            source_file_path: "文件路径".into(),
            date: "日期".into(),
            merge_sources: "合并来源".into(),
        }
    }

    pub fn key(&self, field: Field) -> &str {
        match field {
            Field::MainProducts => &self.main_products,
            Field::Certifications => &self.certifications,
            Field::Tags => &self.tags,
            Field::Markets => &self.markets,
            Field::Remarks => &self.remarks,
            Field::CooperationStatus => &self.cooperation_status,
            Field::ContactInfo => &self.contact_info,
            Field::WechatQrPath => &self.wechat_qr_path,
            Field::Website => &self.website,
            Field::ImageFolderPath => &self.image_folder_path,
        }
    }

    fn labelled(&self) -> [(&'static str, &str); 14] {
        [
            ("vendor_name", self.vendor_name.as_str()),
            ("main_products", self.main_products.as_str()),
            ("certifications", self.certifications.as_str()),
            ("tags", self.tags.as_str()),
            ("markets", self.markets.as_str()),
            ("remarks", self.remarks.as_str()),
            ("cooperation_status", self.cooperation_status.as_str()),
            ("contact_info", self.contact_info.as_str()),
            ("wechat_qr_path", self.wechat_qr_path.as_str()),
            ("website", self.website.as_str()),
            ("image_folder_path", self.image_folder_path.as_str()),
            ("source_file_path", self.source_file_path.as_str()),
            ("date", self.date.as_str()),
            ("merge_sources", self.merge_sources.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldPreset {
    En,
    Zh,
}

/// `[fields]` as written: an optional preset plus per-field overrides.
#[derive(Debug, Default, Deserialize)]
struct RawFieldKeys {
    preset: Option<FieldPreset>,
    vendor_name: Option<String>,
    main_products: Option<String>,
    certifications: Option<String>,
    tags: Option<String>,
    markets: Option<String>,
    remarks: Option<String>,
    cooperation_status: Option<String>,
    contact_info: Option<String>,
    wechat_qr_path: Option<String>,
    website: Option<String>,
    image_folder_path: Option<String>,
    source_file_path: Option<String>,
    date: Option<String>,
    merge_sources: Option<String>,
}

impl From<RawFieldKeys> for FieldKeys {
    fn from(raw: RawFieldKeys) -> Self {
        let base = match raw.preset.unwrap_or(FieldPreset::En) {
            FieldPreset::En => FieldKeys::english(),
            FieldPreset::Zh => FieldKeys::chinese(),
        };
        FieldKeys {
            vendor_name: raw.vendor_name.unwrap_or(base.vendor_name),
            main_products: raw.main_products.unwrap_or(base.main_products),
            certifications: raw.certifications.unwrap_or(base.certifications),
            tags: raw.tags.unwrap_or(base.tags),
            markets: raw.markets.unwrap_or(base.markets),
            remarks: raw.remarks.unwrap_or(base.remarks),
            cooperation_status: raw.cooperation_status.unwrap_or(base.cooperation_status),
            contact_info: raw.contact_info.unwrap_or(base.contact_info),
            wechat_qr_path: raw.wechat_qr_path.unwrap_or(base.wechat_qr_path),
            website: raw.website.unwrap_or(base.website),
            image_folder_path: raw.image_folder_path.unwrap_or(base.image_folder_path),
            source_file_path: raw.source_file_path.unwrap_or(base.source_file_path),
            date: raw.date.unwrap_or(base.date),
            merge_sources: raw.merge_sources.unwrap_or(base.merge_sources),
        }
    }
}

// ---------------------------------------------------------------------------
// Values + Dates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ValueConfig {
    #[serde(default = "default_sentinel")]
    pub absent_sentinel: String,
    /// Token delimiters in priority order; earlier entries win count ties.
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
}

fn default_sentinel() -> String {
    DEFAULT_ABSENT_SENTINEL.into()
}

pub fn default_separators() -> Vec<String> {
    [",", ";", " ", "、", "/", "|", "。", "\n", "\t", "，", "：", "；", "\r"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ValueConfig {
    fn default() -> Self {
        Self {
            absent_sentinel: default_sentinel(),
            separators: default_separators(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateConfig {
    /// chrono format strings, tried in order.
    #[serde(default = "default_date_formats")]
    pub formats: Vec<String>,
    #[serde(default = "default_window")]
    pub recency_window_days: u32,
}

fn default_date_formats() -> Vec<String> {
    ["%Y/%m/%d", "%Y-%m-%d", "%Y.%m.%d", "%Y年%m月%d日"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_window() -> u32 {
    30
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            formats: default_date_formats(),
            recency_window_days: default_window(),
        }
    }
}

// ---------------------------------------------------------------------------
// Compat + Run
// ---------------------------------------------------------------------------

/// Switches that reproduce the legacy batch merge output.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompatConfig {
    /// Pick the newest date by string comparison and parse each pair with the
    /// first format both sides accept.
    #[serde(default)]
    pub lexicographic_max_date: bool,
    /// Leave the base record's tags untouched on the dated-unique path.
    #[serde(default)]
    pub discard_dated_unique_tags: bool,
    /// Same-bucket product/certification sets hold only the last record's tokens.
    #[serde(default)]
    pub reset_bucket_sets_per_record: bool,
    /// Attach `merge_sources` to single-record groups as well.
    #[serde(default)]
    pub always_attach_provenance: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunConfig {
    /// Worker threads for per-group merges. 0 runs sequentially.
    #[serde(default)]
    pub workers: usize,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl MergeConfig {
    pub fn from_toml(input: &str) -> Result<Self, MergeError> {
        let config: MergeConfig =
            toml::from_str(input).map_err(|e| MergeError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn sentinel(&self) -> &str {
        &self.values.absent_sentinel
    }

    pub fn validate(&self) -> Result<(), MergeError> {
        let mut seen = HashSet::new();
        for (label, key) in self.fields.labelled() {
            if key.is_empty() {
                return Err(MergeError::ConfigValidation(format!(
                    "fields.{label}: key must not be empty"
                )));
            }
            if !seen.insert(key) {
                return Err(MergeError::ConfigValidation(format!(
                    "fields.{label}: key '{key}' is used by another field"
                )));
            }
        }

        if self.values.absent_sentinel.is_empty() {
            return Err(MergeError::ConfigValidation(
                "values.absent_sentinel must not be empty".into(),
            ));
        }
        if self.values.separators.is_empty() {
            return Err(MergeError::ConfigValidation(
                "values.separators must list at least one separator".into(),
            ));
        }
        if let Some(pos) = self.values.separators.iter().position(|s| s.is_empty()) {
            return Err(MergeError::ConfigValidation(format!(
                "values.separators[{pos}] is empty"
            )));
        }

        if self.dates.formats.is_empty() {
            return Err(MergeError::ConfigValidation(
                "dates.formats must list at least one format".into(),
            ));
        }
        for fmt in &self.dates.formats {
            if StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error)) {
                return Err(MergeError::ConfigValidation(format!(
                    "dates.formats: invalid format '{fmt}'"
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
