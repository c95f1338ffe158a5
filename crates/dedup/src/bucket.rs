//! Supplementing merge for records that share one recency window.

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::MergeConfig;
use crate::model::FactoryRecord;
use crate::policy::{BucketPolicy, POLICIES};
use crate::select::prefers_second;
use crate::tokens::TokenSet;

/// Merge `records` into one output record, starting from the first.
///
/// A single record comes back unchanged. Keys the policy table does not
/// mention keep the first record's values.
pub fn merge_same_bucket(
    records: &[&FactoryRecord],
    key: &str,
    config: &MergeConfig,
) -> Map<String, Value> {
    let Some((first, rest)) = records.split_first() else {
        return Map::new();
    };
    if rest.is_empty() {
        return first.raw.clone();
    }

    let separators = &config.values.separators;
    let mut merged = first.raw.clone();

    for policy in &POLICIES {
        let field = policy.field;
        let json_key = config.fields.key(field).to_string();

        match policy.bucket {
            BucketPolicy::Better => {
                let mut winner: &FactoryRecord = *first;
                for candidate in rest {
                    if prefers_second(winner.get(field), candidate.get(field)) {
                        winner = *candidate;
                    }
                }
                let value = winner
                    .raw_value(field)
                    .cloned()
                    .unwrap_or_else(|| Value::String(String::new()));
                merged.insert(json_key, value);
            }
            BucketPolicy::FirstValid => {
                if first.get(field).is_none() {
                    if let Some(adopted) = rest.iter().find_map(|r| r.raw_value(field)) {
                        merged.insert(json_key, adopted.clone());
                    }
                }
            }
            BucketPolicy::UnionSet => {
                let sources = if policy.legacy_reset && config.compat.reset_bucket_sets_per_record {
                    &records[records.len() - 1..]
                } else {
                    records
                };
                let mut set = TokenSet::new();
                for record in sources {
                    set.extend_from(record.get(field), separators);
                }
                debug!(%field, tokens = set.len(), "bucket token union");
                merged.insert(json_key, set.into_json());
            }
        }
    }

    debug!(key, records = records.len(), "supplemented same-bucket records");
    merged
}
