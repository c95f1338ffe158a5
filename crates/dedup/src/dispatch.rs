//! Per-group merge: route each group to one terminal scenario and build its
//! single output record.

use serde_json::{Map, Value};
use tracing::{debug, info, info_span, warn};

use crate::bucket::merge_same_bucket;
use crate::config::MergeConfig;
use crate::dates::RecencyWindow;
use crate::model::{FactoryRecord, Field, Group, GroupDecision, GroupOutcome, Scenario};
use crate::policy::{AggregatePolicy, UniquePolicy, POLICIES};
use crate::presence::is_absent;
use crate::provenance::Provenance;
use crate::select::longest;
use crate::tokens::TokenSet;

/// Merge one group into exactly one output record.
pub fn merge_group(group: &Group, config: &MergeConfig) -> GroupOutcome {
    let span = info_span!("group", key = %group.key, members = group.members.len());
    let _enter = span.enter();

    let members = &group.members;
    let mut decision = GroupDecision {
        key: group.key.clone(),
        scenario: Scenario::SinglePassthrough,
        members: members.len(),
        recent: None,
        max_date: None,
        sources: Vec::new(),
        date_parse_failures: 0,
    };

    let mut record = match members.as_slice() {
        [] => Map::new(),
        [only] => only.raw.clone(),
        _ if members.iter().all(FactoryRecord::has_date) => {
            let recent = RecencyWindow::from_config(config).select(members);
            if recent.parse_failures > 0 {
                debug!(
                    failures = recent.parse_failures,
                    "unparsable dates only match the newest date exactly"
                );
            }
            decision.recent = Some(recent.members.len());
            decision.max_date = Some(recent.max_date.clone());
            decision.date_parse_failures = recent.parse_failures;

            if let [base] = recent.members.as_slice() {
                decision.scenario = Scenario::DatedUnique;
                merge_dated_unique(group, base, &recent.members, config)
            } else {
                decision.scenario = Scenario::DatedTieMerge;
                merge_same_bucket(&recent.members, &group.key, config)
            }
        }
        _ => {
            decision.scenario = Scenario::UndatedAggregate;
            merge_undated(group, config)
        }
    };

    if members.len() > 1 || config.compat.always_attach_provenance {
        let provenance = Provenance::collect(members);
        if provenance.is_empty() {
            debug!("no member carries a source path");
        } else {
            debug!(sources = provenance.len(), "attaching merge sources");
        }
        decision.sources = provenance.to_vec();
        record.insert(config.fields.merge_sources.clone(), provenance.into_json());
    }

    if decision.scenario == Scenario::SinglePassthrough {
        debug!("single record passes through");
    } else {
        info!(
            scenario = %decision.scenario,
            recent = ?decision.recent,
            max_date = ?decision.max_date,
            sources = decision.sources.len(),
            "merged group"
        );
    }

    GroupOutcome { decision, record }
}

/// One record is inside the recency window. It stays authoritative; only the
/// fields whose policy widens them are rewritten.
fn merge_dated_unique(
    group: &Group,
    base: &FactoryRecord,
    recent: &[&FactoryRecord],
    config: &MergeConfig,
) -> Map<String, Value> {
    let separators = &config.values.separators;
    let mut merged = base.raw.clone();

    for policy in &POLICIES {
        let field = policy.field;
        let mut set = TokenSet::new();
        match policy.unique {
            UniquePolicy::Keep => continue,
            UniquePolicy::UnionGroup => {
                set.extend_from(base.get(field), separators);
                for other in group.members.iter().filter(|m| m.index != base.index) {
                    set.extend_from(other.get(field), separators);
                }
            }
            UniquePolicy::UnionRecent => {
                if config.compat.discard_dated_unique_tags {
                    continue;
                }
                for record in recent {
                    set.extend_from(record.get(field), separators);
                }
            }
        }
        merged.insert(config.fields.key(field).to_string(), set.into_json());
    }

    merged
}

/// At least one member is undated: aggregate over the whole group.
fn merge_undated(group: &Group, config: &MergeConfig) -> Map<String, Value> {
    let separators = &config.values.separators;
    let sentinel = config.sentinel();
    let mut merged = group.members[0].raw.clone();

    for policy in &POLICIES {
        let field = policy.field;
        let value = match policy.aggregate {
            AggregatePolicy::UnionSet => {
                let mut set = TokenSet::new();
                for member in &group.members {
                    set.extend_from(member.get(field), separators);
                }
                set.into_json()
            }
            AggregatePolicy::Collect => {
                let items: Vec<Value> = group
                    .members
                    .iter()
                    .filter_map(|m| m.raw_value(field))
                    .flat_map(|value| collected_items(value, sentinel))
                    .collect();
                if items.is_empty() {
                    empty()
                } else {
                    Value::Array(items)
                }
            }
            AggregatePolicy::FirstCollected => group
                .members
                .iter()
                .find_map(|m| m.raw_value(field))
                .map_or_else(empty, Value::clone),
            AggregatePolicy::Longest => {
                let candidates = group
                    .members
                    .iter()
                    .filter_map(|m| Some((m.get(field)?, m.raw_value(field)?)));
                longest(candidates).map_or_else(empty, Value::clone)
            }
        };
        merged.insert(config.fields.key(field).to_string(), value);
    }

    let wechat = group
        .members
        .iter()
        .filter(|m| m.get(Field::WechatQrPath).is_some())
        .count();
    if wechat > 1 {
        warn!(count = wechat, "several WeChat QR codes merged into one record; review manually");
    }

    merged
}

/// Items contributed by one value to an ordered collection. Lists are
/// flattened; their absent items are dropped.
fn collected_items(value: &Value, sentinel: &str) -> Vec<Value> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter(|item| !is_absent(item, sentinel))
            .cloned()
            .collect(),
        other => vec![other.clone()],
    }
}

fn empty() -> Value {
    Value::String(String::new())
}
