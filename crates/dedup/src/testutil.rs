use serde_json::Value;

use crate::config::MergeConfig;
use crate::engine::decode_record;
use crate::model::FactoryRecord;

pub fn record(index: usize, value: Value, config: &MergeConfig) -> FactoryRecord {
    decode_record(index, value, config).expect("test record should decode")
}
