use std::collections::HashMap;

use crate::model::{FactoryRecord, Group};

/// Partition records by normalized name.
///
/// Groups come out in order of first appearance and members keep input order,
/// so the output of a run is reproducible.
pub fn group_records(records: Vec<FactoryRecord>) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        match index.get(&record.key) {
            Some(&slot) => groups[slot].members.push(record),
            None => {
                index.insert(record.key.clone(), groups.len());
                groups.push(Group {
                    key: record.key.clone(),
                    members: vec![record],
                });
            }
        }
    }

    groups
}
