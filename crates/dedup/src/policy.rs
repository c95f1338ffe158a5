//! Per-field conflict-resolution table.
//!
//! Every merge path looks its rules up here. Adding a field means adding a
//! row, not a branch.

use crate::model::Field;

/// Rule applied when records in one recency window supplement each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketPolicy {
    /// Keep the longer present value (`select::choose`).
    Better,
    /// Keep the accumulator's value unless it is absent.
    FirstValid,
    /// Token-set union over the bucket.
    UnionSet,
}

/// Rule applied when a group has at least one undated record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatePolicy {
    /// Token-set union over the group.
    UnionSet,
    /// Every present value in record order, duplicates kept.
    Collect,
    /// The first present value in record order.
    FirstCollected,
    /// The longest present value; the first wins ties.
    Longest,
}

/// Rule applied when exactly one record is inside the recency window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniquePolicy {
    /// The authoritative record's value, untouched.
    Keep,
    /// Token-set union of the authoritative record and every other group member.
    UnionGroup,
    /// Token-set union over the recency window.
    UnionRecent,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldPolicy {
    pub field: Field,
    pub bucket: BucketPolicy,
    pub aggregate: AggregatePolicy,
    pub unique: UniquePolicy,
    /// Subject to `compat.reset_bucket_sets_per_record`.
    pub legacy_reset: bool,
}

pub const POLICIES: [FieldPolicy; 10] = [
    FieldPolicy {
        field: Field::MainProducts,
        bucket: BucketPolicy::UnionSet,
        aggregate: AggregatePolicy::UnionSet,
        unique: UniquePolicy::UnionGroup,
        legacy_reset: true,
    },
    FieldPolicy {
        field: Field::Certifications,
        bucket: BucketPolicy::UnionSet,
        aggregate: AggregatePolicy::UnionSet,
        unique: UniquePolicy::Keep,
        legacy_reset: true,
    },
    FieldPolicy {
        field: Field::Tags,
        bucket: BucketPolicy::UnionSet,
        aggregate: AggregatePolicy::UnionSet,
        unique: UniquePolicy::UnionRecent,
        legacy_reset: false,
    },
    FieldPolicy {
        field: Field::Markets,
        bucket: BucketPolicy::Better,
        aggregate: AggregatePolicy::Longest,
        unique: UniquePolicy::Keep,
        legacy_reset: false,
    },
    FieldPolicy {
        field: Field::Remarks,
        bucket: BucketPolicy::Better,
        aggregate: AggregatePolicy::Longest,
        unique: UniquePolicy::Keep,
        legacy_reset: false,
    },
    FieldPolicy {
        field: Field::CooperationStatus,
        bucket: BucketPolicy::Better,
        aggregate: AggregatePolicy::Collect,
        unique: UniquePolicy::Keep,
        legacy_reset: false,
    },
    FieldPolicy {
        field: Field::ContactInfo,
        bucket: BucketPolicy::Better,
        aggregate: AggregatePolicy::Collect,
        unique: UniquePolicy::Keep,
        legacy_reset: false,
    },
    FieldPolicy {
        field: Field::WechatQrPath,
        bucket: BucketPolicy::FirstValid,
        aggregate: AggregatePolicy::Collect,
        unique: UniquePolicy::Keep,
        legacy_reset: false,
    },
    FieldPolicy {
        field: Field::Website,
        bucket: BucketPolicy::FirstValid,
        aggregate: AggregatePolicy::Collect,
        unique: UniquePolicy::Keep,
        legacy_reset: false,
    },
    FieldPolicy {
        field: Field::ImageFolderPath,
        bucket: BucketPolicy::FirstValid,
        aggregate: AggregatePolicy::FirstCollected,
        unique: UniquePolicy::Keep,
        legacy_reset: false,
    },
];

pub fn policy_for(field: Field) -> &'static FieldPolicy {
    POLICIES
        .iter()
        .find(|p| p.field == field)
        .unwrap_or_else(|| unreachable!("every Field has a policy row"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_field_has_exactly_one_row() {
        let fields: HashSet<Field> = POLICIES.iter().map(|p| p.field).collect();
        assert_eq!(fields.len(), POLICIES.len());
        for field in Field::ALL {
            assert!(fields.contains(&field), "no policy for {field}");
        }
    }

    #[test]
    fn comparison_fields_use_better() {
        for field in [
            Field::Markets,
            Field::Remarks,
            Field::CooperationStatus,
            Field::ContactInfo,
        ] {
            assert_eq!(policy_for(field).bucket, BucketPolicy::Better, "{field}");
        }
    }

    #[test]
    fn first_valid_fields() {
        for field in [Field::WechatQrPath, Field::Website, Field::ImageFolderPath] {
            assert_eq!(policy_for(field).bucket, BucketPolicy::FirstValid, "{field}");
        }
    }

    #[test]
    fn image_folder_keeps_only_first_when_undated() {
        assert_eq!(
            policy_for(Field::ImageFolderPath).aggregate,
            AggregatePolicy::FirstCollected
        );
        assert_eq!(policy_for(Field::Website).aggregate, AggregatePolicy::Collect);
        assert_eq!(policy_for(Field::Markets).aggregate, AggregatePolicy::Longest);
    }

    #[test]
    fn reset_applies_to_products_and_certifications_only() {
        let reset: Vec<Field> = POLICIES
            .iter()
            .filter(|p| p.legacy_reset)
            .map(|p| p.field)
            .collect();
        assert_eq!(reset, vec![Field::MainProducts, Field::Certifications]);
    }

    #[test]
    fn dated_unique_touches_products_and_tags() {
        assert_eq!(policy_for(Field::MainProducts).unique, UniquePolicy::UnionGroup);
        assert_eq!(policy_for(Field::Tags).unique, UniquePolicy::UnionRecent);
        assert_eq!(policy_for(Field::Website).unique, UniquePolicy::Keep);
    }
}
