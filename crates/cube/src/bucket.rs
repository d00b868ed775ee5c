//! Bucketing: synthetic sibling groups applied after dimension grouping.
//!
//! A bucket spec can pull some of a level's rows into synthetic groups
//! (the classic case is collapsing long-tail groups into an "Other"
//! bucket). Rows for which the spec returns no bucket pass through
//! unchanged.

use crate::field::Field;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use cubist_core::Value;

/// A candidate row presented to a bucket spec.
///
/// `value` is the row's dimension value (`Null` for leaves). The `values`
/// map holds the row's aggregated measures, computed over its member
/// leaves; counting aggregates therefore reflect leaf counts at this
/// point, since the sub-grouping below the row is not built yet.
#[derive(Clone, Debug)]
pub struct RowPeek {
    /// Dimension value of the candidate row (Null for leaf rows).
    pub value: Value,
    /// Number of leaves in the candidate row's subtree.
    pub leaf_count: usize,
    /// True when the candidate is a single leaf row.
    pub is_leaf: bool,
    values: BTreeMap<String, Value>,
}

impl RowPeek {
    pub(crate) fn new(
        value: Value,
        leaf_count: usize,
        is_leaf: bool,
        values: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            value,
            leaf_count,
            is_leaf,
            values,
        }
    }

    /// Reads one of the candidate's values by field name (Null if absent).
    pub fn get(&self, field: &str) -> Value {
        self.values.get(field).cloned().unwrap_or(Value::Null)
    }
}

/// A bucketing strategy configured on the cube.
pub trait BucketSpec {
    /// Name of this spec, used in diagnostics.
    fn name(&self) -> &str;

    /// Decides whether bucketing runs at a grouping level.
    ///
    /// `depth` is 0 for the top level; `dimension` is the field grouped at
    /// this level, or None at the leaf level.
    fn applies_to_level(&self, depth: usize, dimension: Option<&Field>) -> bool {
        let _ = (depth, dimension);
        true
    }

    /// Assigns a candidate row to a bucket, or passes it through.
    fn bucket_for(&self, row: &RowPeek) -> Option<Value>;

    /// Display label for a bucket value.
    fn label_for(&self, bucket: &Value) -> String {
        bucket.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SmallGroupsToOther {
        threshold: usize,
    }

    impl BucketSpec for SmallGroupsToOther {
        fn name(&self) -> &str {
            "other"
        }

        fn applies_to_level(&self, depth: usize, _dimension: Option<&Field>) -> bool {
            depth == 0
        }

        fn bucket_for(&self, row: &RowPeek) -> Option<Value> {
            (row.leaf_count < self.threshold).then(|| Value::String("Other".into()))
        }
    }

    #[test]
    fn test_peek_get() {
        let mut values = BTreeMap::new();
        values.insert(String::from("amt"), Value::Int64(30));
        let peek = RowPeek::new(Value::String("A".into()), 2, false, values);

        assert_eq!(peek.get("amt"), Value::Int64(30));
        assert_eq!(peek.get("missing"), Value::Null);
        assert_eq!(peek.leaf_count, 2);
    }

    #[test]
    fn test_bucket_threshold() {
        let spec = SmallGroupsToOther { threshold: 3 };
        let small = RowPeek::new(Value::String("X".into()), 1, false, BTreeMap::new());
        let large = RowPeek::new(Value::String("Y".into()), 5, false, BTreeMap::new());

        assert_eq!(spec.bucket_for(&small), Some(Value::String("Other".into())));
        assert_eq!(spec.bucket_for(&large), None);
        assert!(spec.applies_to_level(0, None));
        assert!(!spec.applies_to_level(1, None));
    }

    #[test]
    fn test_default_label() {
        let spec = SmallGroupsToOther { threshold: 3 };
        assert_eq!(spec.label_for(&Value::String("Other".into())), "Other");
    }
}
