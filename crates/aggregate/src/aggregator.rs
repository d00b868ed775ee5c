//! Aggregation strategies.
//!
//! A non-dimension field carries an aggregator that reduces the values of a
//! group's descendant leaves to a single value. Built-in strategies cover
//! the common reductions; `AggregatorKind::Custom` plugs in an arbitrary
//! strategy object.

use alloc::rc::Rc;
use alloc::string::String;
use core::fmt;
use cubist_core::Value;

/// Marker returned by the UNIQUE aggregator when a group's members do not
/// agree on a single value.
pub const MULTIPLE_VALUES: &str = "(Multiple)";

/// Returns the UNIQUE aggregator's "multiple values" sentinel.
pub fn multiple_values() -> Value {
    Value::String(String::from(MULTIPLE_VALUES))
}

/// Outcome of an incremental aggregation attempt.
///
/// `Recompute` is the "cannot decompose this delta" signal; it is never an
/// error and triggers a recomputation of the affected cell only.
#[derive(Clone, Debug, PartialEq)]
pub enum Replace {
    /// The incremental path produced a new value.
    Updated(Value),
    /// The delta provably does not change the aggregate.
    Unchanged,
    /// The aggregation is not decomposable for this delta; recompute the
    /// cell from the group's leaf values.
    Recompute,
}

/// A pluggable aggregation strategy.
///
/// `aggregate` is the full recomputation over a group's descendant leaf
/// values (nulls included; strategies decide how to treat them).
/// `replace` is the optional O(delta) incremental path; the default
/// declines, which is always correct.
pub trait Aggregator {
    /// Reduces a complete set of leaf values to the aggregated value.
    fn aggregate(&self, values: &mut dyn Iterator<Item = &Value>) -> Value;

    /// Attempts an incremental recomputation from a delta.
    ///
    /// `added`/`removed` are leaf values entering/leaving the group and
    /// `updated` carries (old, new) pairs for leaves whose value changed.
    fn replace(
        &self,
        current: &Value,
        added: &[Value],
        removed: &[Value],
        updated: &[(Value, Value)],
    ) -> Replace {
        let _ = (current, added, removed, updated);
        Replace::Recompute
    }
}

/// The aggregation strategy attached to a measure field.
#[derive(Clone)]
pub enum AggregatorKind {
    /// Numeric sum over non-null leaf values.
    Sum,
    /// Mean over non-null leaf values.
    Avg,
    /// The single common value, or the multiple-values sentinel.
    Unique,
    /// Number of direct children of the row.
    ChildCount,
    /// Number of descendant leaves.
    LeafCount,
    /// {min, max} over non-null leaf values.
    Range,
    /// A caller-supplied strategy.
    Custom(Rc<dyn Aggregator>),
}

impl AggregatorKind {
    /// Wraps a strategy object.
    pub fn custom(aggregator: Rc<dyn Aggregator>) -> Self {
        AggregatorKind::Custom(aggregator)
    }
}

impl fmt::Debug for AggregatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregatorKind::Sum => write!(f, "Sum"),
            AggregatorKind::Avg => write!(f, "Avg"),
            AggregatorKind::Unique => write!(f, "Unique"),
            AggregatorKind::ChildCount => write!(f, "ChildCount"),
            AggregatorKind::LeafCount => write!(f, "LeafCount"),
            AggregatorKind::Range => write!(f, "Range"),
            AggregatorKind::Custom(_) => write!(f, "Custom"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    struct First;

    impl Aggregator for First {
        fn aggregate(&self, values: &mut dyn Iterator<Item = &Value>) -> Value {
            values.next().cloned().unwrap_or(Value::Null)
        }
    }

    #[test]
    fn test_custom_default_replace_declines() {
        let agg = First;
        let outcome = agg.replace(&Value::Int64(1), &[], &[], &[]);
        assert_eq!(outcome, Replace::Recompute);
    }

    #[test]
    fn test_custom_aggregate() {
        let agg = First;
        let values = vec![Value::Int64(7), Value::Int64(9)];
        let result = agg.aggregate(&mut values.iter());
        assert_eq!(result, Value::Int64(7));
    }

    #[test]
    fn test_multiple_values_sentinel() {
        assert_eq!(multiple_values(), Value::String("(Multiple)".into()));
    }

    #[test]
    fn test_kind_debug() {
        let kind = AggregatorKind::custom(Rc::new(First));
        assert_eq!(alloc::format!("{:?}", kind), "Custom");
    }
}
