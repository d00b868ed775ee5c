//! Single-field filter clauses.

use alloc::format;
use alloc::string::String;
use core::cmp::Ordering;
use core::fmt;
use cubist_core::{pattern_match, Error, Result, Value};

/// Comparison operator for a field filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
}

impl FilterOp {
    /// The operator's canonical symbol, used in serialized filter strings.
    pub fn symbol(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Gt => ">",
            FilterOp::Ge => ">=",
            FilterOp::Lt => "<",
            FilterOp::Le => "<=",
            FilterOp::Like => "like",
        }
    }

    /// Returns true for the ordering operators (`>`, `>=`, `<`, `<=`).
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            FilterOp::Gt | FilterOp::Ge | FilterOp::Lt | FilterOp::Le
        )
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A single boolean test over one field's value.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldFilter {
    field: String,
    op: FilterOp,
    value: Value,
}

impl FieldFilter {
    /// Creates a new field filter, validating the operator/value pairing.
    ///
    /// Malformed combinations fail fast here rather than at query time:
    /// `like` requires a string pattern, and ordering operators require a
    /// non-null bound.
    pub fn new(field: impl Into<String>, op: FilterOp, value: Value) -> Result<Self> {
        let field = field.into();
        if field.is_empty() {
            return Err(Error::invalid_filter(field, "field name cannot be empty"));
        }
        match op {
            FilterOp::Like if value.as_str().is_none() => {
                return Err(Error::invalid_filter(field, "like requires a string value"));
            }
            op if op.is_comparison() && value.is_null() => {
                return Err(Error::invalid_filter(
                    field,
                    format!("{} requires a non-null value", op.symbol()),
                ));
            }
            _ => {}
        }
        Ok(Self { field, op, value })
    }

    /// Convenience constructor for equality.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        Self::new(field, FilterOp::Eq, value.into())
    }

    /// Convenience constructor for inequality.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        Self::new(field, FilterOp::Ne, value.into())
    }

    /// Returns the field name this filter tests.
    #[inline]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the operator.
    #[inline]
    pub fn op(&self) -> FilterOp {
        self.op
    }

    /// Returns the comparison value.
    #[inline]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Tests a record's value for this filter's field.
    ///
    /// Ordering operators use `Value`'s total order, which compares mixed
    /// numeric types numerically and everything else by a fixed type rank,
    /// so mixed-type comparisons are deterministic rather than undefined.
    /// A null record value never satisfies an ordering operator or `like`.
    pub fn test(&self, value: &Value) -> bool {
        match self.op {
            FilterOp::Eq => *value == self.value,
            FilterOp::Ne => *value != self.value,
            FilterOp::Like => match (value.as_str(), self.value.as_str()) {
                (Some(v), Some(pattern)) => pattern_match::like(v, pattern),
                _ => false,
            },
            op => {
                if value.is_null() {
                    return false;
                }
                let ord = value.cmp(&self.value);
                match op {
                    FilterOp::Gt => ord == Ordering::Greater,
                    FilterOp::Ge => ord != Ordering::Less,
                    FilterOp::Lt => ord == Ordering::Less,
                    FilterOp::Le => ord != Ordering::Greater,
                    _ => unreachable!(),
                }
            }
        }
    }

    /// Canonical string form, e.g. `cat=A` or `amt>=12`.
    ///
    /// This string becomes part of row ids, so it must be identical for
    /// identical filters across rebuilds.
    pub fn canonical(&self) -> String {
        match self.op {
            FilterOp::Like => format!("{} like {}", self.field, self.value),
            _ => format!("{}{}{}", self.field, self.op.symbol(), self.value),
        }
    }
}
