//! Composite filters.
//!
//! A `Filter` is an implicit AND of zero or more field filters. The empty
//! filter passes every record. Filters serialize to a canonical string in
//! which clause order does not matter; that string is used as a row-id
//! component and cache key, so identical filter sets must always yield
//! identical strings.

use crate::field_filter::FieldFilter;
use alloc::string::String;
use alloc::vec::Vec;
use cubist_core::Value;

/// Resolves a field name to a value for filter evaluation.
///
/// Implemented by whatever pairs a record with the cube's field layout.
/// Missing fields resolve to `Value::Null`.
pub trait FieldResolver {
    fn field_value(&self, field: &str) -> Value;
}

/// An AND-composite of field filters.
#[derive(Clone, Debug, Default)]
pub struct Filter {
    clauses: Vec<FieldFilter>,
}

impl Filter {
    /// Creates an empty filter that passes everything.
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a filter from a list of clauses.
    pub fn new(clauses: Vec<FieldFilter>) -> Self {
        Self { clauses }
    }

    /// Creates a filter with a single clause.
    pub fn from_clause(clause: FieldFilter) -> Self {
        Self {
            clauses: alloc::vec![clause],
        }
    }

    /// Returns a filter extended with another clause.
    pub fn and(mut self, clause: FieldFilter) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Returns the clauses in construction order.
    #[inline]
    pub fn clauses(&self) -> &[FieldFilter] {
        &self.clauses
    }

    /// Returns true if this filter has no clauses.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Tests a record against every clause (logical AND).
    ///
    /// The empty filter always passes.
    pub fn test<R: FieldResolver + ?Sized>(&self, record: &R) -> bool {
        self.clauses
            .iter()
            .all(|clause| clause.test(&record.field_value(clause.field())))
    }

    /// Canonical string form: clauses rendered and sorted, joined with `&`.
    ///
    /// Stable under clause permutation; the empty filter canonicalizes to
    /// the empty string.
    pub fn canonical(&self) -> String {
        let mut rendered: Vec<String> = self.clauses.iter().map(|c| c.canonical()).collect();
        rendered.sort_unstable();
        rendered.join("&")
    }
}

impl PartialEq for Filter {
    /// Structural equality: the same clause multiset in any order.
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl From<FieldFilter> for Filter {
    fn from(clause: FieldFilter) -> Self {
        Filter::from_clause(clause)
    }
}
