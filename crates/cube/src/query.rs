//! Query configuration.
//!
//! A `QuerySpec` is the plain configuration object callers hand to the
//! cube; a `Query` is the validated form bound to a cube's field set. The
//! binding is fixed for the life of the query: derived copies keep it.

use crate::field::{FieldSet, RecordView};
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use cubist_core::{Error, Record, Result};
use cubist_filter::Filter;

/// Plain query configuration.
#[derive(Clone, Debug, Default)]
pub struct QuerySpec {
    /// Grouping dimensions, outermost first.
    pub dimensions: Vec<String>,
    /// Record filter; `None` admits every record.
    pub filter: Option<Filter>,
    /// Wrap the result in a single "Total" root row.
    pub include_root: bool,
    /// Expose leaf rows in the visible tree.
    pub include_leaves: bool,
}

impl QuerySpec {
    /// Creates an empty spec: no dimensions, no filter, no root, no leaves.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a grouping dimension.
    pub fn dimension(mut self, name: impl Into<String>) -> Self {
        self.dimensions.push(name.into());
        self
    }

    /// Replaces the grouping dimensions.
    pub fn dimensions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dimensions = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the record filter.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets whether the result is wrapped in a root row.
    pub fn include_root(mut self, include: bool) -> Self {
        self.include_root = include;
        self
    }

    /// Sets whether leaf rows are visible in the result.
    pub fn include_leaves(mut self, include: bool) -> Self {
        self.include_leaves = include;
        self
    }
}

/// Overrides applied by `Query::derive`.
///
/// Unset fields keep the original query's configuration; the cube binding
/// itself cannot be overridden.
#[derive(Clone, Debug, Default)]
pub struct QueryOverrides {
    pub dimensions: Option<Vec<String>>,
    pub filter: Option<Option<Filter>>,
    pub include_root: Option<bool>,
    pub include_leaves: Option<bool>,
}

impl QueryOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the grouping dimensions.
    pub fn dimensions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dimensions = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Overrides the filter.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(Some(filter));
        self
    }

    /// Overrides the filter to none.
    pub fn clear_filter(mut self) -> Self {
        self.filter = Some(None);
        self
    }

    /// Overrides the include-root flag.
    pub fn include_root(mut self, include: bool) -> Self {
        self.include_root = Some(include);
        self
    }

    /// Overrides the include-leaves flag.
    pub fn include_leaves(mut self, include: bool) -> Self {
        self.include_leaves = Some(include);
        self
    }
}

/// A validated, immutable query bound to a cube's field set.
#[derive(Clone, Debug)]
pub struct Query {
    fields: Rc<FieldSet>,
    spec: QuerySpec,
    dimension_indices: Vec<usize>,
}

impl Query {
    /// Validates a spec against the field set.
    ///
    /// Every named dimension must exist and be declared as a dimension
    /// field; violations fail here, not at query time.
    pub fn new(fields: Rc<FieldSet>, spec: QuerySpec) -> Result<Self> {
        let mut dimension_indices = Vec::with_capacity(spec.dimensions.len());
        for name in &spec.dimensions {
            let index = fields
                .index_of(name)
                .ok_or_else(|| Error::unknown_field(name.clone()))?;
            let field = &fields.fields()[index];
            if !field.is_dimension() {
                return Err(Error::not_dimension(name.clone()));
            }
            dimension_indices.push(index);
        }
        Ok(Self {
            fields,
            spec,
            dimension_indices,
        })
    }

    /// Returns a new query with the given overrides merged in.
    ///
    /// The field-set binding is kept; the merged spec is re-validated.
    pub fn derive(&self, overrides: QueryOverrides) -> Result<Self> {
        let mut spec = self.spec.clone();
        if let Some(dimensions) = overrides.dimensions {
            spec.dimensions = dimensions;
        }
        if let Some(filter) = overrides.filter {
            spec.filter = filter;
        }
        if let Some(include_root) = overrides.include_root {
            spec.include_root = include_root;
        }
        if let Some(include_leaves) = overrides.include_leaves {
            spec.include_leaves = include_leaves;
        }
        Query::new(self.fields.clone(), spec)
    }

    /// Returns the bound field set.
    #[inline]
    pub fn fields(&self) -> &Rc<FieldSet> {
        &self.fields
    }

    /// Returns the dimension names, outermost first.
    #[inline]
    pub fn dimensions(&self) -> &[String] {
        &self.spec.dimensions
    }

    /// Returns the resolved dimension field indices.
    #[inline]
    pub fn dimension_indices(&self) -> &[usize] {
        &self.dimension_indices
    }

    /// Returns the filter, if any.
    pub fn filter(&self) -> Option<&Filter> {
        self.spec.filter.as_ref()
    }

    /// Returns true if this query filters records at all.
    pub fn has_filter(&self) -> bool {
        self.spec.filter.as_ref().is_some_and(|f| !f.is_empty())
    }

    /// Returns true if the result is wrapped in a root row.
    #[inline]
    pub fn include_root(&self) -> bool {
        self.spec.include_root
    }

    /// Returns true if leaf rows are visible in the result.
    #[inline]
    pub fn include_leaves(&self) -> bool {
        self.spec.include_leaves
    }

    /// Tests whether a record passes this query's filter.
    pub fn matches(&self, record: &Record) -> bool {
        match &self.spec.filter {
            Some(filter) => filter.test(&RecordView::new(&self.fields, record)),
            None => true,
        }
    }

    /// Canonical serialization of the filter, used as the root row id.
    ///
    /// The unfiltered query serializes as `root` so the id is never empty.
    pub fn filters_as_string(&self) -> String {
        match &self.spec.filter {
            Some(filter) if !filter.is_empty() => filter.canonical(),
            _ => String::from("root"),
        }
    }
}
