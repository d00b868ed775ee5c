//! Field definitions for the cube.
//!
//! A field is either a dimension (it partitions records into groups) or a
//! measure (it carries a value reduced by an aggregator across a group's
//! members). Fields are immutable once constructed and live in a
//! `FieldSet`, the cube's ordered schema.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use cubist_aggregate::AggregatorKind;
use cubist_core::{DataType, Error, Record, Result, Value};
use cubist_filter::FieldResolver;
use hashbrown::HashMap;

/// The role a field plays in the cube.
#[derive(Clone, Debug)]
pub enum FieldRole {
    /// Partitions records into groups; defines tree levels.
    Dimension,
    /// Carries a value aggregated across a group's members.
    Measure(AggregatorKind),
}

/// A typed column descriptor.
#[derive(Clone, Debug)]
pub struct Field {
    name: String,
    data_type: DataType,
    role: FieldRole,
}

impl Field {
    /// Creates a dimension field.
    pub fn dimension(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            role: FieldRole::Dimension,
        }
    }

    /// Creates a measure field with the given aggregator.
    pub fn measure(name: impl Into<String>, data_type: DataType, kind: AggregatorKind) -> Self {
        Self {
            name: name.into(),
            data_type,
            role: FieldRole::Measure(kind),
        }
    }

    /// Returns the field name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the data type.
    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns the field's role.
    #[inline]
    pub fn role(&self) -> &FieldRole {
        &self.role
    }

    /// Returns true if this field partitions records into groups.
    #[inline]
    pub fn is_dimension(&self) -> bool {
        matches!(self.role, FieldRole::Dimension)
    }

    /// Returns the aggregator for a measure field, None for dimensions.
    pub fn aggregator(&self) -> Option<&AggregatorKind> {
        match &self.role {
            FieldRole::Measure(kind) => Some(kind),
            FieldRole::Dimension => None,
        }
    }
}

/// The cube's ordered field schema with name lookup.
#[derive(Clone, Debug)]
pub struct FieldSet {
    fields: Vec<Field>,
    by_name: HashMap<String, usize>,
    dimensions: Vec<usize>,
    measures: Vec<usize>,
}

impl FieldSet {
    /// Creates a field set, validating names.
    ///
    /// Field names must be non-empty, start with a letter or underscore,
    /// contain only alphanumerics/underscores, and be unique.
    pub fn new(fields: Vec<Field>) -> Result<Self> {
        if fields.is_empty() {
            return Err(Error::invalid_config("a cube needs at least one field"));
        }
        let mut by_name = HashMap::with_capacity(fields.len());
        let mut dimensions = Vec::new();
        let mut measures = Vec::new();
        for (index, field) in fields.iter().enumerate() {
            check_naming_rules(field.name())?;
            if by_name.insert(String::from(field.name()), index).is_some() {
                return Err(Error::invalid_config(format!(
                    "duplicate field: {}",
                    field.name()
                )));
            }
            if field.is_dimension() {
                dimensions.push(index);
            } else {
                measures.push(index);
            }
        }
        Ok(Self {
            fields,
            by_name,
            dimensions,
            measures,
        })
    }

    /// Returns the number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the set has no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the fields in declaration order.
    #[inline]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Gets a field by name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// Gets a field's index by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Gets a field by index.
    pub fn field_at(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Returns the indices of dimension fields, in declaration order.
    #[inline]
    pub fn dimensions(&self) -> &[usize] {
        &self.dimensions
    }

    /// Returns the indices of measure fields, in declaration order.
    #[inline]
    pub fn measures(&self) -> &[usize] {
        &self.measures
    }
}

/// Validates a field name the same way table/column names are checked.
fn check_naming_rules(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_config("field name cannot be empty"));
    }
    let first = name.chars().next().unwrap();
    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(Error::invalid_config(format!(
            "field name must start with letter or underscore: {}",
            name
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::invalid_config(format!(
            "field name contains invalid characters: {}",
            name
        )));
    }
    Ok(())
}

/// Pairs a record with the field schema so filters can read it by name.
///
/// Missing fields resolve to `Value::Null`, never an error.
pub struct RecordView<'a> {
    fields: &'a FieldSet,
    record: &'a Record,
}

impl<'a> RecordView<'a> {
    pub fn new(fields: &'a FieldSet, record: &'a Record) -> Self {
        Self { fields, record }
    }
}

impl FieldResolver for RecordView<'_> {
    fn field_value(&self, field: &str) -> Value {
        match self.fields.index_of(field) {
            Some(index) => self.record.value_or_null(index),
            None => Value::Null,
        }
    }
}
