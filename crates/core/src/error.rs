//! Error types for Cubist.

use crate::record::RecordId;
use alloc::string::String;
use core::fmt;

/// Result type alias for Cubist operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for cube operations.
///
/// Configuration errors are raised synchronously at construction time;
/// data-shape problems (missing fields on a record) are not errors and
/// degrade to null values instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A query or filter referenced a field the cube does not declare.
    UnknownField {
        name: String,
    },
    /// A query used a non-dimension field as a grouping dimension.
    NotDimension {
        name: String,
    },
    /// A malformed field filter (bad operator/value combination).
    InvalidFilter {
        field: String,
        message: String,
    },
    /// A record with this id already exists in the store.
    DuplicateRecord {
        id: RecordId,
    },
    /// An update referenced a record id not present in the store.
    MissingRecord {
        id: RecordId,
    },
    /// Invalid cube or query configuration.
    InvalidConfig {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownField { name } => {
                write!(f, "Unknown field: {}", name)
            }
            Error::NotDimension { name } => {
                write!(f, "Field is not a dimension: {}", name)
            }
            Error::InvalidFilter { field, message } => {
                write!(f, "Invalid filter on field {}: {}", field, message)
            }
            Error::DuplicateRecord { id } => {
                write!(f, "Duplicate record id: {}", id)
            }
            Error::MissingRecord { id } => {
                write!(f, "Record not found: {}", id)
            }
            Error::InvalidConfig { message } => {
                write!(f, "Invalid configuration: {}", message)
            }
        }
    }
}

impl Error {
    /// Creates an unknown-field error.
    pub fn unknown_field(name: impl Into<String>) -> Self {
        Error::UnknownField { name: name.into() }
    }

    /// Creates a not-a-dimension error.
    pub fn not_dimension(name: impl Into<String>) -> Self {
        Error::NotDimension { name: name.into() }
    }

    /// Creates an invalid-filter error.
    pub fn invalid_filter(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidFilter {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a duplicate-record error.
    pub fn duplicate_record(id: RecordId) -> Self {
        Error::DuplicateRecord { id }
    }

    /// Creates a missing-record error.
    pub fn missing_record(id: RecordId) -> Self {
        Error::MissingRecord { id }
    }

    /// Creates an invalid-configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Error::InvalidConfig {
            message: message.into(),
        }
    }
}
