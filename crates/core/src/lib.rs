//! Cubist Core - Core types for the Cubist data cube.
//!
//! This crate provides the foundational types for the in-memory data cube:
//!
//! - `DataType`: Supported field data types (Boolean, Int64, Float64, String, DateTime, Range)
//! - `Value`: Runtime values held by record fields and aggregated cells
//! - `Record`: A flat record with a stable id
//! - `RecordStore`: The cube's id-keyed record store with deterministic iteration order
//! - `Error`: Error types for cube operations
//!
//! # Example
//!
//! ```rust
//! use cubist_core::{Record, RecordStore, Value};
//!
//! let mut store = RecordStore::new();
//! store.insert(Record::new(1, vec![
//!     Value::String("hardware".into()),
//!     Value::Int64(250),
//! ])).unwrap();
//!
//! assert_eq!(store.len(), 1);
//! assert_eq!(store.get(1).unwrap().get(1), Some(&Value::Int64(250)));
//! ```

#![no_std]

extern crate alloc;

mod error;
pub mod pattern_match;
mod record;
mod store;
mod types;
mod value;

pub use error::{Error, Result};
pub use record::{Record, RecordId};
pub use store::RecordStore;
pub use types::DataType;
pub use value::{RangeValue, Value};
