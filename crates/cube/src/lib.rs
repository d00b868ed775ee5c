//! Cubist Cube - In-memory multidimensional aggregation.
//!
//! Given a flat set of records, a set of dimension fields and an
//! aggregator per measure field, the cube computes a hierarchical tree of
//! aggregate rows and keeps connected views up to date through incremental
//! (delta) updates without discarding unaffected parts of the tree.
//!
//! # Example
//!
//! ```rust
//! use cubist_aggregate::AggregatorKind;
//! use cubist_core::{DataType, Record, Value};
//! use cubist_cube::{Cube, Field, Info, QuerySpec};
//!
//! let mut cube = Cube::builder()
//!     .field(Field::dimension("cat", DataType::String))
//!     .field(Field::measure("amt", DataType::Int64, AggregatorKind::Sum))
//!     .build()
//!     .unwrap();
//!
//! cube.load_data(
//!     vec![
//!         Record::new(1, vec![Value::String("A".into()), Value::Int64(10)]),
//!         Record::new(2, vec![Value::String("A".into()), Value::Int64(20)]),
//!         Record::new(3, vec![Value::String("B".into()), Value::Int64(5)]),
//!     ],
//!     Info::new(),
//! )
//! .unwrap();
//!
//! let rows = cube.execute_query(QuerySpec::new().dimension("cat")).unwrap();
//! assert_eq!(rows.len(), 2);
//! assert_eq!(rows[0].values.get("amt"), Some(&Value::Int64(30)));
//! ```
//!
//! Data flows one way: the application loads records into the cube, views
//! group and aggregate them into row trees, the application reads
//! `view.rows()`. Later deltas pushed through `update_data` reach
//! connected views, which patch only the affected rows.

#![no_std]

extern crate alloc;

mod bucket;
mod change_log;
mod cube;
mod field;
mod query;
mod row;
mod view;

pub use bucket::{BucketSpec, RowPeek};
pub use change_log::{ChangeLog, UpdateOutcome};
pub use cube::{info_from, Cube, CubeBuilder, Info};
pub use field::{Field, FieldRole, FieldSet, RecordView};
pub use query::{Query, QueryOverrides, QuerySpec};
pub use row::{RowNode, ROW_ID_DELIMITER};
pub use view::{UpdateStrategy, View};
