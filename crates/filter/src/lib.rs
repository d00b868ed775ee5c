//! Cubist Filter - Filter predicates for the Cubist data cube.
//!
//! This crate provides composable boolean tests over record field values:
//!
//! - `FilterOp`: the operator set (`=`, `!=`, `>`, `>=`, `<`, `<=`, `like`)
//! - `FieldFilter`: a single field/op/value clause, validated at construction
//! - `Filter`: an AND-composite of clauses with a canonical string form
//! - `FieldResolver`: the seam through which filters read record values
//!
//! Canonical filter strings are a load-bearing contract: they become part of
//! row ids, so two filters built from the same clauses (in any order) always
//! serialize identically.

#![no_std]

extern crate alloc;

mod field_filter;
mod filter;

pub use field_filter::{FieldFilter, FilterOp};
pub use filter::{FieldResolver, Filter};
