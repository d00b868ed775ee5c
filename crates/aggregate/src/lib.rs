//! Cubist Aggregate - Aggregation strategies for the Cubist data cube.
//!
//! This crate provides the reduction layer of the cube:
//!
//! - `AggregatorKind`: the built-in strategies (SUM, AVG, UNIQUE,
//!   child-count, leaf-count, RANGE) plus `Custom` for pluggable ones
//! - `Aggregator` / `Replace`: the strategy trait and its incremental
//!   protocol, where `Replace::Recompute` signals a non-decomposable delta
//! - `AggCell`: per-row running aggregation state with an O(1) update path
//!   and a `NeedsRecompute` escape hatch
//!
//! The incremental design follows the usual asymmetry of streaming
//! aggregates: additions always absorb in O(1), while deletions can poison
//! extrema (RANGE) or divergence flags (UNIQUE) and then only a local
//! recompute of the affected cell restores the state.

#![no_std]

extern crate alloc;

mod aggregator;
mod cell;

pub use aggregator::{multiple_values, Aggregator, AggregatorKind, Replace, MULTIPLE_VALUES};
pub use cell::{AggCell, CellChange, GroupStats};
