//! Incremental aggregation cells.
//!
//! Each aggregate row holds one cell per measure field. A cell maintains
//! enough running state to answer value replacements in O(1); deltas a
//! state cannot absorb (removing the minimum of a range, collapsing a
//! multiple-values group) report `NeedsRecompute`, and the owner recomputes
//! that cell alone from the group's leaf values.

use crate::aggregator::{multiple_values, Aggregator, AggregatorKind, Replace};
use alloc::rc::Rc;
use core::fmt;
use cubist_core::Value;

/// Structural counts of a group, used by the counting aggregators.
#[derive(Clone, Copy, Debug, Default)]
pub struct GroupStats {
    /// Number of direct children of the row.
    pub child_count: usize,
    /// Number of descendant leaves.
    pub leaf_count: usize,
}

/// Outcome of applying a leaf value replacement to a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellChange {
    /// The displayed value did not change.
    Unchanged,
    /// The displayed value changed.
    Changed,
    /// The delta is not decomposable; recompute this cell from leaves.
    NeedsRecompute,
}

/// Running SUM state.
///
/// Integer and float contributions are tracked separately so the result
/// stays an integer when every contribution is one.
#[derive(Clone, Debug, Default)]
pub struct SumCell {
    int_sum: i64,
    float_sum: f64,
    float_count: usize,
}

impl SumCell {
    fn insert(&mut self, value: &Value) {
        match value {
            Value::Int64(v) => self.int_sum += v,
            Value::Float64(v) => {
                self.float_sum += v;
                self.float_count += 1;
            }
            _ => {}
        }
    }

    fn delete(&mut self, value: &Value) {
        match value {
            Value::Int64(v) => self.int_sum -= v,
            Value::Float64(v) => {
                self.float_sum -= v;
                self.float_count -= 1;
            }
            _ => {}
        }
    }

    fn value(&self) -> Value {
        if self.float_count == 0 {
            Value::Int64(self.int_sum)
        } else {
            Value::Float64(self.int_sum as f64 + self.float_sum)
        }
    }
}

/// Running AVG state: sum and count over non-null numeric leaves, so nested
/// averages stay exact over leaves rather than becoming averages of
/// averages.
#[derive(Clone, Debug, Default)]
pub struct AvgCell {
    sum: f64,
    count: i64,
}

impl AvgCell {
    fn insert(&mut self, value: &Value) {
        if let Some(n) = value.as_number() {
            self.sum += n;
            self.count += 1;
        }
    }

    fn delete(&mut self, value: &Value) {
        if let Some(n) = value.as_number() {
            self.sum -= n;
            self.count -= 1;
        }
    }

    fn value(&self) -> Value {
        if self.count == 0 {
            Value::Null
        } else {
            Value::Float64(self.sum / self.count as f64)
        }
    }
}

/// UNIQUE state: the common value (if any), how many non-null leaves carry
/// it, and whether the group has diverged.
#[derive(Clone, Debug, Default)]
pub struct UniqueCell {
    value: Option<Value>,
    count: usize,
    multiple: bool,
}

impl UniqueCell {
    fn recompute<'a>(&mut self, values: impl Iterator<Item = &'a Value>) {
        *self = Self::default();
        for v in values {
            if v.is_null() {
                continue;
            }
            self.count += 1;
            match &self.value {
                None => self.value = Some(v.clone()),
                Some(current) if current == v => {}
                Some(_) => self.multiple = true,
            }
        }
    }

    /// Applies a single leaf's value replacement.
    ///
    /// Returns true when the state can no longer be maintained
    /// incrementally (a removal may collapse a diverged group).
    fn replace(&mut self, old: &Value, new: &Value) -> bool {
        match (old.is_null(), new.is_null()) {
            (true, true) => false,
            (true, false) => {
                if self.multiple {
                    self.count += 1;
                    return false;
                }
                match &self.value {
                    None => {
                        self.value = Some(new.clone());
                        self.count = 1;
                    }
                    Some(current) if current == new => self.count += 1,
                    Some(_) => {
                        self.count += 1;
                        self.multiple = true;
                    }
                }
                false
            }
            // A non-null value leaves the group: the diverged flag and the
            // common value can both be stale now.
            (false, true) => true,
            (false, false) => {
                if old == new {
                    return false;
                }
                if self.multiple {
                    return true;
                }
                match &self.value {
                    Some(current) if current == old && self.count == 1 => {
                        self.value = Some(new.clone());
                        false
                    }
                    Some(current) if current == new => false,
                    Some(_) => {
                        self.multiple = true;
                        false
                    }
                    None => true,
                }
            }
        }
    }

    fn value(&self) -> Value {
        if self.multiple {
            multiple_values()
        } else {
            self.value.clone().unwrap_or(Value::Null)
        }
    }
}

/// RANGE state: running {min, max}.
///
/// Insertions extend the bounds in O(1); deleting a bound poisons the state
/// and forces a recompute, mirroring how incremental MIN/MAX degrade.
#[derive(Clone, Debug, Default)]
pub struct RangeCell {
    min: Option<Value>,
    max: Option<Value>,
}

impl RangeCell {
    fn recompute<'a>(&mut self, values: impl Iterator<Item = &'a Value>) {
        *self = Self::default();
        for v in values {
            if !v.is_null() {
                self.insert(v);
            }
        }
    }

    fn insert(&mut self, value: &Value) {
        match &self.min {
            None => self.min = Some(value.clone()),
            Some(min) if value < min => self.min = Some(value.clone()),
            _ => {}
        }
        match &self.max {
            None => self.max = Some(value.clone()),
            Some(max) if value > max => self.max = Some(value.clone()),
            _ => {}
        }
    }

    /// Returns true if removing this value invalidates a bound.
    fn delete_poisons(&self, value: &Value) -> bool {
        self.min.as_ref() == Some(value) || self.max.as_ref() == Some(value)
    }

    fn value(&self) -> Value {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) => Value::range(min.clone(), max.clone()),
            _ => Value::Null,
        }
    }
}

/// Cell driven by a caller-supplied `Aggregator` strategy.
#[derive(Clone)]
pub struct CustomCell {
    aggregator: Rc<dyn Aggregator>,
    value: Value,
}

impl fmt::Debug for CustomCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomCell").field("value", &self.value).finish()
    }
}

/// One aggregated value, maintained incrementally where the strategy
/// allows.
#[derive(Clone, Debug)]
pub enum AggCell {
    Sum(SumCell),
    Avg(AvgCell),
    Unique(UniqueCell),
    ChildCount(i64),
    LeafCount(i64),
    Range(RangeCell),
    Custom(CustomCell),
}

impl AggCell {
    /// Creates the empty cell for an aggregator kind.
    pub fn for_kind(kind: &AggregatorKind) -> Self {
        match kind {
            AggregatorKind::Sum => AggCell::Sum(SumCell::default()),
            AggregatorKind::Avg => AggCell::Avg(AvgCell::default()),
            AggregatorKind::Unique => AggCell::Unique(UniqueCell::default()),
            AggregatorKind::ChildCount => AggCell::ChildCount(0),
            AggregatorKind::LeafCount => AggCell::LeafCount(0),
            AggregatorKind::Range => AggCell::Range(RangeCell::default()),
            AggregatorKind::Custom(aggregator) => AggCell::Custom(CustomCell {
                aggregator: aggregator.clone(),
                value: Value::Null,
            }),
        }
    }

    /// Fully recomputes the cell from a group's leaf values and structural
    /// counts.
    pub fn recompute<'a, I>(&mut self, values: I, stats: &GroupStats)
    where
        I: Iterator<Item = &'a Value>,
    {
        match self {
            AggCell::Sum(cell) => {
                *cell = SumCell::default();
                for v in values {
                    cell.insert(v);
                }
            }
            AggCell::Avg(cell) => {
                *cell = AvgCell::default();
                for v in values {
                    cell.insert(v);
                }
            }
            AggCell::Unique(cell) => cell.recompute(values),
            AggCell::ChildCount(count) => *count = stats.child_count as i64,
            AggCell::LeafCount(count) => *count = stats.leaf_count as i64,
            AggCell::Range(cell) => cell.recompute(values),
            AggCell::Custom(cell) => {
                let mut values = values;
                cell.value = cell.aggregator.aggregate(&mut values);
            }
        }
    }

    /// Applies a single leaf's value replacement (old -> new).
    ///
    /// Structural counts never change under a value replacement, so the
    /// counting cells are always `Unchanged`.
    pub fn apply_update(&mut self, old: &Value, new: &Value) -> CellChange {
        if old == new {
            return CellChange::Unchanged;
        }
        let before = self.value();
        match self {
            AggCell::Sum(cell) => {
                cell.delete(old);
                cell.insert(new);
            }
            AggCell::Avg(cell) => {
                cell.delete(old);
                cell.insert(new);
            }
            AggCell::Unique(cell) => {
                if cell.replace(old, new) {
                    return CellChange::NeedsRecompute;
                }
            }
            AggCell::ChildCount(_) | AggCell::LeafCount(_) => return CellChange::Unchanged,
            AggCell::Range(cell) => {
                if !old.is_null() && cell.delete_poisons(old) {
                    return CellChange::NeedsRecompute;
                }
                if !new.is_null() {
                    cell.insert(new);
                }
            }
            AggCell::Custom(cell) => {
                let updated = [(old.clone(), new.clone())];
                match cell.aggregator.replace(&cell.value, &[], &[], &updated) {
                    Replace::Updated(value) => cell.value = value,
                    Replace::Unchanged => return CellChange::Unchanged,
                    Replace::Recompute => return CellChange::NeedsRecompute,
                }
            }
        }
        if self.value() == before {
            CellChange::Unchanged
        } else {
            CellChange::Changed
        }
    }

    /// Returns the cell's current aggregated value.
    pub fn value(&self) -> Value {
        match self {
            AggCell::Sum(cell) => cell.value(),
            AggCell::Avg(cell) => cell.value(),
            AggCell::Unique(cell) => cell.value(),
            AggCell::ChildCount(count) => Value::Int64(*count),
            AggCell::LeafCount(count) => Value::Int64(*count),
            AggCell::Range(cell) => cell.value(),
            AggCell::Custom(cell) => cell.value.clone(),
        }
    }
}
