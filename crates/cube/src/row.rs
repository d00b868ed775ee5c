//! The row tree.
//!
//! Grouping produces two parallel representations. Internally, rows live
//! in a slab of `RowSlot`s carrying parent/child links and per-measure
//! aggregation cells, which is what the incremental patch path walks.
//! Externally, each row projects to a plain, acyclic `RowNode` snapshot;
//! projections are cached per slot and regenerated only for touched
//! subtrees, so an untouched subtree keeps its `Rc` identity across a
//! simple update.
//!
//! Row ids are an external contract: `{parent_id}>>{selector}` where the
//! selector is the canonical field-filter string for the row's slice
//! (`cat=A` for aggregates, `id=7` for leaves, `bucket=Other` for bucket
//! rows) and the root id is the query's serialized filter. Identical
//! queries therefore produce identical ids across rebuilds.

use crate::bucket::{BucketSpec, RowPeek};
use crate::field::{FieldRole, FieldSet};
use crate::query::Query;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use cubist_aggregate::{AggCell, CellChange, GroupStats};
use cubist_core::{Record, RecordId, Value};
use hashbrown::{HashMap, HashSet};
use serde::Serialize;

/// Separator between row id segments.
///
/// Two characters chosen to be extremely unlikely to collide with user
/// data; consumers may persist and compare full ids.
pub const ROW_ID_DELIMITER: &str = ">>";

/// A plain, JSON-serializable row in a view's result tree.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RowNode {
    /// Globally unique row id (see `ROW_ID_DELIMITER`).
    pub id: String,
    /// Display label: the dimension value, bucket label, or "Total".
    pub label: Value,
    /// Name of the dimension this row groups by, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    /// Aggregated measure values (and the dimension's own value), by name.
    pub values: BTreeMap<String, Value>,
    /// Visible child rows.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Rc<RowNode>>,
}

pub(crate) type SlotIdx = usize;

/// Internal row variants. The set is closed: every consumer matches
/// exhaustively.
#[derive(Clone, Debug)]
pub(crate) enum RowKind {
    /// Wraps exactly one source record.
    Leaf { record: Record },
    /// A group of rows sharing a dimension value; `dimension` is None for
    /// the synthetic root.
    Aggregate {
        dimension: Option<usize>,
        value: Value,
    },
    /// A synthetic post-grouping bucket (e.g. "Other").
    Bucket { label: String },
}

#[derive(Clone, Debug)]
pub(crate) struct RowSlot {
    pub id: String,
    pub parent: Option<SlotIdx>,
    pub kind: RowKind,
    pub children: Vec<SlotIdx>,
    /// One cell per measure field, in `FieldSet::measures()` order.
    /// Empty for leaves.
    pub cells: Vec<AggCell>,
    pub leaf_count: usize,
    pub projection: Option<Rc<RowNode>>,
}

/// The internal linked row network for one view.
#[derive(Clone, Debug)]
pub(crate) struct RowTree {
    slots: Vec<RowSlot>,
    root: SlotIdx,
    /// Record id -> leaf slot, for every record passing the filter.
    leaf_map: HashMap<RecordId, SlotIdx>,
}

impl RowTree {
    /// Builds the full tree for a query over the given records.
    pub fn build(
        query: &Query,
        records: impl Iterator<Item = Record>,
        bucket: Option<&Rc<dyn BucketSpec>>,
    ) -> Self {
        let mut tree = RowTree {
            slots: Vec::new(),
            root: 0,
            leaf_map: HashMap::new(),
        };
        tree.push(RowSlot {
            id: query.filters_as_string(),
            parent: None,
            kind: RowKind::Aggregate {
                dimension: None,
                value: Value::String("Total".into()),
            },
            children: Vec::new(),
            cells: Vec::new(),
            leaf_count: 0,
            projection: None,
        });

        // Filter pass: only records passing the query's filter enter the
        // tree (all of them when there is no filter).
        let members: Vec<Record> = records.filter(|r| query.matches(r)).collect();
        tree.build_group(tree.root, members, query.dimension_indices(), 0, query, bucket);
        tree
    }

    fn push(&mut self, slot: RowSlot) -> SlotIdx {
        self.slots.push(slot);
        self.slots.len() - 1
    }

    /// Group pass: attaches children for one grouping level, recursing
    /// through the remaining dimensions, then computes the parent's cells.
    fn build_group(
        &mut self,
        parent: SlotIdx,
        members: Vec<Record>,
        dims: &[usize],
        depth: usize,
        query: &Query,
        bucket: Option<&Rc<dyn BucketSpec>>,
    ) {
        if !members.is_empty() {
            if dims.is_empty() {
                self.build_leaves(parent, &members, depth, query, bucket);
            } else {
                self.build_partitions(parent, &members, dims, depth, query, bucket);
            }
        }
        self.compute_cells(parent, &members, query);
    }

    /// Deepest level: members become leaf rows.
    fn build_leaves(
        &mut self,
        parent: SlotIdx,
        members: &[Record],
        depth: usize,
        query: &Query,
        bucket: Option<&Rc<dyn BucketSpec>>,
    ) {
        let spec = bucket.filter(|s| s.applies_to_level(depth, None));
        let Some(spec) = spec else {
            for record in members {
                self.make_leaf(parent, record);
            }
            return;
        };

        let mut bucket_order: Vec<Value> = Vec::new();
        let mut buckets: HashMap<Value, Vec<&Record>> = HashMap::new();
        for record in members {
            let peek = leaf_peek(query.fields(), record);
            match spec.bucket_for(&peek) {
                None => {
                    self.make_leaf(parent, record);
                }
                Some(bv) => {
                    if !buckets.contains_key(&bv) {
                        bucket_order.push(bv.clone());
                    }
                    buckets.entry(bv).or_default().push(record);
                }
            }
        }
        for bv in bucket_order {
            let bucket_members = buckets.remove(&bv).unwrap_or_default();
            let bidx = self.make_bucket(parent, &bv, spec.label_for(&bv));
            let owned: Vec<Record> = bucket_members.iter().map(|r| (*r).clone()).collect();
            for record in &owned {
                self.make_leaf(bidx, record);
            }
            self.compute_cells(bidx, &owned, query);
        }
    }

    /// One dimension level: partition members by the dimension value in
    /// first-encounter order, run the optional bucket pass, recurse.
    fn build_partitions(
        &mut self,
        parent: SlotIdx,
        members: &[Record],
        dims: &[usize],
        depth: usize,
        query: &Query,
        bucket: Option<&Rc<dyn BucketSpec>>,
    ) {
        let dim = dims[0];
        let rest = &dims[1..];

        let mut order: Vec<Value> = Vec::new();
        let mut groups: HashMap<Value, Vec<Record>> = HashMap::new();
        for record in members {
            // A record missing the dimension groups under Null, never
            // silently dropped.
            let key = record.value_or_null(dim);
            if !groups.contains_key(&key) {
                order.push(key.clone());
            }
            groups.entry(key).or_default().push(record.clone());
        }

        let dim_field = query.fields().field_at(dim);
        let spec = bucket.filter(|s| s.applies_to_level(depth, dim_field));
        let Some(spec) = spec else {
            for key in order {
                let group = groups.remove(&key).unwrap_or_default();
                self.make_aggregate(parent, dim, key, group, rest, depth, query, bucket);
            }
            return;
        };

        let mut passthrough: Vec<(Value, Vec<Record>)> = Vec::new();
        let mut bucket_order: Vec<Value> = Vec::new();
        let mut buckets: HashMap<Value, Vec<(Value, Vec<Record>)>> = HashMap::new();
        for key in order {
            let group = groups.remove(&key).unwrap_or_default();
            let peek = group_peek(query.fields(), &key, &group);
            match spec.bucket_for(&peek) {
                None => passthrough.push((key, group)),
                Some(bv) => {
                    if !buckets.contains_key(&bv) {
                        bucket_order.push(bv.clone());
                    }
                    buckets.entry(bv).or_default().push((key, group));
                }
            }
        }
        for (key, group) in passthrough {
            self.make_aggregate(parent, dim, key, group, rest, depth, query, bucket);
        }
        for bv in bucket_order {
            let parts = buckets.remove(&bv).unwrap_or_default();
            let bidx = self.make_bucket(parent, &bv, spec.label_for(&bv));
            let mut all: Vec<Record> = Vec::new();
            for (key, group) in parts {
                all.extend(group.iter().cloned());
                self.make_aggregate(bidx, dim, key, group, rest, depth, query, bucket);
            }
            self.compute_cells(bidx, &all, query);
        }
    }

    fn make_leaf(&mut self, parent: SlotIdx, record: &Record) -> SlotIdx {
        let id = format!(
            "{}{}id={}",
            self.slots[parent].id,
            ROW_ID_DELIMITER,
            record.id()
        );
        let idx = self.push(RowSlot {
            id,
            parent: Some(parent),
            kind: RowKind::Leaf {
                record: record.clone(),
            },
            children: Vec::new(),
            cells: Vec::new(),
            leaf_count: 1,
            projection: None,
        });
        self.leaf_map.insert(record.id(), idx);
        self.slots[parent].children.push(idx);
        idx
    }

    fn make_bucket(&mut self, parent: SlotIdx, value: &Value, label: String) -> SlotIdx {
        let id = format!(
            "{}{}bucket={}",
            self.slots[parent].id,
            ROW_ID_DELIMITER,
            value
        );
        let idx = self.push(RowSlot {
            id,
            parent: Some(parent),
            kind: RowKind::Bucket { label },
            children: Vec::new(),
            cells: Vec::new(),
            leaf_count: 0,
            projection: None,
        });
        self.slots[parent].children.push(idx);
        idx
    }

    #[allow(clippy::too_many_arguments)]
    fn make_aggregate(
        &mut self,
        parent: SlotIdx,
        dim: usize,
        value: Value,
        group: Vec<Record>,
        rest: &[usize],
        depth: usize,
        query: &Query,
        bucket: Option<&Rc<dyn BucketSpec>>,
    ) {
        let name = query.fields().fields()[dim].name();
        let id = format!(
            "{}{}{}={}",
            self.slots[parent].id,
            ROW_ID_DELIMITER,
            name,
            value
        );
        let idx = self.push(RowSlot {
            id,
            parent: Some(parent),
            kind: RowKind::Aggregate {
                dimension: Some(dim),
                value,
            },
            children: Vec::new(),
            cells: Vec::new(),
            leaf_count: 0,
            projection: None,
        });
        self.slots[parent].children.push(idx);
        self.build_group(idx, group, rest, depth + 1, query, bucket);
    }

    /// Recomputes a slot's cells from its member records.
    fn compute_cells(&mut self, slot: SlotIdx, members: &[Record], query: &Query) {
        let fields = query.fields();
        let stats = GroupStats {
            child_count: self.slots[slot].children.len(),
            leaf_count: members.len(),
        };
        let mut cells = Vec::with_capacity(fields.measures().len());
        for &fidx in fields.measures() {
            if let FieldRole::Measure(kind) = fields.fields()[fidx].role() {
                let mut cell = AggCell::for_kind(kind);
                let values: Vec<Value> = members.iter().map(|r| r.value_or_null(fidx)).collect();
                cell.recompute(values.iter(), &stats);
                cells.push(cell);
            }
        }
        self.slots[slot].cells = cells;
        self.slots[slot].leaf_count = members.len();
    }

    /// Returns the projected top-level rows for the query's shape flags.
    pub fn visible_rows(&mut self, query: &Query) -> Vec<Rc<RowNode>> {
        if query.include_root() {
            return alloc::vec![self.projection(self.root, query)];
        }
        let children = self.slots[self.root].children.clone();
        let mut rows = Vec::new();
        for child in children {
            let is_leaf = matches!(self.slots[child].kind, RowKind::Leaf { .. });
            if is_leaf && !query.include_leaves() {
                continue;
            }
            rows.push(self.projection(child, query));
        }
        rows
    }

    /// Projects a slot to its plain snapshot, reusing cached subtrees.
    fn projection(&mut self, idx: SlotIdx, query: &Query) -> Rc<RowNode> {
        if let Some(node) = &self.slots[idx].projection {
            return node.clone();
        }
        let child_idxs = self.slots[idx].children.clone();
        let mut children = Vec::new();
        for child in child_idxs {
            let is_leaf = matches!(self.slots[child].kind, RowKind::Leaf { .. });
            if is_leaf && !query.include_leaves() {
                continue;
            }
            children.push(self.projection(child, query));
        }

        let fields = query.fields();
        let slot = &self.slots[idx];
        let node = match &slot.kind {
            RowKind::Leaf { record } => {
                let mut values = BTreeMap::new();
                for (i, field) in fields.fields().iter().enumerate() {
                    values.insert(field.name().to_string(), record.value_or_null(i));
                }
                RowNode {
                    id: slot.id.clone(),
                    label: Value::Null,
                    dimension: None,
                    values,
                    children,
                }
            }
            RowKind::Aggregate { dimension, value } => {
                let mut values = self.measure_values(idx, fields);
                let dimension_name =
                    dimension.map(|d| fields.fields()[d].name().to_string());
                if let Some(name) = &dimension_name {
                    values.insert(name.clone(), value.clone());
                }
                RowNode {
                    id: slot.id.clone(),
                    label: value.clone(),
                    dimension: dimension_name,
                    values,
                    children,
                }
            }
            RowKind::Bucket { label } => RowNode {
                id: slot.id.clone(),
                label: Value::String(label.clone()),
                dimension: None,
                values: self.measure_values(idx, fields),
                children,
            },
        };
        let node = Rc::new(node);
        self.slots[idx].projection = Some(node.clone());
        node
    }

    fn measure_values(&self, idx: SlotIdx, fields: &FieldSet) -> BTreeMap<String, Value> {
        let mut values = BTreeMap::new();
        for (pos, &fidx) in fields.measures().iter().enumerate() {
            if let Some(cell) = self.slots[idx].cells.get(pos) {
                values.insert(fields.fields()[fidx].name().to_string(), cell.value());
            }
        }
        values
    }

    /// Returns the stored record for a leaf, if the record is in the view.
    pub fn leaf_record(&self, id: RecordId) -> Option<&Record> {
        let idx = *self.leaf_map.get(&id)?;
        match &self.slots[idx].kind {
            RowKind::Leaf { record } => Some(record),
            _ => None,
        }
    }

    /// Returns true if the record passed the filter at the last build.
    #[inline]
    pub fn contains_record(&self, id: RecordId) -> bool {
        self.leaf_map.contains_key(&id)
    }

    /// Number of records in the view's filtered set.
    #[inline]
    pub fn leaf_count(&self) -> usize {
        self.leaf_map.len()
    }

    /// Record ids in the view's filtered set, in arbitrary order.
    pub fn record_ids(&self) -> Vec<RecordId> {
        self.leaf_map.keys().copied().collect()
    }

    /// Projects a single leaf row by record id.
    pub fn leaf_projection(&mut self, id: RecordId, query: &Query) -> Option<Rc<RowNode>> {
        let idx = *self.leaf_map.get(&id)?;
        Some(self.projection(idx, query))
    }

    /// Applies simple (in-place) record updates, walking each changed
    /// leaf's ancestor chain and patching aggregation cells.
    ///
    /// Returns the sorted ids of visible rows whose displayed values
    /// changed.
    pub fn apply_simple_updates(&mut self, updates: &[Record], query: &Query) -> Vec<String> {
        let fields = query.fields();
        let measures: Vec<usize> = fields.measures().to_vec();
        let mut changed: HashSet<SlotIdx> = HashSet::new();

        for new_record in updates {
            let Some(leaf_idx) = self.leaf_map.get(&new_record.id()).copied() else {
                continue;
            };
            let old_record = match &mut self.slots[leaf_idx].kind {
                RowKind::Leaf { record } => core::mem::replace(record, new_record.clone()),
                _ => continue,
            };
            if old_record != *new_record {
                changed.insert(leaf_idx);
            }

            for (pos, &fidx) in measures.iter().enumerate() {
                let old_value = old_record.value_or_null(fidx);
                let new_value = new_record.value_or_null(fidx);
                if old_value == new_value {
                    continue;
                }
                // The delta applies at every ancestor independently.
                let mut cursor = self.slots[leaf_idx].parent;
                while let Some(idx) = cursor {
                    match self.slots[idx].cells[pos].apply_update(&old_value, &new_value) {
                        CellChange::Changed => {
                            changed.insert(idx);
                        }
                        CellChange::NeedsRecompute => {
                            if self.recompute_cell(idx, pos, fidx) {
                                changed.insert(idx);
                            }
                        }
                        CellChange::Unchanged => {}
                    }
                    cursor = self.slots[idx].parent;
                }
            }
        }

        self.invalidate_and_collect(&changed, query)
    }

    /// Recomputes one cell from the slot's descendant leaf values.
    /// Returns true if the displayed value changed.
    fn recompute_cell(&mut self, idx: SlotIdx, pos: usize, fidx: usize) -> bool {
        let mut values: Vec<Value> = Vec::new();
        self.collect_leaf_values(idx, fidx, &mut values);
        let stats = GroupStats {
            child_count: self.slots[idx].children.len(),
            leaf_count: self.slots[idx].leaf_count,
        };
        let before = self.slots[idx].cells[pos].value();
        self.slots[idx].cells[pos].recompute(values.iter(), &stats);
        self.slots[idx].cells[pos].value() != before
    }

    fn collect_leaf_values(&self, idx: SlotIdx, fidx: usize, out: &mut Vec<Value>) {
        match &self.slots[idx].kind {
            RowKind::Leaf { record } => out.push(record.value_or_null(fidx)),
            _ => {
                for &child in &self.slots[idx].children {
                    self.collect_leaf_values(child, fidx, out);
                }
            }
        }
    }

    /// Drops stale projections (touched rows and their ancestors) and
    /// returns the visible changed row ids.
    fn invalidate_and_collect(
        &mut self,
        changed: &HashSet<SlotIdx>,
        query: &Query,
    ) -> Vec<String> {
        let include_leaves = query.include_leaves();
        let mut to_clear: HashSet<SlotIdx> = changed.clone();
        let mut changed_ids: Vec<String> = Vec::new();

        for &idx in changed {
            let is_leaf = matches!(self.slots[idx].kind, RowKind::Leaf { .. });
            let visible = if is_leaf {
                include_leaves
            } else {
                idx != self.root || query.include_root()
            };
            if visible {
                changed_ids.push(self.slots[idx].id.clone());
            }
            if is_leaf && !include_leaves {
                // The change is invisible; the cached projection is stale
                // but nothing above needs to regenerate for it.
                continue;
            }
            let mut cursor = self.slots[idx].parent;
            while let Some(parent) = cursor {
                if !to_clear.insert(parent) {
                    break;
                }
                cursor = self.slots[parent].parent;
            }
        }
        for idx in to_clear {
            self.slots[idx].projection = None;
        }
        changed_ids.sort_unstable();
        changed_ids
    }
}

/// Builds a bucket-pass candidate for a single leaf record.
fn leaf_peek(fields: &FieldSet, record: &Record) -> RowPeek {
    let mut values = BTreeMap::new();
    for (i, field) in fields.fields().iter().enumerate() {
        values.insert(field.name().to_string(), record.value_or_null(i));
    }
    RowPeek::new(Value::Null, 1, true, values)
}

/// Builds a bucket-pass candidate for a prospective dimension group,
/// aggregating its measures ahead of slot construction.
fn group_peek(fields: &FieldSet, key: &Value, group: &[Record]) -> RowPeek {
    let stats = GroupStats {
        child_count: group.len(),
        leaf_count: group.len(),
    };
    let mut values = BTreeMap::new();
    for &fidx in fields.measures() {
        if let FieldRole::Measure(kind) = fields.fields()[fidx].role() {
            let mut cell = AggCell::for_kind(kind);
            let cell_values: Vec<Value> = group.iter().map(|r| r.value_or_null(fidx)).collect();
            cell.recompute(cell_values.iter(), &stats);
            values.insert(fields.fields()[fidx].name().to_string(), cell.value());
        }
    }
    RowPeek::new(key.clone(), group.len(), false, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field, FieldSet};
    use crate::query::QuerySpec;
    use alloc::vec;
    use cubist_aggregate::AggregatorKind;
    use cubist_core::DataType;

    fn fields() -> Rc<FieldSet> {
        Rc::new(
            FieldSet::new(vec![
                Field::dimension("cat", DataType::String),
                Field::measure("amt", DataType::Int64, AggregatorKind::Sum),
            ])
            .unwrap(),
        )
    }

    fn make_record(id: u64, cat: &str, amt: i64) -> Record {
        Record::new(id, vec![Value::String(cat.into()), Value::Int64(amt)])
    }

    fn sample_records() -> Vec<Record> {
        vec![
            make_record(1, "A", 10),
            make_record(2, "A", 20),
            make_record(3, "B", 5),
        ]
    }

    fn build(spec: QuerySpec) -> (Query, RowTree) {
        let query = Query::new(fields(), spec).unwrap();
        let tree = RowTree::build(&query, sample_records().into_iter(), None);
        (query, tree)
    }

    #[test]
    fn test_grouping_and_sums() {
        let (query, mut tree) = build(QuerySpec::new().dimension("cat"));
        let rows = tree.visible_rows(&query);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, Value::String("A".into()));
        assert_eq!(rows[0].values.get("amt"), Some(&Value::Int64(30)));
        assert_eq!(rows[1].label, Value::String("B".into()));
        assert_eq!(rows[1].values.get("amt"), Some(&Value::Int64(5)));
        // leaves hidden by default
        assert!(rows[0].children.is_empty());
    }

    #[test]
    fn test_row_ids_follow_parent_chain() {
        let (query, mut tree) = build(
            QuerySpec::new()
                .dimension("cat")
                .include_leaves(true),
        );
        let rows = tree.visible_rows(&query);

        assert_eq!(rows[0].id, "root>>cat=A");
        assert_eq!(rows[0].children[0].id, "root>>cat=A>>id=1");
        assert_eq!(rows[1].id, "root>>cat=B");
    }

    #[test]
    fn test_include_root_wraps_total() {
        let (query, mut tree) = build(QuerySpec::new().dimension("cat").include_root(true));
        let rows = tree.visible_rows(&query);

        assert_eq!(rows.len(), 1);
        let root = &rows[0];
        assert_eq!(root.id, "root");
        assert_eq!(root.label, Value::String("Total".into()));
        assert_eq!(root.values.get("amt"), Some(&Value::Int64(35)));
        assert_eq!(root.children.len(), 2);
    }

    #[test]
    fn test_degenerate_query_is_empty() {
        let (query, mut tree) = build(QuerySpec::new());
        assert!(tree.visible_rows(&query).is_empty());
        // the leaf network still exists internally
        assert_eq!(tree.leaf_count(), 3);
    }

    #[test]
    fn test_leaves_only() {
        let (query, mut tree) = build(QuerySpec::new().include_leaves(true));
        let rows = tree.visible_rows(&query);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].values.get("cat"), Some(&Value::String("A".into())));
    }

    #[test]
    fn test_missing_dimension_groups_under_null() {
        let query = Query::new(fields(), QuerySpec::new().dimension("cat")).unwrap();
        let records = vec![
            make_record(1, "A", 10),
            Record::new(2, vec![]), // no fields at all
        ];
        let mut tree = RowTree::build(&query, records.into_iter(), None);
        let rows = tree.visible_rows(&query);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].label, Value::Null);
        assert_eq!(rows[1].values.get("amt"), Some(&Value::Int64(0)));
    }

    #[test]
    fn test_simple_update_patches_ancestors() {
        let (query, mut tree) = build(QuerySpec::new().dimension("cat"));
        let _ = tree.visible_rows(&query);

        let changed = tree.apply_simple_updates(&[make_record(1, "A", 15)], &query);
        assert_eq!(changed, vec![String::from("root>>cat=A")]);

        let rows = tree.visible_rows(&query);
        assert_eq!(rows[0].values.get("amt"), Some(&Value::Int64(35)));
        assert_eq!(rows[1].values.get("amt"), Some(&Value::Int64(5)));
    }

    #[test]
    fn test_simple_update_keeps_untouched_subtree_identity() {
        let (query, mut tree) = build(QuerySpec::new().dimension("cat"));
        let before = tree.visible_rows(&query);

        tree.apply_simple_updates(&[make_record(1, "A", 15)], &query);
        let after = tree.visible_rows(&query);

        // cat=A regenerated, cat=B reused
        assert!(!Rc::ptr_eq(&before[0], &after[0]));
        assert!(Rc::ptr_eq(&before[1], &after[1]));
    }

    #[test]
    fn test_update_without_visible_change_is_silent() {
        let (query, mut tree) = build(QuerySpec::new().dimension("cat"));
        let _ = tree.visible_rows(&query);

        // replace with identical data
        let changed = tree.apply_simple_updates(&[make_record(1, "A", 10)], &query);
        assert!(changed.is_empty());
    }

    #[test]
    fn test_bucket_pass_groups_small_groups() {
        struct Other;
        impl BucketSpec for Other {
            fn name(&self) -> &str {
                "other"
            }
            fn bucket_for(&self, row: &RowPeek) -> Option<Value> {
                (!row.is_leaf && row.leaf_count < 2).then(|| Value::String("Other".into()))
            }
            fn applies_to_level(&self, depth: usize, _dim: Option<&Field>) -> bool {
                depth == 0
            }
        }

        let query = Query::new(fields(), QuerySpec::new().dimension("cat")).unwrap();
        let spec: Rc<dyn BucketSpec> = Rc::new(Other);
        let mut tree = RowTree::build(&query, sample_records().into_iter(), Some(&spec));
        let rows = tree.visible_rows(&query);

        // cat=A passes through, cat=B lands in the Other bucket
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "root>>cat=A");
        assert_eq!(rows[1].id, "root>>bucket=Other");
        assert_eq!(rows[1].label, Value::String("Other".into()));
        assert_eq!(rows[1].values.get("amt"), Some(&Value::Int64(5)));
        assert_eq!(rows[1].children[0].id, "root>>bucket=Other>>cat=B");
    }

    #[test]
    fn test_all_row_ids_distinct() {
        let (query, mut tree) = build(
            QuerySpec::new()
                .dimension("cat")
                .include_root(true)
                .include_leaves(true),
        );
        let rows = tree.visible_rows(&query);

        let mut ids = Vec::new();
        fn walk(node: &RowNode, ids: &mut Vec<String>) {
            ids.push(node.id.clone());
            for child in &node.children {
                walk(child, ids);
            }
        }
        for row in &rows {
            walk(row, &mut ids);
        }
        let unique: HashSet<String> = ids.iter().cloned().collect();
        assert_eq!(unique.len(), ids.len());
    }
}
