//! Views: live query results over a cube.
//!
//! A view owns a validated query, the internal row tree built from the
//! cube's records, and the visible projected rows. Connected views receive
//! change notifications from the cube and choose between a full rebuild
//! and a localized in-place patch.
//!
//! The choice is made by an explicit decision function (`classify`)
//! returning a tagged `UpdateStrategy`, so the two-tier contract stays
//! auditable and independently testable: full rebuild is O(n) in record
//! count, a simple patch is O(depth) per changed leaf.

use crate::bucket::BucketSpec;
use crate::change_log::{ChangeLog, UpdateOutcome};
use crate::cube::Info;
use crate::query::{Query, QuerySpec};
use crate::row::{RowNode, RowTree};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use cubist_core::{Record, RecordId, RecordStore, Result};

/// How a change log can be absorbed by a view.
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateStrategy {
    /// Membership or grouping changed; the whole tree must be rebuilt.
    FullRebuild,
    /// Only measure values of records already in the view changed; carries
    /// the records to patch in place.
    Simple(Vec<Record>),
    /// Nothing in the delta affects this view.
    NoOp,
}

/// A live (or one-shot) query result over a cube's records.
pub struct View {
    query: Query,
    store: Rc<RefCell<RecordStore>>,
    bucket: Option<Rc<dyn BucketSpec>>,
    info: Info,
    tree: RowTree,
    rows: Vec<Rc<RowNode>>,
    connected: bool,
    last_outcome: UpdateOutcome,
}

impl View {
    /// Builds a view over the store's current records.
    pub(crate) fn new(
        query: Query,
        store: Rc<RefCell<RecordStore>>,
        bucket: Option<Rc<dyn BucketSpec>>,
        info: Info,
        connected: bool,
    ) -> Self {
        let tree = {
            let store_ref = store.borrow();
            RowTree::build(&query, store_ref.iter().cloned(), bucket.as_ref())
        };
        let mut view = Self {
            query,
            store,
            bucket,
            info,
            tree,
            rows: Vec::new(),
            connected,
            last_outcome: UpdateOutcome::NoOp,
        };
        view.rows = view.tree.visible_rows(&view.query);
        view
    }

    /// The visible hierarchical rows.
    #[inline]
    pub fn rows(&self) -> &[Rc<RowNode>] {
        &self.rows
    }

    /// The active query.
    #[inline]
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// The cube info snapshot taken at the last (re)build or update.
    #[inline]
    pub fn info(&self) -> &Info {
        &self.info
    }

    /// How the last cube update was absorbed.
    #[inline]
    pub fn last_outcome(&self) -> &UpdateOutcome {
        &self.last_outcome
    }

    /// Returns true while the view is registered for live updates.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Stops live updates; the cube drops the view at its next dispatch.
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Number of records passing the view's filter.
    #[inline]
    pub fn leaf_count(&self) -> usize {
        self.tree.leaf_count()
    }

    /// Returns true if the record is in the view's filtered set.
    #[inline]
    pub fn contains_record(&self, id: RecordId) -> bool {
        self.tree.contains_record(id)
    }

    /// Record ids in the view's filtered set (unordered).
    pub fn leaf_ids(&self) -> Vec<RecordId> {
        self.tree.record_ids()
    }

    /// Projects a single leaf row by record id.
    ///
    /// The leaf network is always addressable here even when leaves are
    /// not part of the visible tree.
    pub fn leaf_row(&mut self, id: RecordId) -> Option<Rc<RowNode>> {
        self.tree.leaf_projection(id, &self.query)
    }

    /// Replaces the query and rebuilds.
    pub fn update_query(&mut self, spec: QuerySpec) -> Result<()> {
        self.query = Query::new(self.query.fields().clone(), spec)?;
        self.rebuild();
        self.last_outcome = UpdateOutcome::Rebuilt;
        Ok(())
    }

    /// Cube notification: the record store was reloaded wholesale.
    pub fn note_cube_loaded(&mut self, info: Info) {
        self.info = info;
        self.rebuild();
        self.last_outcome = UpdateOutcome::Rebuilt;
    }

    /// Cube notification: an incremental delta was applied.
    pub fn note_cube_updated(&mut self, changes: &ChangeLog, info: Info) -> UpdateOutcome {
        self.info = info;
        let outcome = match self.classify(changes) {
            UpdateStrategy::FullRebuild => {
                self.rebuild();
                UpdateOutcome::Rebuilt
            }
            UpdateStrategy::Simple(records) => {
                let changed_rows = self.tree.apply_simple_updates(&records, &self.query);
                self.rows = self.tree.visible_rows(&self.query);
                UpdateOutcome::Patched { changed_rows }
            }
            UpdateStrategy::NoOp => UpdateOutcome::NoOp,
        };
        self.last_outcome = outcome.clone();
        outcome
    }

    /// Decides how a change log can be absorbed, without side effects.
    ///
    /// A delta is "simple" only if no record enters or leaves the filtered
    /// set and no update moves a record to a different group:
    /// - any add/remove forces a rebuild, unless a filter excludes it
    ///   entirely (an add that fails the filter, a removed id not in the
    ///   leaf map);
    /// - an update whose filter pass/fail state flips forces a rebuild;
    /// - an update changing any of the query's dimension values forces a
    ///   rebuild;
    /// - updates staying outside the filtered set are ignored.
    pub fn classify(&self, changes: &ChangeLog) -> UpdateStrategy {
        let has_filter = self.query.has_filter();

        for record in &changes.add {
            if !has_filter || self.query.matches(record) {
                return UpdateStrategy::FullRebuild;
            }
        }
        for &id in &changes.remove {
            if !has_filter || self.tree.contains_record(id) {
                return UpdateStrategy::FullRebuild;
            }
        }

        let mut simple: Vec<Record> = Vec::new();
        for record in &changes.update {
            let was_in = self.tree.contains_record(record.id());
            let now_in = !has_filter || self.query.matches(record);
            if !has_filter && !was_in {
                // An unfiltered view should know every record; treat the
                // inconsistency as a rebuild rather than dropping data.
                log::warn!(
                    "update for record {} unknown to unfiltered view; rebuilding",
                    record.id()
                );
                return UpdateStrategy::FullRebuild;
            }
            if was_in != now_in {
                return UpdateStrategy::FullRebuild;
            }
            if !now_in {
                continue;
            }
            if let Some(old) = self.tree.leaf_record(record.id()) {
                let moved = self
                    .query
                    .dimension_indices()
                    .iter()
                    .any(|&d| old.value_or_null(d) != record.value_or_null(d));
                if moved {
                    return UpdateStrategy::FullRebuild;
                }
                if *old != *record {
                    simple.push(record.clone());
                }
            }
        }

        if simple.is_empty() {
            UpdateStrategy::NoOp
        } else {
            UpdateStrategy::Simple(simple)
        }
    }

    /// Consumes the view, returning its visible rows.
    pub(crate) fn into_rows(self) -> Vec<Rc<RowNode>> {
        self.rows
    }

    fn rebuild(&mut self) {
        let tree = {
            let store = self.store.borrow();
            RowTree::build(&self.query, store.iter().cloned(), self.bucket.as_ref())
        };
        self.tree = tree;
        self.rows = self.tree.visible_rows(&self.query);
    }
}
