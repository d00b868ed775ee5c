//! The cube: canonical record store, metadata, and connected views.
//!
//! The cube is the sole mutator of its record store. Views hold a shared
//! read handle to the store; the cube holds only weak back-references to
//! connected views and never owns them, so view lifecycle stays entirely
//! with the application. Dead or disconnected references are pruned at
//! each dispatch.

use crate::bucket::BucketSpec;
use crate::change_log::ChangeLog;
use crate::field::{Field, FieldSet};
use crate::query::{Query, QuerySpec};
use crate::row::RowNode;
use crate::view::View;
use alloc::collections::BTreeMap;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use cubist_core::{Error, Record, RecordStore, Result, Value};
use hashbrown::HashSet;

/// Cube metadata, replaced atomically on load and merged on update.
pub type Info = BTreeMap<String, Value>;

/// Builder for a cube.
pub struct CubeBuilder {
    fields: Vec<Field>,
    bucket: Option<Rc<dyn BucketSpec>>,
}

impl CubeBuilder {
    fn new() -> Self {
        Self {
            fields: Vec::new(),
            bucket: None,
        }
    }

    /// Adds a field.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds several fields.
    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Configures a bucketing strategy, applied at each grouping level.
    pub fn bucket_spec(mut self, spec: Rc<dyn BucketSpec>) -> Self {
        self.bucket = Some(spec);
        self
    }

    /// Validates the field set and builds the cube.
    pub fn build(self) -> Result<Cube> {
        Ok(Cube {
            fields: Rc::new(FieldSet::new(self.fields)?),
            store: Rc::new(RefCell::new(RecordStore::new())),
            info: Info::new(),
            bucket: self.bucket,
            views: Vec::new(),
        })
    }
}

/// An in-memory data cube.
pub struct Cube {
    fields: Rc<FieldSet>,
    store: Rc<RefCell<RecordStore>>,
    info: Info,
    bucket: Option<Rc<dyn BucketSpec>>,
    /// Weak back-references to connected views; not owned.
    views: Vec<Weak<RefCell<View>>>,
}

impl Cube {
    /// Starts building a cube.
    pub fn builder() -> CubeBuilder {
        CubeBuilder::new()
    }

    /// The cube's field schema.
    #[inline]
    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Current metadata.
    #[inline]
    pub fn info(&self) -> &Info {
        &self.info
    }

    /// Number of records in the store.
    pub fn record_count(&self) -> usize {
        self.store.borrow().len()
    }

    /// Number of currently connected (live) views.
    pub fn connected_view_count(&self) -> usize {
        self.views
            .iter()
            .filter(|w| {
                w.upgrade()
                    .map(|v| v.borrow().is_connected())
                    .unwrap_or(false)
            })
            .count()
    }

    /// Replaces the entire record store and metadata, then notifies every
    /// connected view of the reload.
    ///
    /// Validation happens before anything is committed: a failed load
    /// leaves store, info and views untouched.
    pub fn load_data(&mut self, records: Vec<Record>, info: Info) -> Result<()> {
        self.store.borrow_mut().replace_all(records)?;
        self.info = info;

        self.prune_views();
        let views = self.views.clone();
        for weak in views {
            if let Some(view) = weak.upgrade() {
                // Guard: skip views disconnected since the last dispatch.
                if view.borrow().is_connected() {
                    view.borrow_mut().note_cube_loaded(self.info.clone());
                }
            }
        }
        Ok(())
    }

    /// Applies an add/remove/update delta and merges metadata updates,
    /// then forwards the effective change log to connected views.
    ///
    /// The whole delta is validated up-front (all-or-nothing): adding an
    /// existing id or updating a missing one is an error and commits
    /// nothing. Removing a missing id is tolerated and dropped from the
    /// effective log. If nothing observable changed, no notification
    /// occurs.
    pub fn update_data(&mut self, changes: ChangeLog, info_updates: Info) -> Result<()> {
        let effective = {
            let store = self.store.borrow();
            let mut added = HashSet::with_capacity(changes.add.len());
            for record in &changes.add {
                if store.contains(record.id()) || !added.insert(record.id()) {
                    return Err(Error::duplicate_record(record.id()));
                }
            }
            let removed: HashSet<_> = changes.remove.iter().copied().collect();
            for record in &changes.update {
                // An update must target a record that exists and is not
                // being removed by the same delta.
                if !store.contains(record.id()) || removed.contains(&record.id()) {
                    return Err(Error::missing_record(record.id()));
                }
            }
            let mut effective = ChangeLog::new();
            effective.add = changes.add;
            effective.remove = changes
                .remove
                .into_iter()
                .filter(|&id| store.contains(id))
                .collect();
            // Updates that replace a record with identical data change
            // nothing observable.
            effective.update = changes
                .update
                .into_iter()
                .filter(|r| store.get(r.id()) != Some(r))
                .collect();
            effective
        };

        let info_changed = info_updates
            .iter()
            .any(|(k, v)| self.info.get(k) != Some(v));

        if effective.is_empty() && !info_changed {
            return Ok(());
        }

        {
            let mut store = self.store.borrow_mut();
            for &id in &effective.remove {
                store.remove(id);
            }
            for record in &effective.add {
                store.insert(record.clone())?;
            }
            for record in &effective.update {
                store.update(record.clone())?;
            }
        }
        for (k, v) in info_updates {
            self.info.insert(k, v);
        }

        self.prune_views();
        let views = self.views.clone();
        for weak in views {
            if let Some(view) = weak.upgrade() {
                if view.borrow().is_connected() {
                    view.borrow_mut().note_cube_updated(&effective, self.info.clone());
                }
            }
        }
        Ok(())
    }

    /// One-shot query: builds a disconnected view, returns its rows.
    pub fn execute_query(&self, spec: QuerySpec) -> Result<Vec<Rc<RowNode>>> {
        let query = Query::new(self.fields.clone(), spec)?;
        let view = View::new(
            query,
            self.store.clone(),
            self.bucket.clone(),
            self.info.clone(),
            false,
        );
        Ok(view.into_rows())
    }

    /// Creates a view; `connect` registers it for live updates.
    pub fn create_view(&mut self, spec: QuerySpec, connect: bool) -> Result<Rc<RefCell<View>>> {
        let query = Query::new(self.fields.clone(), spec)?;
        let view = Rc::new(RefCell::new(View::new(
            query,
            self.store.clone(),
            self.bucket.clone(),
            self.info.clone(),
            connect,
        )));
        if connect {
            self.views.push(Rc::downgrade(&view));
        }
        Ok(view)
    }

    /// Drops dead and disconnected view references.
    fn prune_views(&mut self) {
        self.views.retain(|w| {
            w.upgrade()
                .map(|v| v.borrow().is_connected())
                .unwrap_or(false)
        });
    }
}

impl core::fmt::Debug for Cube {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Cube")
            .field("fields", &self.fields.len())
            .field("records", &self.record_count())
            .field("views", &self.views.len())
            .finish()
    }
}

/// Convenience for building an info map from string keys.
pub fn info_from<I, K, V>(entries: I) -> Info
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
