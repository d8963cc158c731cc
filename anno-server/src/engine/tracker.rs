//! Work item tracker
//!
//! In-memory view of the persisted catalog: every work item by ID plus a
//! free-list index of the inactive ones, so selection never scans the
//! whole catalog. The engine holds this behind its mutation lock and
//! only applies in-memory changes after the matching store transaction
//! commits.

use anno_common::model::WorkItem;
use anno_common::{Error, Result};
use std::collections::{BTreeSet, HashMap};

/// Catalog of all work items with a free-list of inactive IDs.
pub struct Catalog {
    items: HashMap<String, WorkItem>,
    free: BTreeSet<String>,
}

impl Catalog {
    /// Build the catalog from persisted items.
    pub fn from_items(items: impl IntoIterator<Item = WorkItem>) -> Self {
        let mut catalog = Self {
            items: HashMap::new(),
            free: BTreeSet::new(),
        };
        for item in items {
            if !item.active {
                catalog.free.insert(item.id.clone());
            }
            catalog.items.insert(item.id.clone(), item);
        }
        catalog
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, item_id: &str) -> Result<&WorkItem> {
        self.items
            .get(item_id)
            .ok_or_else(|| Error::WorkItemNotFound(item_id.to_string()))
    }

    /// Pick an inactive item satisfying the criteria. Free-list order is
    /// arbitrary as far as callers are concerned; nothing may depend on
    /// it.
    pub fn select<F>(&self, criteria: F) -> Result<WorkItem>
    where
        F: Fn(&WorkItem) -> bool,
    {
        for id in &self.free {
            let item = &self.items[id];
            if criteria(item) {
                let mut chosen = item.clone();
                chosen.active = true;
                return Ok(chosen);
            }
        }
        Err(Error::NoEligibleItems)
    }

    /// Apply a committed checkout to the in-memory view.
    pub fn mark_active(&mut self, item_id: &str) {
        if let Some(item) = self.items.get_mut(item_id) {
            item.active = true;
            self.free.remove(item_id);
        }
    }

    /// Apply a committed return (release or completion) to the in-memory
    /// view. Idempotent: returning an already-inactive item changes
    /// nothing.
    pub fn mark_inactive(&mut self, item_id: &str) {
        if let Some(item) = self.items.get_mut(item_id) {
            item.active = false;
            self.free.insert(item_id.to_string());
        }
    }
}
