//! Work item assignment & label consistency engine
//!
//! The [`Engine`] owns the record store and the in-memory catalog and is
//! the only way request handlers touch either. One `tokio::sync::Mutex`
//! serializes every mutation: the scan-and-flip of checkout, the
//! capacity-check-and-append of submission, and the deletion cascades
//! all run under it, so two requests can never both observe the same
//! item as free or both pass a capacity check. Each mutation also runs
//! inside a single store transaction; the in-memory catalog is updated
//! only after that transaction commits.

use crate::store::{Store, WORK_BUCKET};
use anno_common::model::{Block, BlockGroup, Lab, PassKind, WorkItem};
use anno_common::Result;
use tokio::sync::Mutex;
use tracing::info;

pub mod cascade;
pub mod labels;
pub mod ledger;
pub mod tracker;

use tracker::Catalog;

/// The assignment engine. Cheap to share via `Arc`.
pub struct Engine {
    store: Store,
    catalog: Mutex<Catalog>,
}

impl Engine {
    /// Load the engine from a store whose catalog has already been
    /// synced from the manifest.
    pub async fn load(store: Store) -> Result<Self> {
        let items: Vec<(String, WorkItem)> = store.scan_json(WORK_BUCKET).await?;
        let catalog = Catalog::from_items(items.into_iter().map(|(_, item)| item));
        info!("Loaded catalog with {} work items", catalog.len());
        Ok(Self {
            store,
            catalog: Mutex::new(catalog),
        })
    }

    // ---- work item tracker ------------------------------------------------

    /// Select an inactive item matching the criteria, activate it, and
    /// record the checkout against the user - atomically from the
    /// caller's point of view.
    pub async fn select_and_assign<F>(
        &self,
        lab_key: &str,
        username: &str,
        criteria: F,
    ) -> Result<WorkItem>
    where
        F: Fn(&WorkItem) -> bool,
    {
        let mut catalog = self.catalog.lock().await;
        let item = catalog.select(criteria)?;

        let mut tx = self.store.begin().await?;
        tx.put_json(WORK_BUCKET, &item.id, &item).await?;
        ledger::record_assignment(&mut tx, lab_key, username, &item.id).await?;
        tx.commit().await?;

        catalog.mark_active(&item.id);
        info!("Assigned work item {} to {}/{}", item.id, lab_key, username);
        Ok(item)
    }

    /// Return an abandoned item to the pool without marking it finished.
    pub async fn release(&self, item_id: &str, lab_key: &str, username: &str) -> Result<()> {
        let mut catalog = self.catalog.lock().await;
        let mut item = catalog.get(item_id)?.clone();
        item.active = false;

        let mut tx = self.store.begin().await?;
        ledger::record_release(&mut tx, lab_key, username, item_id).await?;
        tx.put_json(WORK_BUCKET, item_id, &item).await?;
        tx.commit().await?;

        catalog.mark_inactive(item_id);
        info!("Released work item {} from {}/{}", item_id, lab_key, username);
        Ok(())
    }

    /// Mark an item finished by the user holding it: flips it inactive
    /// and moves it from their active set to their past set.
    pub async fn complete(
        &self,
        item_id: &str,
        lab_key: &str,
        username: &str,
        kind: PassKind,
    ) -> Result<()> {
        let mut catalog = self.catalog.lock().await;
        let mut item = catalog.get(item_id)?.clone();
        item.active = false;

        let mut tx = self.store.begin().await?;
        ledger::record_completion(&mut tx, lab_key, username, item_id, kind).await?;
        tx.put_json(WORK_BUCKET, item_id, &item).await?;
        tx.commit().await?;

        catalog.mark_inactive(item_id);
        Ok(())
    }

    // ---- label store ------------------------------------------------------

    /// Accept a submitted block: store it in the item's group, return
    /// the item to the pool, and record the completion in the ledger.
    /// Returns the instance number the label store assigned.
    ///
    /// The submitter need not currently hold the item (training
    /// resubmits and admin migration), so this never fails with
    /// `NotAssigned`; capacity and kind violations still reject it.
    pub async fn submit_block(&self, block: Block) -> Result<usize> {
        let mut catalog = self.catalog.lock().await;
        let mut item = catalog.get(&block.item_id)?.clone();
        item.active = false;

        let item_id = block.item_id.clone();
        let lab_key = block.lab_key.clone();
        let coder = block.coder.clone();
        let kind = block.kind;

        let mut tx = self.store.begin().await?;
        let instance = labels::add_block(&mut tx, block).await?;
        tx.put_json(WORK_BUCKET, &item_id, &item).await?;
        ledger::record_submission(&mut tx, &lab_key, &coder, &item_id, kind).await?;
        tx.commit().await?;

        catalog.mark_inactive(&item_id);
        info!(
            "Stored instance {} of item {} from {}/{} ({:?})",
            instance, item_id, lab_key, coder, kind
        );
        Ok(instance)
    }

    /// All submitted labelings for one item.
    pub async fn group(&self, item_id: &str) -> Result<BlockGroup> {
        labels::get_group(&self.store, item_id).await
    }

    /// Batch group fetch; fails whole if any ID has no group.
    pub async fn groups(&self, item_ids: &[String]) -> Result<Vec<BlockGroup>> {
        labels::get_groups(&self.store, item_ids).await
    }

    /// Blocks one lab submitted across the given items.
    pub async fn lab_blocks(&self, lab_key: &str, item_ids: &[String]) -> Result<Vec<Block>> {
        let groups = labels::get_groups(&self.store, item_ids).await?;
        labels::filter_by_lab(&groups, lab_key)
    }

    /// Blocks one coder submitted across the given items.
    pub async fn user_blocks(&self, coder: &str, item_ids: &[String]) -> Result<Vec<Block>> {
        let groups = labels::get_groups(&self.store, item_ids).await?;
        labels::filter_by_user(&groups, coder)
    }

    // ---- user/lab ledger --------------------------------------------------

    /// Register a user, creating the lab on first sight. Returns false
    /// when the user already existed.
    pub async fn register_user(&self, lab_key: &str, lab_name: &str, username: &str) -> Result<bool> {
        let _guard = self.catalog.lock().await;
        let mut tx = self.store.begin().await?;
        let added = ledger::register_user(&mut tx, lab_key, lab_name, username).await?;
        tx.commit().await?;
        Ok(added)
    }

    pub async fn lab(&self, lab_key: &str) -> Result<Lab> {
        ledger::get_lab(&self.store, lab_key).await
    }

    pub async fn labs(&self) -> Result<Vec<Lab>> {
        ledger::get_all_labs(&self.store).await
    }

    pub async fn completed_item_ids(&self, lab_key: &str) -> Result<Vec<String>> {
        ledger::completed_item_ids(&self.store, lab_key).await
    }

    pub async fn completed_training_ids(&self, lab_key: &str) -> Result<Vec<String>> {
        ledger::completed_training_ids(&self.store, lab_key).await
    }

    pub async fn completed_reliability_ids(&self, lab_key: &str) -> Result<Vec<String>> {
        ledger::completed_reliability_ids(&self.store, lab_key).await
    }

    // ---- deletion cascades ------------------------------------------------

    /// Delete one (item, instance) submission. Returns true when the
    /// whole group was removed with it.
    pub async fn delete_instance(
        &self,
        lab_key: &str,
        username: &str,
        item_id: &str,
        instance: usize,
    ) -> Result<bool> {
        let _guard = self.catalog.lock().await;
        let mut tx = self.store.begin().await?;
        let fully_deleted = cascade::delete_instance(&mut tx, lab_key, username, item_id, instance).await?;
        tx.commit().await?;
        Ok(fully_deleted)
    }

    /// Delete everything one user ever submitted.
    pub async fn delete_user_instances(&self, lab_key: &str, username: &str) -> Result<()> {
        let _guard = self.catalog.lock().await;
        let mut tx = self.store.begin().await?;
        cascade::delete_user_instances(&mut tx, lab_key, username).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Delete everything anyone in the lab ever submitted.
    pub async fn delete_lab_instances(&self, lab_key: &str) -> Result<()> {
        let _guard = self.catalog.lock().await;
        let mut tx = self.store.begin().await?;
        cascade::delete_lab_instances(&mut tx, lab_key).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Default checkout criteria: any free item is appropriate.
    pub fn accept_all(_item: &WorkItem) -> bool {
        true
    }
}
