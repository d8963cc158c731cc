//! Deletion cascade coordinator
//!
//! Three granularities of label deletion, each keeping the label store
//! and the user/lab ledger in agreement. Every function here runs inside
//! the single write transaction the engine opened for it, so a crash
//! mid-cascade applies nothing.

use crate::engine::{labels, ledger};
use crate::store::WriteTx;
use anno_common::{Error, Result};
use tracing::info;

/// Delete one (item, instance) and fix up the author's past set.
/// Returns true when the whole group was removed.
///
/// Ownership is verified against the label store before anything is
/// deleted; a mismatch between the claimed author and the stored block
/// is surfaced as an inconsistency, never resolved by guessing.
pub async fn delete_instance(
    tx: &mut WriteTx,
    lab_key: &str,
    username: &str,
    item_id: &str,
    instance: usize,
) -> Result<bool> {
    let group = labels::get_group_tx(tx, item_id).await?;
    let block = group.blocks.get(instance).ok_or_else(|| Error::InstanceNotFound {
        item_id: item_id.to_string(),
        instance,
    })?;
    if block.lab_key != lab_key || block.coder != username {
        return Err(Error::Inconsistency(format!(
            "instance {} of item {} is authored by {}/{}, not {}/{}",
            instance, item_id, block.lab_key, block.coder, lab_key, username
        )));
    }

    let fully_deleted = labels::delete_instances(tx, item_id, &[instance]).await?;

    if fully_deleted {
        ledger::delete_past_item(tx, lab_key, username, item_id).await?;
    } else {
        // The group survives; the item stays in the user's past only
        // while some instance of theirs remains.
        let group = labels::get_group_tx(tx, item_id).await?;
        if group.instances_by(lab_key, username).is_empty() {
            ledger::delete_past_item(tx, lab_key, username, item_id).await?;
        }
    }

    info!(
        "Deleted instance {} of item {} for {}/{} (group removed: {})",
        instance, item_id, lab_key, username, fully_deleted
    );
    Ok(fully_deleted)
}

/// Delete every instance one user ever submitted, then clear their
/// finished-work history.
pub async fn delete_user_instances(tx: &mut WriteTx, lab_key: &str, username: &str) -> Result<()> {
    let map = ledger::past_instance_map_user(tx, lab_key, username).await?;
    for (item_id, instances) in &map {
        labels::delete_instances(tx, item_id, instances).await?;
    }
    ledger::clear_user_history(tx, lab_key, username).await?;
    info!(
        "Deleted all instances of user {}/{} across {} items",
        lab_key,
        username,
        map.len()
    );
    Ok(())
}

/// Delete every instance anyone in the lab ever submitted, then clear
/// every member's finished-work history.
pub async fn delete_lab_instances(tx: &mut WriteTx, lab_key: &str) -> Result<()> {
    let map = ledger::past_instance_map_lab(tx, lab_key).await?;
    for (item_id, instances) in &map {
        labels::delete_instances(tx, item_id, instances).await?;
    }
    ledger::clear_lab_history(tx, lab_key).await?;
    info!("Deleted all instances of lab {} across {} items", lab_key, map.len());
    Ok(())
}
