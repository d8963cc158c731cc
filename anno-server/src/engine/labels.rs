//! Label store
//!
//! One block group per work item, keyed by item ID in the labels bucket.
//! The group's kind is fixed by its first member; capacity rules differ
//! by kind:
//! - regular: at most `NUM_REAL_BLOCK_PASSES` instances
//! - reliability: at most one instance per (lab, coder) pair
//! - training: unlimited, resubmission allowed (used for calibration)

use crate::store::{Store, WriteTx, LABELS_BUCKET};
use anno_common::model::{Block, BlockGroup, PassKind, NUM_REAL_BLOCK_PASSES};
use anno_common::{Error, Result};
use std::collections::BTreeSet;

/// Validate and append a submitted block, assigning its instance number.
/// Returns the assigned instance.
pub async fn add_block(tx: &mut WriteTx, mut block: Block) -> Result<usize> {
    let mut group = match tx.get_json::<BlockGroup>(LABELS_BUCKET, &block.item_id).await? {
        Some(group) => {
            if group.kind != block.kind {
                return Err(Error::KindMismatch {
                    item_id: block.item_id,
                    group: group.kind,
                    block: block.kind,
                });
            }
            group
        }
        None => BlockGroup::new(block.kind),
    };

    match group.kind {
        PassKind::Regular => {
            if group.len() >= NUM_REAL_BLOCK_PASSES {
                return Err(Error::BlockGroupFull(block.item_id));
            }
        }
        PassKind::Reliability => {
            if group.contains_coder(&block.lab_key, &block.coder) {
                return Err(Error::DuplicateCoder {
                    item_id: block.item_id,
                    coder: block.coder,
                });
            }
        }
        PassKind::Training => {}
    }

    let instance = group.len();
    block.instance = instance;
    let item_id = block.item_id.clone();
    group.blocks.push(block);
    tx.put_json(LABELS_BUCKET, &item_id, &group).await?;
    Ok(instance)
}

/// Fetch the block group for one item.
pub async fn get_group(store: &Store, item_id: &str) -> Result<BlockGroup> {
    store
        .get_json(LABELS_BUCKET, item_id)
        .await?
        .ok_or_else(|| Error::BlockGroupNotFound(item_id.to_string()))
}

/// Fetch several block groups. All or nothing: one missing ID fails the
/// whole batch so callers never mistake partial data for complete data.
pub async fn get_groups(store: &Store, item_ids: &[String]) -> Result<Vec<BlockGroup>> {
    let mut groups = Vec::with_capacity(item_ids.len());
    for id in item_ids {
        groups.push(get_group(store, id).await?);
    }
    Ok(groups)
}

/// Fetch a group inside a write transaction.
pub async fn get_group_tx(tx: &mut WriteTx, item_id: &str) -> Result<BlockGroup> {
    tx.get_json(LABELS_BUCKET, item_id)
        .await?
        .ok_or_else(|| Error::BlockGroupNotFound(item_id.to_string()))
}

/// Remove the named instances from an item's group, renumbering the
/// remainder densely from 0 in their original submission order. Returns
/// true when the group emptied and its storage key was removed.
pub async fn delete_instances(tx: &mut WriteTx, item_id: &str, instances: &[usize]) -> Result<bool> {
    let mut group = get_group_tx(tx, item_id).await?;

    let doomed: BTreeSet<usize> = instances.iter().copied().collect();
    for &instance in &doomed {
        if instance >= group.len() {
            return Err(Error::InstanceNotFound {
                item_id: item_id.to_string(),
                instance,
            });
        }
    }

    let mut kept = Vec::with_capacity(group.len() - doomed.len());
    for (position, mut block) in group.blocks.into_iter().enumerate() {
        if doomed.contains(&position) {
            continue;
        }
        block.instance = kept.len();
        kept.push(block);
    }
    group.blocks = kept;

    if group.is_empty() {
        tx.delete(LABELS_BUCKET, item_id).await?;
        Ok(true)
    } else {
        tx.put_json(LABELS_BUCKET, item_id, &group).await?;
        Ok(false)
    }
}

/// Flatten groups into the blocks submitted by one lab. No match is a
/// reportable condition, not an empty result.
pub fn filter_by_lab(groups: &[BlockGroup], lab_key: &str) -> Result<Vec<Block>> {
    let blocks: Vec<Block> = groups
        .iter()
        .flat_map(|g| g.blocks.iter())
        .filter(|b| b.lab_key == lab_key)
        .cloned()
        .collect();
    if blocks.is_empty() {
        return Err(Error::LabNotPresent(lab_key.to_string()));
    }
    Ok(blocks)
}

/// Flatten groups into the blocks submitted by one coder.
pub fn filter_by_user(groups: &[BlockGroup], coder: &str) -> Result<Vec<Block>> {
    let blocks: Vec<Block> = groups
        .iter()
        .flat_map(|g| g.blocks.iter())
        .filter(|b| b.coder == coder)
        .cloned()
        .collect();
    if blocks.is_empty() {
        return Err(Error::UserNotPresent(coder.to_string()));
    }
    Ok(blocks)
}
