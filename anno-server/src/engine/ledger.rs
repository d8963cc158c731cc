//! User/lab ledger
//!
//! One record per lab in the labs bucket, embedding its users. Each user
//! carries the item IDs they currently hold, the IDs they finished, and
//! the IDs completed under the training and reliability passes. All of
//! those sets are add-once; re-recording is a no-op.

use crate::store::{Store, WriteTx, LABELS_BUCKET, LABS_BUCKET};
use anno_common::model::{BlockGroup, Lab, PassKind, User};
use anno_common::{Error, Result};
use std::collections::BTreeMap;
use tracing::info;

/// Map from item ID to the instance numbers a deletion must remove.
pub type InstanceMap = BTreeMap<String, Vec<usize>>;

pub async fn get_lab(store: &Store, lab_key: &str) -> Result<Lab> {
    store
        .get_json(LABS_BUCKET, lab_key)
        .await?
        .ok_or_else(|| Error::LabNotFound(lab_key.to_string()))
}

pub async fn get_all_labs(store: &Store) -> Result<Vec<Lab>> {
    Ok(store
        .scan_json::<Lab>(LABS_BUCKET)
        .await?
        .into_iter()
        .map(|(_, lab)| lab)
        .collect())
}

pub async fn get_lab_tx(tx: &mut WriteTx, lab_key: &str) -> Result<Lab> {
    tx.get_json(LABS_BUCKET, lab_key)
        .await?
        .ok_or_else(|| Error::LabNotFound(lab_key.to_string()))
}

async fn put_lab(tx: &mut WriteTx, lab: &Lab) -> Result<()> {
    tx.put_json(LABS_BUCKET, &lab.key, lab).await
}

fn user_mut<'a>(lab: &'a mut Lab, username: &str) -> Result<&'a mut User> {
    lab.users
        .get_mut(username)
        .ok_or_else(|| Error::UserNotFound(username.to_string()))
}

/// Register a user, creating the lab on first sight. Returns false (and
/// changes nothing) when the user already exists.
pub async fn register_user(
    tx: &mut WriteTx,
    lab_key: &str,
    lab_name: &str,
    username: &str,
) -> Result<bool> {
    let mut lab = match tx.get_json::<Lab>(LABS_BUCKET, lab_key).await? {
        Some(lab) => lab,
        None => Lab::new(lab_key, lab_name),
    };
    if lab.users.contains_key(username) {
        info!("User {} already exists in lab {}", username, lab_key);
        return Ok(false);
    }
    lab.add_user(User::new(username, lab_key));
    put_lab(tx, &lab).await?;
    Ok(true)
}

/// Record a checkout: add the item to the user's active set.
pub async fn record_assignment(
    tx: &mut WriteTx,
    lab_key: &str,
    username: &str,
    item_id: &str,
) -> Result<()> {
    let mut lab = get_lab_tx(tx, lab_key).await?;
    let user = user_mut(&mut lab, username)?;
    user.active_items.insert(item_id.to_string());
    put_lab(tx, &lab).await
}

/// Record an abandoned checkout: the item leaves the active set and is
/// NOT added to the past set.
pub async fn record_release(
    tx: &mut WriteTx,
    lab_key: &str,
    username: &str,
    item_id: &str,
) -> Result<()> {
    let mut lab = get_lab_tx(tx, lab_key).await?;
    let user = user_mut(&mut lab, username)?;
    if !user.active_items.remove(item_id) {
        return Err(Error::NotAssigned {
            item_id: item_id.to_string(),
            user: username.to_string(),
        });
    }
    put_lab(tx, &lab).await
}

/// Record a completion for an item the user currently holds. Fails with
/// `NotAssigned` when they don't.
pub async fn record_completion(
    tx: &mut WriteTx,
    lab_key: &str,
    username: &str,
    item_id: &str,
    kind: PassKind,
) -> Result<()> {
    let mut lab = get_lab_tx(tx, lab_key).await?;
    let user = user_mut(&mut lab, username)?;
    if !user.active_items.remove(item_id) {
        return Err(Error::NotAssigned {
            item_id: item_id.to_string(),
            user: username.to_string(),
        });
    }
    mark_finished(user, item_id, kind);
    put_lab(tx, &lab).await
}

/// Record a submission whether or not the item is currently checked out
/// to the user (training resubmits and admin migration both land here).
pub async fn record_submission(
    tx: &mut WriteTx,
    lab_key: &str,
    username: &str,
    item_id: &str,
    kind: PassKind,
) -> Result<()> {
    let mut lab = get_lab_tx(tx, lab_key).await?;
    let user = user_mut(&mut lab, username)?;
    user.active_items.remove(item_id);
    mark_finished(user, item_id, kind);
    put_lab(tx, &lab).await
}

fn mark_finished(user: &mut User, item_id: &str, kind: PassKind) {
    user.past_items.insert(item_id.to_string());
    match kind {
        PassKind::Training => {
            user.complete_train.insert(item_id.to_string());
        }
        PassKind::Reliability => {
            user.complete_rel.insert(item_id.to_string());
        }
        PassKind::Regular => {}
    }
}

/// Item IDs finished by anyone in the lab. Each user's own set is
/// deduplicated, but two users sharing an item both contribute it.
pub async fn completed_item_ids(store: &Store, lab_key: &str) -> Result<Vec<String>> {
    let lab = get_lab(store, lab_key).await?;
    Ok(lab
        .users
        .values()
        .flat_map(|u| u.past_items.iter().cloned())
        .collect())
}

/// Item IDs completed lab-wide under the training pass.
pub async fn completed_training_ids(store: &Store, lab_key: &str) -> Result<Vec<String>> {
    let lab = get_lab(store, lab_key).await?;
    Ok(lab
        .users
        .values()
        .flat_map(|u| u.complete_train.iter().cloned())
        .collect())
}

/// Item IDs completed lab-wide under the reliability pass.
pub async fn completed_reliability_ids(store: &Store, lab_key: &str) -> Result<Vec<String>> {
    let lab = get_lab(store, lab_key).await?;
    Ok(lab
        .users
        .values()
        .flat_map(|u| u.complete_rel.iter().cloned())
        .collect())
}

/// Resolve each of a user's past items to the instance numbers they
/// authored, by content. Items whose group holds nothing of theirs any
/// more (or no group at all, as after an explicit complete with no
/// submission) are simply absent from the map.
pub async fn past_instance_map_user(tx: &mut WriteTx, lab_key: &str, username: &str) -> Result<InstanceMap> {
    let mut lab = get_lab_tx(tx, lab_key).await?;
    let user = user_mut(&mut lab, username)?;
    let past: Vec<String> = user.past_items.iter().cloned().collect();

    let mut map = InstanceMap::new();
    for item_id in past {
        let Some(group) = tx.get_json::<BlockGroup>(LABELS_BUCKET, &item_id).await? else {
            continue;
        };
        let instances = group.instances_by(lab_key, username);
        if !instances.is_empty() {
            map.insert(item_id, instances);
        }
    }
    Ok(map)
}

/// Lab-wide variant of [`past_instance_map_user`]: the union over every
/// user's past items, resolved to lab-authored instances.
pub async fn past_instance_map_lab(tx: &mut WriteTx, lab_key: &str) -> Result<InstanceMap> {
    let lab = get_lab_tx(tx, lab_key).await?;
    let mut past: Vec<String> = lab
        .users
        .values()
        .flat_map(|u| u.past_items.iter().cloned())
        .collect();
    past.sort();
    past.dedup();

    let mut map = InstanceMap::new();
    for item_id in past {
        let Some(group) = tx.get_json::<BlockGroup>(LABELS_BUCKET, &item_id).await? else {
            continue;
        };
        let instances = group.instances_by_lab(lab_key);
        if !instances.is_empty() {
            map.insert(item_id, instances);
        }
    }
    Ok(map)
}

/// Drop an item from the user's past set. The cascade coordinator calls
/// this only after confirming no instance authored by the user remains.
pub async fn delete_past_item(
    tx: &mut WriteTx,
    lab_key: &str,
    username: &str,
    item_id: &str,
) -> Result<()> {
    let mut lab = get_lab_tx(tx, lab_key).await?;
    let user = user_mut(&mut lab, username)?;
    user.past_items.remove(item_id);
    put_lab(tx, &lab).await
}

/// Clear one user's finished-work history (past items and both completed
/// special-pass sets).
pub async fn clear_user_history(tx: &mut WriteTx, lab_key: &str, username: &str) -> Result<()> {
    let mut lab = get_lab_tx(tx, lab_key).await?;
    let user = user_mut(&mut lab, username)?;
    user.clear_history();
    put_lab(tx, &lab).await
}

/// Clear the finished-work history of every user in the lab.
pub async fn clear_lab_history(tx: &mut WriteTx, lab_key: &str) -> Result<()> {
    let mut lab = get_lab_tx(tx, lab_key).await?;
    for user in lab.users.values_mut() {
        user.clear_history();
    }
    put_lab(tx, &lab).await
}
