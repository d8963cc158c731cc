//! Domain model for the annotation work distribution server
//!
//! Work items are single conversation blocks cut out of CLAN files.
//! Labs check them out for their coders, label them, and submit the
//! labeled result back as a `Block`. All of these records are stored
//! as JSON values in the key-value store.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Maximum number of instances a regular (non-training, non-reliability)
/// block group may hold.
pub const NUM_REAL_BLOCK_PASSES: usize = 2;

/// Separator between file name and block index in a work item ID.
pub const ITEM_ID_SEPARATOR: &str = ":::";

/// Build the stable work item ID for one block of one CLAN file,
/// e.g. `"30_13_coderJS_final:::6"`.
pub fn work_item_id(file_name: &str, block_index: u32) -> String {
    format!("{}{}{}", file_name, ITEM_ID_SEPARATOR, block_index)
}

/// The kind of coding pass a submission represents.
///
/// A block group's kind is fixed by its first member; the mutual
/// exclusivity of training and reliability is structural rather than
/// carried in two separate flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassKind {
    Regular,
    Training,
    Reliability,
}

/// One assignable unit of work: a single block from a single CLAN file.
///
/// Created once at catalog-build time and never deleted; only `active`
/// changes afterwards (checkout flips it on, return flips it off).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    #[serde(rename = "filename")]
    pub file_name: String,
    #[serde(rename = "block")]
    pub block_index: u32,
    #[serde(rename = "block-path")]
    pub block_path: String,
    pub active: bool,
}

impl WorkItem {
    pub fn new(file_name: impl Into<String>, block_index: u32, block_path: impl Into<String>) -> Self {
        let file_name = file_name.into();
        Self {
            id: work_item_id(&file_name, block_index),
            file_name,
            block_index,
            block_path: block_path.into(),
            active: false,
        }
    }
}

/// A single labeled tier from a conversation block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clip {
    #[serde(rename = "clip-index")]
    pub index: u32,
    #[serde(rename = "clip-tier")]
    pub tier: String,
    #[serde(default)]
    pub multiline: bool,
    #[serde(rename = "multi-tier-parent", default)]
    pub multi_tier_parent: String,
    #[serde(rename = "start-time", default)]
    pub start_time: String,
    #[serde(rename = "offset-time", default)]
    pub offset_time: String,
    #[serde(rename = "timestamp", default)]
    pub timestamp: String,
    pub classification: String,
    #[serde(rename = "label-date", default)]
    pub label_date: String,
    #[serde(default)]
    pub coder: String,
    #[serde(rename = "gender-label", default)]
    pub gender_label: String,
}

/// One coder's labeling of one work item.
///
/// `instance` is assigned by the label store when the block is accepted
/// and renumbered densely after deletions, so it is a position within
/// the group, not a stable identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "id")]
    pub item_id: String,
    #[serde(rename = "clan-file")]
    pub clan_file: String,
    #[serde(rename = "block-index")]
    pub block_index: u32,
    #[serde(rename = "lab-key")]
    pub lab_key: String,
    #[serde(rename = "lab-name")]
    pub lab_name: String,
    pub coder: String,
    #[serde(default)]
    pub instance: usize,
    pub kind: PassKind,
    #[serde(rename = "fan-or-man", default)]
    pub fan_or_man: bool,
    #[serde(rename = "dont-share", default)]
    pub dont_share: bool,
    pub clips: Vec<Clip>,
}

/// All submitted labelings for one work item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockGroup {
    pub kind: PassKind,
    pub blocks: Vec<Block>,
}

impl BlockGroup {
    pub fn new(kind: PassKind) -> Self {
        Self { kind, blocks: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Whether the group already holds an instance from this (lab, coder)
    /// pair. Used to enforce the reliability-pass cap.
    pub fn contains_coder(&self, lab_key: &str, coder: &str) -> bool {
        self.blocks
            .iter()
            .any(|b| b.lab_key == lab_key && b.coder == coder)
    }

    /// Instance numbers within this group authored by the given coder.
    pub fn instances_by(&self, lab_key: &str, coder: &str) -> Vec<usize> {
        self.blocks
            .iter()
            .filter(|b| b.lab_key == lab_key && b.coder == coder)
            .map(|b| b.instance)
            .collect()
    }

    /// Instance numbers within this group authored by any coder of the lab.
    pub fn instances_by_lab(&self, lab_key: &str) -> Vec<usize> {
        self.blocks
            .iter()
            .filter(|b| b.lab_key == lab_key)
            .map(|b| b.instance)
            .collect()
    }
}

/// A lab member and their work item bookkeeping.
///
/// The sets make the add-once rules structural: re-adding an item ID to
/// any of them is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    #[serde(rename = "parent-lab")]
    pub parent_lab: String,
    #[serde(rename = "active-work-items", default)]
    pub active_items: BTreeSet<String>,
    #[serde(rename = "finished-work-items", default)]
    pub past_items: BTreeSet<String>,
    #[serde(rename = "complete-train-blocks", default)]
    pub complete_train: BTreeSet<String>,
    #[serde(rename = "complete-reliability-blocks", default)]
    pub complete_rel: BTreeSet<String>,
}

impl User {
    pub fn new(name: impl Into<String>, parent_lab: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_lab: parent_lab.into(),
            ..Default::default()
        }
    }

    /// Drop all record of finished work (past items and both completed
    /// special-pass sets). Active checkouts are untouched.
    pub fn clear_history(&mut self) {
        self.past_items.clear();
        self.complete_train.clear();
        self.complete_rel.clear();
    }
}

/// Lab metadata and membership, keyed in storage by the lab key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lab {
    pub key: String,
    #[serde(rename = "lab-name")]
    pub lab_name: String,
    pub users: BTreeMap<String, User>,
}

impl Lab {
    pub fn new(key: impl Into<String>, lab_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            lab_name: lab_name.into(),
            users: BTreeMap::new(),
        }
    }

    /// Insert a user, forcing `parent_lab` to this lab's key.
    pub fn add_user(&mut self, mut user: User) {
        user.parent_lab = self.key.clone();
        self.users.insert(user.name.clone(), user);
    }
}
