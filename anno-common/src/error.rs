//! Common error types for the annotation server

use crate::model::PassKind;
use thiserror::Error;

/// Common result type for anno operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error conditions surfaced by the assignment engine and its stores.
///
/// The transport layer maps these to status codes; the engine never
/// retries any of them on its own.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored record failed to encode or decode
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Work item absent from the catalog
    #[error("Work item not found: {0}")]
    WorkItemNotFound(String),

    /// No labeled blocks have been submitted for this item
    #[error("No block group found for item: {0}")]
    BlockGroupNotFound(String),

    /// Instance number out of range for the item's block group
    #[error("Instance {instance} not found for item {item_id}")]
    InstanceNotFound { item_id: String, instance: usize },

    /// Lab key is not registered
    #[error("Lab doesn't exist: {0}")]
    LabNotFound(String),

    /// Username is not a member of the lab
    #[error("User doesn't exist: {0}")]
    UserNotFound(String),

    /// Every catalog item matching the criteria is already checked out
    #[error("No eligible work items available")]
    NoEligibleItems,

    /// The group already holds the maximum number of instances
    #[error("Block group for item {0} is full")]
    BlockGroupFull(String),

    /// Submission kind disagrees with the group's established kind
    #[error("Kind mismatch for item {item_id}: group is {group:?}, block is {block:?}")]
    KindMismatch {
        item_id: String,
        group: PassKind,
        block: PassKind,
    },

    /// Reliability groups take one instance per (lab, coder) pair
    #[error("Coder {coder} already submitted a reliability pass for item {item_id}")]
    DuplicateCoder { item_id: String, coder: String },

    /// Release or complete called for an item the user doesn't hold
    #[error("User {user} wasn't assigned work item {item_id}")]
    NotAssigned { item_id: String, user: String },

    /// A group filter matched no blocks for the lab
    #[error("No blocks belong to lab: {0}")]
    LabNotPresent(String),

    /// A group filter matched no blocks for the coder
    #[error("No blocks belong to coder: {0}")]
    UserNotPresent(String),

    /// Admin key mismatch
    #[error("Unauthorized")]
    Unauthorized,

    /// The label store and the ledger disagree; surfaced, never guessed away
    #[error("Inconsistency: {0}")]
    Inconsistency(String),
}
