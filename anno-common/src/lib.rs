//! # Anno Common Library
//!
//! Shared code for the annotation work distribution server:
//! - Domain model (work items, labeled blocks, labs, users)
//! - Error types
//! - Configuration loading

pub mod config;
pub mod error;
pub mod model;

pub use error::{Error, Result};
pub use model::{Block, BlockGroup, Clip, Lab, PassKind, User, WorkItem};
