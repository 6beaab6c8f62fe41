//! Error types.
//!
//! Data problems (missing segments, kind mismatches) never become errors:
//! the differ degrades them to full-replace entries. What surfaces here are
//! faults of the collaborators around the core: a host that rejects a patch,
//! a node id the tree does not know, or a component key or configuration
//! that would break the key-compression contract between flattener and
//! differ.

use thiserror::Error;

use crate::tree::NodeId;

/// Errors raised by a [`Host`](crate::host::Host) while applying a patch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("host rejected patch: {0}")]
    Rejected(String),
    #[error("invalid field path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

/// Errors returned by the public sync API.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("host error: {0}")]
    Host(#[from] HostError),
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("invalid component key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("no tokio runtime available to schedule trailing-edge delivery")]
    NoRuntime,
}
