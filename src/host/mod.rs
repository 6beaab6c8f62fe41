// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The rendering host that receives patches.
//!
//! A host holds the last state it applied, nested by field name:
//!
//! ```text
//! {
//!   "$root": {
//!     "0":   { "$k": "0",   "$kk": "0,",   "$p": "",  ... },
//!     "0,1": { "$k": "0,1", "$kk": "0,1,", "$p": "0", "count": 1 }
//!   }
//! }
//! ```
//!
//! The sync layer only reads that state and hands over [`Patch`]es; it
//! never mutates host state directly.

pub mod field_path;
mod memory;

pub use memory::MemoryHost;

use serde_json::Value;

use crate::diff::Patch;
use crate::error::HostError;

/// Receiver of patches.
pub trait Host: Send + Sync {
    /// Whether the host accepts updates right now. Sync calls against a
    /// host that is not ready are skipped.
    fn is_ready(&self) -> bool;

    /// Snapshot of the currently applied state.
    fn state(&self) -> Value;

    /// Apply every entry of `patch`, in path order.
    fn apply(&self, patch: Patch) -> Result<(), HostError>;
}

impl<H: Host + ?Sized> Host for std::sync::Arc<H> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn state(&self) -> Value {
        (**self).state()
    }

    fn apply(&self, patch: Patch) -> Result<(), HostError> {
        (**self).apply(patch)
    }
}
