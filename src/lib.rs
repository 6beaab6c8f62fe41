//! # View Sync
//!
//! Keeps a rendering host's state in step with a tree of UI components by
//! shipping small, throttled patches instead of whole state.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Component tree                          │
//! │  • Arena of nodes: key, parent, children, state sources     │
//! │  • Read through the ComponentTree trait                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                  (KeyPathEncoder + TreeFlattener)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Snapshot                                │
//! │  • One record per live component                           │
//! │  • Keyed "$root.<path key>", path key = "0,1,3"             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                     (structural diff vs host)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Patch                                   │
//! │  • "field.path[i]" → replacement value                     │
//! │  • Shape changes replace the whole subtree                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               (ThrottledDispatcher: leading / trailing edge)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Host                                    │
//! │  • Applies merged patches, at most one per window           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use view_sync::{ComponentArena, Host, MemoryHost, StateSource, SyncConfig, ViewSync};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut tree = ComponentArena::new();
//! let page = tree.insert_root(Some("0")).unwrap();
//! let counter = tree.insert_child(page, "1").unwrap();
//! tree.set_field(counter, StateSource::State, "count", json!(1)).unwrap();
//!
//! let host = Arc::new(MemoryHost::new());
//! let sync = ViewSync::new(SyncConfig::default(), host.clone()).unwrap();
//!
//! // First render: everything goes out at once
//! sync.init_sync(&tree, page).unwrap();
//!
//! // Later changes: only the changed field, rate-limited
//! tree.set_field(counter, StateSource::State, "count", json!(2)).unwrap();
//! sync.update_sync(&tree, counter).unwrap();
//! sync.flush().unwrap();
//!
//! assert_eq!(host.state()["$root"]["0,1"]["count"], json!(2));
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`coordinator`]: [`ViewSync`], the `init_sync` / `update_sync` entry points
//! - [`tree`]: Component tree trait and arena
//! - [`keypath`]: Path keys for components
//! - [`flatten`]: Records and snapshots
//! - [`diff`]: Structural differ and [`Patch`]
//! - [`throttle`]: Coalescing, rate-limited delivery
//! - [`host`]: Host trait, field paths, in-memory host

pub mod config;
pub mod coordinator;
pub mod diff;
pub mod error;
pub mod flatten;
pub mod host;
pub mod keypath;
pub mod metrics;
pub mod throttle;
pub mod tree;

pub use config::SyncConfig;
pub use coordinator::{SkipReason, SyncOutcome, SyncPass, ViewSync};
pub use diff::{diff, Patch, ValueKind};
pub use error::{HostError, SyncError};
pub use flatten::{Snapshot, TreeFlattener};
pub use host::{Host, MemoryHost};
pub use keypath::{KeyPathEncoder, PathKey};
pub use metrics::LatencyTimer;
pub use throttle::{
    Clock, Coalesce, DispatchOutcome, ManualClock, MonotonicClock, Scheduler, SystemClock,
    ThrottleOptions, ThrottledDispatcher, TimerHandle, TokioScheduler,
};
pub use tree::{ComponentArena, ComponentTree, NodeId, StateSource};
