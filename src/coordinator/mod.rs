// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Sync coordinator.
//!
//! [`ViewSync`] ties the pieces together for one host:
//! - [`TreeFlattener`] turns components into path-keyed records
//! - [`diff`](crate::diff::diff) compares them with the host's applied state
//! - a shared [`ThrottledDispatcher`] rate-limits incremental patches
//!
//! # Flow
//!
//! ```text
//! init_sync(node)                     update_sync(node)
//!   │ flatten(root_of(node))            │ format(node)
//!   ▼                                   ▼
//! diff(snapshot, host.state())        diff(record, host.state())
//!   │                                   │
//!   ▼                                   ▼
//! host.apply(patch)                   dispatcher.submit(patch)
//! (immediate)                           │ leading / trailing edge
//!                                       ▼
//!                                     host.apply(merged patch)
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use view_sync::{ComponentArena, Host, MemoryHost, StateSource, SyncConfig, SyncOutcome, ViewSync};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut tree = ComponentArena::new();
//! let root = tree.insert_root(Some("0")).unwrap();
//! let child = tree.insert_child(root, "1").unwrap();
//! tree.set_field(child, StateSource::State, "count", json!(1)).unwrap();
//!
//! let host = Arc::new(MemoryHost::new());
//! let sync = ViewSync::new(SyncConfig::default(), host.clone()).unwrap();
//!
//! let outcome = sync.init_sync(&tree, child).unwrap();
//! assert_eq!(outcome, SyncOutcome::Delivered { entries: 2 });
//! assert_eq!(host.state()["$root"]["0,1"]["count"], json!(1));
//! # }
//! ```

mod api;
mod types;

pub use types::{SkipReason, SyncOutcome, SyncPass};

use std::sync::Arc;

use tracing::info;

use crate::config::SyncConfig;
use crate::diff::Patch;
use crate::error::SyncError;
use crate::flatten::TreeFlattener;
use crate::host::Host;
use crate::keypath::KeyPathEncoder;
use crate::throttle::{
    Clock, DeliverFn, MonotonicClock, Scheduler, ThrottledDispatcher, TokioScheduler,
};

/// Keeps one host in sync with a component tree.
///
/// One `ViewSync` owns one throttle channel: every `update_sync` call,
/// whichever component it names, shares the same window and pending patch.
pub struct ViewSync<H: Host> {
    config: SyncConfig,
    flattener: TreeFlattener,
    host: Arc<H>,
    dispatcher: ThrottledDispatcher<Patch>,
}

impl<H: Host + 'static> ViewSync<H> {
    /// Create a coordinator on the current tokio runtime.
    ///
    /// Fails if the configuration breaks the key-compression contract or
    /// if no runtime is available for trailing-edge timers.
    pub fn new(config: SyncConfig, host: Arc<H>) -> Result<Self, SyncError> {
        let scheduler = TokioScheduler::current()?;
        Self::with_runtime(config, host, Arc::new(scheduler), Arc::new(MonotonicClock::new()))
    }

    /// Create a coordinator with an explicit scheduler and clock.
    pub fn with_runtime(
        config: SyncConfig,
        host: Arc<H>,
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SyncError> {
        config.validate()?;

        let sink = Arc::clone(&host);
        let deliver: DeliverFn<Patch> =
            Arc::new(move |patch: Patch| sink.apply(patch).map_err(SyncError::from));
        let dispatcher = ThrottledDispatcher::with_parts(
            config.throttle_window(),
            config.throttle_options(),
            deliver,
            clock,
            scheduler,
        );

        info!(
            throttle_ms = config.throttle_ms,
            leading_edge = config.leading_edge,
            trailing_edge = config.trailing_edge,
            namespace = %config.root_namespace,
            "View sync created"
        );

        Ok(Self {
            flattener: TreeFlattener::new(KeyPathEncoder::from_config(&config)),
            config,
            host,
            dispatcher,
        })
    }

    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    #[must_use]
    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    #[must_use]
    pub fn flattener(&self) -> &TreeFlattener {
        &self.flattener
    }

    /// The shared throttle channel.
    #[must_use]
    pub fn dispatcher(&self) -> &ThrottledDispatcher<Patch> {
        &self.dispatcher
    }

    /// Deliver any queued patch now. Call before tearing the host down.
    pub fn flush(&self) -> Result<bool, SyncError> {
        self.dispatcher.flush()
    }
}

impl<H: Host> std::fmt::Debug for ViewSync<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewSync")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
