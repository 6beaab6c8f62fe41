//! Sync entry points: `init_sync` (full) and `update_sync` (incremental).
//!
//! Both diff against the host's *effective* state: what the host has
//! applied, overlaid with whatever patch is still waiting in the throttle.
//! Without the overlay a change that is reverted inside one window would
//! diff as "in sync" and the stale pending value would win.

use serde_json::Value;
use tracing::debug;

use crate::diff::{self, Patch};
use crate::error::SyncError;
use crate::host::{field_path, Host};
use crate::metrics::{self, LatencyTimer};
use crate::throttle::DispatchOutcome;
use crate::tree::{ComponentTree, NodeId};

use super::{SkipReason, SyncOutcome, SyncPass, ViewSync};

impl<H: Host + 'static> ViewSync<H> {
    /// Full sync of the tree containing `node`.
    ///
    /// Flattens everything from `node`'s root, diffs against the host and
    /// delivers a non-empty patch immediately, together with anything the
    /// throttle was holding. Used when a page or subtree first attaches.
    #[tracing::instrument(skip(self, tree))]
    pub fn init_sync<T: ComponentTree + ?Sized>(
        &self,
        tree: &T,
        node: NodeId,
    ) -> Result<SyncOutcome, SyncError> {
        let pass = SyncPass::Init;
        if let Some(reason) = self.skip_reason(tree, node)? {
            return Ok(self.skipped(pass, node, reason));
        }
        let _timer = LatencyTimer::new(pass.as_str());

        let root = tree.root_of(node);
        let snapshot = self.flattener.flatten(tree, root)?;
        metrics::record_snapshot_records(snapshot.len());

        let patch = diff::diff(snapshot.as_map(), &self.effective_state());
        if patch.is_empty() {
            return Ok(self.finish(pass, SyncOutcome::InSync));
        }

        let entries = patch.len();
        metrics::record_patch_entries(pass.as_str(), entries);
        self.dispatcher.submit_now(patch)?;
        Ok(self.finish(pass, SyncOutcome::Delivered { entries }))
    }

    /// Incremental sync of one component after its state changed.
    ///
    /// Only `node`'s own record is formatted and diffed. The patch goes
    /// through the shared throttle: delivered now on a leading edge, or
    /// queued and merged until the window closes.
    #[tracing::instrument(skip(self, tree))]
    pub fn update_sync<T: ComponentTree + ?Sized>(
        &self,
        tree: &T,
        node: NodeId,
    ) -> Result<SyncOutcome, SyncError> {
        let pass = SyncPass::Update;
        if let Some(reason) = self.skip_reason(tree, node)? {
            return Ok(self.skipped(pass, node, reason));
        }
        let _timer = LatencyTimer::new(pass.as_str());

        let record = self.flattener.format(tree, node)?;
        let patch = diff::diff(record.as_map(), &self.effective_state());
        if patch.is_empty() {
            return Ok(self.finish(pass, SyncOutcome::InSync));
        }

        let entries = patch.len();
        metrics::record_patch_entries(pass.as_str(), entries);
        let outcome = match self.dispatcher.submit(patch)? {
            DispatchOutcome::Delivered => SyncOutcome::Delivered { entries },
            DispatchOutcome::Scheduled { .. } | DispatchOutcome::Merged | DispatchOutcome::Held => {
                SyncOutcome::Queued { entries }
            }
        };
        Ok(self.finish(pass, outcome))
    }

    /// Host state with the pending patch applied on top.
    #[must_use]
    pub fn effective_state(&self) -> Value {
        let mut state = self.host.state();
        if let Some(pending) = self.dispatcher.pending() {
            overlay(&mut state, &pending);
        }
        state
    }

    fn skip_reason<T: ComponentTree + ?Sized>(
        &self,
        tree: &T,
        node: NodeId,
    ) -> Result<Option<SkipReason>, SyncError> {
        if !tree.contains(node) {
            return Err(SyncError::UnknownNode(node));
        }
        if tree.is_destroyed(node) {
            return Ok(Some(SkipReason::Destroyed));
        }
        if !self.host.is_ready() {
            return Ok(Some(SkipReason::HostNotReady));
        }
        Ok(None)
    }

    fn skipped(&self, pass: SyncPass, node: NodeId, reason: SkipReason) -> SyncOutcome {
        debug!(%pass, %node, %reason, "Sync skipped");
        metrics::record_skip(pass.as_str(), reason.as_str());
        SyncOutcome::Skipped(reason)
    }

    fn finish(&self, pass: SyncPass, outcome: SyncOutcome) -> SyncOutcome {
        debug!(%pass, %outcome, "Sync pass complete");
        metrics::record_sync(pass.as_str(), outcome.as_str());
        outcome
    }
}

fn overlay(state: &mut Value, patch: &Patch) {
    for (path, value) in patch.iter() {
        // Pending paths come from the differ and always parse
        if let Ok(segments) = field_path::parse(path) {
            field_path::set(state, &segments, value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::error::HostError;
    use crate::host::MemoryHost;
    use crate::throttle::{ManualClock, TokioScheduler};
    use crate::tree::{ComponentArena, StateSource};
    use serde_json::json;
    use std::sync::Arc;

    struct Fixture {
        tree: ComponentArena,
        root: NodeId,
        child: NodeId,
        host: Arc<MemoryHost>,
        clock: Arc<ManualClock>,
        sync: ViewSync<MemoryHost>,
    }

    fn fixture() -> Fixture {
        let mut tree = ComponentArena::new();
        let root = tree.insert_root(Some("0")).unwrap();
        let child = tree.insert_child(root, "1").unwrap();
        tree.set_field(child, StateSource::State, "count", json!(1)).unwrap();

        let host = Arc::new(MemoryHost::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let sync = ViewSync::with_runtime(
            SyncConfig::default(),
            host.clone(),
            Arc::new(TokioScheduler::current().unwrap()),
            clock.clone(),
        )
        .unwrap();
        Fixture { tree, root, child, host, clock, sync }
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_sync_delivers_full_records() {
        let f = fixture();
        let outcome = f.sync.init_sync(&f.tree, f.root).unwrap();
        assert_eq!(outcome, SyncOutcome::Delivered { entries: 2 });

        let applied = f.host.applied();
        assert_eq!(applied.len(), 1);
        assert_eq!(
            applied[0].get("$root.0,1"),
            Some(&json!({"count": 1, "$k": "0,1", "$kk": "0,1,", "$p": "0"}))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_sync_twice_is_in_sync() {
        let f = fixture();
        f.sync.init_sync(&f.tree, f.child).unwrap();
        assert_eq!(f.sync.init_sync(&f.tree, f.child).unwrap(), SyncOutcome::InSync);
        assert_eq!(f.host.apply_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_sync_sends_only_changed_field() {
        let mut f = fixture();
        f.sync.init_sync(&f.tree, f.root).unwrap();
        f.clock.advance(100);

        f.tree.set_field(f.child, StateSource::State, "count", json!(2)).unwrap();
        let outcome = f.sync.update_sync(&f.tree, f.child).unwrap();
        assert_eq!(outcome, SyncOutcome::Delivered { entries: 1 });

        let applied = f.host.applied();
        assert_eq!(applied[1], [("$root.0,1.count".to_string(), json!(2))].into_iter().collect());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_update_after_init_is_leading_edge() {
        let mut f = fixture();
        f.sync.init_sync(&f.tree, f.root).unwrap();

        f.tree.set_field(f.child, StateSource::State, "count", json!(2)).unwrap();
        assert_eq!(
            f.sync.update_sync(&f.tree, f.child).unwrap(),
            SyncOutcome::Delivered { entries: 1 }
        );
        assert_eq!(f.host.apply_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_inside_window_is_queued() {
        let mut f = fixture();
        f.sync.init_sync(&f.tree, f.root).unwrap();
        f.tree.set_field(f.child, StateSource::State, "count", json!(2)).unwrap();
        f.sync.update_sync(&f.tree, f.child).unwrap();

        f.clock.advance(10);
        f.tree.set_field(f.child, StateSource::State, "count", json!(3)).unwrap();
        assert_eq!(
            f.sync.update_sync(&f.tree, f.child).unwrap(),
            SyncOutcome::Queued { entries: 1 }
        );
        assert_eq!(f.host.apply_count(), 2);
        assert_eq!(f.sync.effective_state()["$root"]["0,1"]["count"], json!(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_revert_inside_window_overrides_pending() {
        let mut f = fixture();
        f.sync.init_sync(&f.tree, f.root).unwrap();
        f.tree.set_field(f.child, StateSource::State, "count", json!(2)).unwrap();
        f.sync.update_sync(&f.tree, f.child).unwrap();

        // Host holds 2, pending holds 3, then the component goes back to 2
        f.tree.set_field(f.child, StateSource::State, "count", json!(3)).unwrap();
        f.sync.update_sync(&f.tree, f.child).unwrap();
        f.tree.set_field(f.child, StateSource::State, "count", json!(2)).unwrap();
        assert_eq!(
            f.sync.update_sync(&f.tree, f.child).unwrap(),
            SyncOutcome::Queued { entries: 1 }
        );

        assert!(f.sync.flush().unwrap());
        assert_eq!(f.host.state()["$root"]["0,1"]["count"], json!(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delimiter_field_name_updates_inline() {
        let mut f = fixture();
        f.tree.set_field(f.child, StateSource::State, "m", json!({"k]": 1})).unwrap();
        f.sync.init_sync(&f.tree, f.root).unwrap();

        f.tree.set_field(f.child, StateSource::State, "m", json!({"k]": 3})).unwrap();
        assert_eq!(
            f.sync.update_sync(&f.tree, f.child).unwrap(),
            SyncOutcome::Delivered { entries: 1 }
        );
        assert_eq!(f.host.applied()[1].get("$root.0,1.m"), Some(&json!({"k]": 3})));
        assert_eq!(f.sync.update_sync(&f.tree, f.child).unwrap(), SyncOutcome::InSync);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroyed_node_is_skipped() {
        let mut f = fixture();
        f.tree.destroy(f.child).unwrap();
        assert_eq!(
            f.sync.update_sync(&f.tree, f.child).unwrap(),
            SyncOutcome::Skipped(SkipReason::Destroyed)
        );
        assert_eq!(
            f.sync.init_sync(&f.tree, f.child).unwrap(),
            SyncOutcome::Skipped(SkipReason::Destroyed)
        );
        assert_eq!(f.host.apply_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_not_ready_is_skipped() {
        let f = fixture();
        f.host.set_ready(false);
        assert_eq!(
            f.sync.init_sync(&f.tree, f.root).unwrap(),
            SyncOutcome::Skipped(SkipReason::HostNotReady)
        );
        assert_eq!(f.host.apply_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_node_is_an_error() {
        let f = fixture();
        let result = f.sync.update_sync(&f.tree, NodeId(99));
        assert!(matches!(result, Err(SyncError::UnknownNode(NodeId(99)))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_rejection_propagates() {
        let f = fixture();
        f.host.set_rejecting(Some("detached".into()));
        let result = f.sync.init_sync(&f.tree, f.root);
        assert!(matches!(result, Err(SyncError::Host(HostError::Rejected(_)))));
    }

    #[test]
    fn test_new_without_runtime_fails() {
        let result = ViewSync::new(SyncConfig::default(), Arc::new(MemoryHost::new()));
        assert!(matches!(result, Err(SyncError::NoRuntime)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SyncConfig {
            key_separator: ".".into(),
            ..Default::default()
        };
        let result = ViewSync::with_runtime(
            config,
            Arc::new(MemoryHost::new()),
            Arc::new(crate::throttle::TokioScheduler::new(
                tokio::runtime::Builder::new_current_thread().build().unwrap().handle().clone(),
            )),
            Arc::new(ManualClock::new(0)),
        );
        assert!(matches!(result, Err(SyncError::Config(_))));
    }
}
