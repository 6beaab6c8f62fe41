// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Throttled delivery with payload coalescing.
//!
//! The [`ThrottledDispatcher`] wraps a delivery function and guarantees at
//! most one delivery per window `W` under continuous submission. Payloads
//! submitted while the window is closed are merged into one pending payload
//! and delivered by a single trailing-edge timer.
//!
//! ```text
//!            W                 W
//! |<--------------->|<--------------->|
//! p1                p2   p3           (quiet)
//! ▼                 ▼    ▼
//! deliver(p1)       armed ─────────── deliver(p2 ∪ p3)
//! (leading edge)                      (trailing edge)
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use std::time::Duration;
//! use view_sync::{Patch, ThrottledDispatcher, ThrottleOptions};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let delivered = Arc::new(Mutex::new(Vec::new()));
//! let sink = delivered.clone();
//! let dispatcher = ThrottledDispatcher::new(
//!     Duration::from_millis(50),
//!     ThrottleOptions::default(),
//!     move |patch: Patch| {
//!         sink.lock().unwrap().push(patch);
//!         Ok(())
//!     },
//! )
//! .unwrap();
//!
//! let mut patch = Patch::new();
//! patch.set("$root.0.count", json!(1));
//! dispatcher.submit(patch).unwrap();
//!
//! // Leading edge: delivered immediately
//! assert_eq!(delivered.lock().unwrap().len(), 1);
//! # }
//! ```

mod clock;
mod scheduler;

pub use clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use scheduler::{Scheduler, Task, TimerHandle, TokioScheduler};

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::metrics;

/// Payloads that can absorb a later payload of the same type.
pub trait Coalesce: Sized {
    /// Merge `later` into `self`; on conflict `later` wins.
    fn coalesce(&mut self, later: Self);

    /// Size used for metrics and logging.
    #[must_use]
    fn entry_count(&self) -> usize {
        1
    }
}

/// Edge behaviour of a dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleOptions {
    /// Deliver the first submission of a burst immediately
    pub leading_edge: bool,
    /// Deliver the merged tail of a burst when the window closes
    pub trailing_edge: bool,
}

impl Default for ThrottleOptions {
    fn default() -> Self {
        Self {
            leading_edge: true,
            trailing_edge: true,
        }
    }
}

/// What a [`ThrottledDispatcher::submit`] call did with its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Delivered inline (window open)
    Delivered,
    /// Merged into the pending payload and a trailing timer armed
    Scheduled { after: Duration },
    /// Merged into the pending payload; a timer was already armed
    Merged,
    /// Merged into the pending payload with no timer (trailing edge off);
    /// goes out with the next inline delivery
    Held,
}

/// Delivery function wrapped by a dispatcher.
pub type DeliverFn<P> = Arc<dyn Fn(P) -> Result<(), SyncError> + Send + Sync>;

struct ArmedTimer {
    handle: TimerHandle,
    generation: u64,
}

struct DispatchState<P> {
    /// Baseline for the window; `None` before the first delivery
    last_delivery: Option<i64>,
    pending: Option<P>,
    armed: Option<ArmedTimer>,
    generation: u64,
}

struct Inner<P> {
    window_ms: i64,
    options: ThrottleOptions,
    deliver: DeliverFn<P>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    state: Mutex<DispatchState<P>>,
}

/// Rate-limited, coalescing delivery channel.
///
/// Cheap to clone; clones share the same window, pending payload and timer.
pub struct ThrottledDispatcher<P> {
    inner: Arc<Inner<P>>,
}

impl<P> Clone for ThrottledDispatcher<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> std::fmt::Debug for ThrottledDispatcher<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ThrottledDispatcher")
            .field("window_ms", &self.inner.window_ms)
            .field("options", &self.inner.options)
            .field("last_delivery", &state.last_delivery)
            .field("pending", &state.pending.is_some())
            .field("armed", &state.armed.is_some())
            .finish()
    }
}

impl<P: Coalesce + Send + 'static> ThrottledDispatcher<P> {
    /// Dispatcher on the current tokio runtime with a monotonic clock.
    pub fn new<F>(window: Duration, options: ThrottleOptions, deliver: F) -> Result<Self, SyncError>
    where
        F: Fn(P) -> Result<(), SyncError> + Send + Sync + 'static,
    {
        Ok(Self::with_parts(
            window,
            options,
            Arc::new(deliver),
            Arc::new(MonotonicClock::new()),
            Arc::new(TokioScheduler::current()?),
        ))
    }

    /// Dispatcher with an explicit clock and scheduler.
    pub fn with_parts(
        window: Duration,
        options: ThrottleOptions,
        deliver: DeliverFn<P>,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                window_ms: i64::try_from(window.as_millis()).unwrap_or(i64::MAX),
                options,
                deliver,
                clock,
                scheduler,
                state: Mutex::new(DispatchState {
                    last_delivery: None,
                    pending: None,
                    armed: None,
                    generation: 0,
                }),
            }),
        }
    }

    /// Submit a payload.
    ///
    /// Delivers inline when the window is open, otherwise merges into the
    /// pending payload. Errors from an inline delivery are returned as-is;
    /// the delivered payload is not retried.
    pub fn submit(&self, payload: P) -> Result<DispatchOutcome, SyncError> {
        Inner::submit(&self.inner, payload)
    }

    /// Deliver `payload` now, merged after whatever is pending, bypassing
    /// the window. Disarms the timer.
    ///
    /// The window baseline is left alone: an immediate delivery neither
    /// opens nor extends a throttle window, so the next [`submit`](Self::submit)
    /// sees the same edge it would have seen without this call.
    pub fn submit_now(&self, payload: P) -> Result<(), SyncError> {
        let merged = {
            let mut state = self.inner.state.lock();
            if let Some(armed) = state.armed.take() {
                armed.handle.cancel();
            }
            match state.pending.take() {
                Some(mut pending) => {
                    pending.coalesce(payload);
                    pending
                }
                None => payload,
            }
        };
        self.inner.deliver_now(merged, "immediate")
    }

    /// Deliver the pending payload now, if any, and disarm the timer.
    ///
    /// Returns whether anything was delivered.
    pub fn flush(&self) -> Result<bool, SyncError> {
        let payload = {
            let mut state = self.inner.state.lock();
            if let Some(armed) = state.armed.take() {
                armed.handle.cancel();
            }
            let payload = state.pending.take();
            if payload.is_some() {
                state.last_delivery = Some(self.inner.clock.now_ms());
            }
            payload
        };
        match payload {
            Some(payload) => {
                self.inner.deliver_now(payload, "flush")?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// A trailing-edge timer is pending.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.inner
            .state
            .lock()
            .armed
            .as_ref()
            .is_some_and(|armed| armed.handle.is_scheduled())
    }

    /// Entries waiting for delivery.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner
            .state
            .lock()
            .pending
            .as_ref()
            .map_or(0, Coalesce::entry_count)
    }

    /// Copy of the payload waiting for delivery.
    #[must_use]
    pub fn pending(&self) -> Option<P>
    where
        P: Clone,
    {
        self.inner.state.lock().pending.clone()
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.inner.window_ms).unwrap_or(0))
    }

    #[must_use]
    pub fn options(&self) -> ThrottleOptions {
        self.inner.options
    }
}

impl<P: Coalesce + Send + 'static> Inner<P> {
    fn submit(this: &Arc<Self>, payload: P) -> Result<DispatchOutcome, SyncError> {
        let now = this.clock.now_ms();
        let mut state = this.state.lock();

        if state.last_delivery.is_none() && !this.options.leading_edge {
            state.last_delivery = Some(now);
        }

        let (merged, coalesced) = match state.pending.take() {
            Some(mut pending) => {
                pending.coalesce(payload);
                (pending, true)
            }
            None => (payload, false),
        };

        let elapsed = state.last_delivery.map(|last| now.saturating_sub(last));
        let remaining = match elapsed {
            None => None,
            Some(e) if e >= this.window_ms || e < 0 => None,
            Some(e) => Some(this.window_ms - e),
        };

        let Some(remaining) = remaining else {
            if let Some(armed) = state.armed.take() {
                armed.handle.cancel();
            }
            state.last_delivery = Some(now);
            drop(state);
            let edge = if elapsed.is_some_and(|e| e < 0) { "immediate" } else { "leading" };
            this.deliver_now(merged, edge)?;
            return Ok(DispatchOutcome::Delivered);
        };

        let entries = merged.entry_count();
        state.pending = Some(merged);
        if coalesced {
            metrics::record_coalesced();
        }
        metrics::set_pending_entries(entries);

        if state.armed.is_some() {
            return Ok(DispatchOutcome::Merged);
        }
        if !this.options.trailing_edge {
            return Ok(DispatchOutcome::Held);
        }

        let after = Duration::from_millis(u64::try_from(remaining).unwrap_or(0));
        state.generation += 1;
        let generation = state.generation;
        let fire = Arc::clone(this);
        let handle = this
            .scheduler
            .schedule_once(after, Box::new(move || fire.fire(generation)));
        state.armed = Some(ArmedTimer { handle, generation });
        debug!(after_ms = remaining, entries, "Trailing-edge delivery armed");
        Ok(DispatchOutcome::Scheduled { after })
    }

    fn fire(&self, generation: u64) {
        let payload = {
            let mut state = self.state.lock();
            match &state.armed {
                Some(armed) if armed.generation == generation => {}
                _ => return,
            }
            state.armed = None;
            state.last_delivery = if self.options.leading_edge {
                Some(self.clock.now_ms())
            } else {
                None
            };
            state.pending.take()
        };

        let Some(payload) = payload else { return };
        if let Err(e) = self.deliver_now(payload, "trailing") {
            warn!(error = %e, "Trailing-edge delivery failed");
        }
    }

    fn deliver_now(&self, payload: P, edge: &'static str) -> Result<(), SyncError> {
        let entries = payload.entry_count();
        metrics::set_pending_entries(0);
        match (self.deliver)(payload) {
            Ok(()) => {
                metrics::record_delivery(edge);
                debug!(edge, entries, "Payload delivered");
                Ok(())
            }
            Err(e) => {
                metrics::record_delivery_error(edge);
                Err(e)
            }
        }
    }
}
