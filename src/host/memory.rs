use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};

use super::field_path;
use super::Host;
use crate::diff::Patch;
use crate::error::HostError;

/// Host that keeps its applied state in memory.
///
/// Records every accepted patch, which makes it the host of choice for
/// tests and demos.
pub struct MemoryHost {
    state: RwLock<Value>,
    ready: AtomicBool,
    applied: Mutex<Vec<Patch>>,
    reject_with: Mutex<Option<String>>,
}

impl MemoryHost {
    /// Empty, ready host.
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(Value::Object(Map::new()))
    }

    /// Ready host starting from `state`.
    #[must_use]
    pub fn with_state(state: Value) -> Self {
        Self {
            state: RwLock::new(state),
            ready: AtomicBool::new(true),
            applied: Mutex::new(Vec::new()),
            reject_with: Mutex::new(None),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Make every following `apply` fail with `reason` (`None` to accept again).
    pub fn set_rejecting(&self, reason: Option<String>) {
        *self.reject_with.lock() = reason;
    }

    /// Patches applied so far, oldest first.
    #[must_use]
    pub fn applied(&self) -> Vec<Patch> {
        self.applied.lock().clone()
    }

    /// Number of successful apply calls
    #[must_use]
    pub fn apply_count(&self) -> usize {
        self.applied.lock().len()
    }

    pub fn clear_log(&self) {
        self.applied.lock().clear();
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHost")
            .field("ready", &self.is_ready())
            .field("applied", &self.apply_count())
            .finish_non_exhaustive()
    }
}

impl Host for MemoryHost {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn state(&self) -> Value {
        self.state.read().clone()
    }

    fn apply(&self, patch: Patch) -> Result<(), HostError> {
        if let Some(reason) = self.reject_with.lock().clone() {
            return Err(HostError::Rejected(reason));
        }

        // Parse everything first so a bad path leaves the state untouched
        let parsed = patch
            .iter()
            .map(|(path, value)| Ok((field_path::parse(path)?, value.clone())))
            .collect::<Result<Vec<_>, HostError>>()?;

        {
            let mut state = self.state.write();
            for (segments, value) in parsed {
                field_path::set(&mut state, &segments, value);
            }
        }
        self.applied.lock().push(patch);
        Ok(())
    }
}
