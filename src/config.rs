//! Configuration for view synchronization.
//!
//! # Example
//!
//! ```
//! use view_sync::SyncConfig;
//!
//! // Minimal config (uses defaults)
//! let config = SyncConfig::default();
//! assert_eq!(config.throttle_ms, 50);
//! assert_eq!(config.root_namespace, "$root");
//!
//! // Custom config
//! let config = SyncConfig {
//!     throttle_ms: 16,
//!     trailing_edge: false,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::SyncError;
use crate::throttle::ThrottleOptions;

/// Characters reserved by the field-path grammar (`a.b[2].c`).
pub(crate) const PATH_DELIMITERS: [char; 3] = ['.', '[', ']'];

/// Configuration for a [`ViewSync`](crate::ViewSync).
///
/// All fields have defaults matching the rendering host's recommended
/// update cadence.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Throttle window for incremental updates, in milliseconds (default: 50)
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,

    /// Deliver the first submission of a burst immediately (default: true)
    #[serde(default = "default_true")]
    pub leading_edge: bool,

    /// Deliver the merged tail of a burst once the window closes (default: true)
    #[serde(default = "default_true")]
    pub trailing_edge: bool,

    /// Top-level host field holding all flattened records (default: "$root")
    #[serde(default = "default_root_namespace")]
    pub root_namespace: String,

    /// Joins component keys inside a path key (default: ",")
    #[serde(default = "default_key_separator")]
    pub key_separator: String,
}

fn default_throttle_ms() -> u64 { 50 }
fn default_true() -> bool { true }
fn default_root_namespace() -> String { "$root".to_string() }
fn default_key_separator() -> String { ",".to_string() }

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            throttle_ms: default_throttle_ms(),
            leading_edge: default_true(),
            trailing_edge: default_true(),
            root_namespace: default_root_namespace(),
            key_separator: default_key_separator(),
        }
    }
}

impl SyncConfig {
    /// Throttle window as a [`Duration`].
    #[must_use]
    pub fn throttle_window(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    /// Edge settings for the shared dispatcher.
    #[must_use]
    pub fn throttle_options(&self) -> ThrottleOptions {
        ThrottleOptions {
            leading_edge: self.leading_edge,
            trailing_edge: self.trailing_edge,
        }
    }

    /// Check the key-compression contract.
    ///
    /// A snapshot key is `namespace.pathkey` and the differ resolves it
    /// against host state by splitting on `.`, so neither the namespace nor
    /// the separator may contain a path delimiter.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.root_namespace.is_empty() {
            return Err(SyncError::Config("root_namespace must not be empty".into()));
        }
        if self.root_namespace.contains(PATH_DELIMITERS) {
            return Err(SyncError::Config(format!(
                "root_namespace '{}' contains a field path delimiter",
                self.root_namespace
            )));
        }
        if self.key_separator.is_empty() {
            return Err(SyncError::Config("key_separator must not be empty".into()));
        }
        if self.key_separator.contains(PATH_DELIMITERS) {
            return Err(SyncError::Config(format!(
                "key_separator '{}' contains a field path delimiter",
                self.key_separator
            )));
        }
        Ok(())
    }
}
