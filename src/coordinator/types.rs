//! Public types for the sync coordinator.

/// Which entry point ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPass {
    /// Full flatten, delivered immediately
    Init,
    /// Single record, delivered through the throttle
    Update,
}

impl SyncPass {
    /// Metric label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Update => "update",
        }
    }
}

impl std::fmt::Display for SyncPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a sync call did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The component (or an ancestor) has been destroyed
    Destroyed,
    /// The host does not accept updates
    HostNotReady,
}

impl SkipReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Destroyed => "destroyed",
            Self::HostNotReady => "host_not_ready",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`init_sync`](super::ViewSync::init_sync) or
/// [`update_sync`](super::ViewSync::update_sync).
///
/// Skips are not errors: a destroyed component or a host that is not ready
/// simply means there is nothing to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing was flattened or diffed
    Skipped(SkipReason),
    /// Diff came back empty; the host is already up to date
    InSync,
    /// The patch reached the host during this call
    Delivered { entries: usize },
    /// The patch is waiting in the throttle for its window
    Queued { entries: usize },
}

impl SyncOutcome {
    /// Metric label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skipped(_) => "skipped",
            Self::InSync => "in_sync",
            Self::Delivered { .. } => "delivered",
            Self::Queued { .. } => "queued",
        }
    }

    #[must_use]
    pub fn is_skipped(self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skipped(reason) => write!(f, "skipped ({reason})"),
            Self::InSync => write!(f, "in sync"),
            Self::Delivered { entries } => write!(f, "delivered {entries} entries"),
            Self::Queued { entries } => write!(f, "queued {entries} entries"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        assert_eq!(SyncOutcome::Skipped(SkipReason::HostNotReady).to_string(), "skipped (host_not_ready)");
        assert_eq!(SyncOutcome::Delivered { entries: 3 }.to_string(), "delivered 3 entries");
        assert_eq!(SyncOutcome::Queued { entries: 1 }.as_str(), "queued");
    }

    #[test]
    fn test_is_skipped() {
        assert!(SyncOutcome::Skipped(SkipReason::Destroyed).is_skipped());
        assert!(!SyncOutcome::InSync.is_skipped());
    }
}
