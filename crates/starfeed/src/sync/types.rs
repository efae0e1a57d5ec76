//! Shared sync types and constants.

use std::fmt;

use chrono::Duration;
use thiserror::Error;

use crate::github::DEFAULT_PAGE_SIZE;
use crate::store::StoreError;

/// Staged versions are written once this many have accumulated.
pub const DEFAULT_FLUSH_EVERY: usize = 200;

/// Options shared by the synchronizers.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Items requested per listing page.
    pub page_size: u32,
    /// Known repositories older than this are refreshed during star sync.
    pub stale_after: Duration,
    /// Flush staged versions every this many.
    pub flush_every: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            stale_after: Duration::days(1),
            flush_every: DEFAULT_FLUSH_EVERY,
        }
    }
}

/// Why a unit of work ended without doing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// No credential with enough quota was available.
    NoClient,
    UserNotFound,
    RepoNotFound,
    /// The quota probe returned zero or failed.
    QuotaExhausted,
    /// The entity answered 404 or 451 and has just been marked removed.
    RemovedUpstream,
    /// The first remote call failed for another reason. Retry later.
    RemoteFailure,
    /// The entity was already marked removed by an earlier run.
    AlreadyRemoved,
}

impl AbortReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoClient => "no-client",
            Self::UserNotFound => "user-not-found",
            Self::RepoNotFound => "repo-not-found",
            Self::QuotaExhausted => "quota-exhausted",
            Self::RemovedUpstream => "removed-upstream",
            Self::RemoteFailure => "remote-failure",
            Self::AlreadyRemoved => "already-removed",
        }
    }
}

/// Why a unit of work stopped before reaching the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A remote call failed mid-walk. Progress made so far is kept.
    RemoteFailure,
    /// Markdown rendering failed, most likely due to abuse throttling.
    RenderingFailure,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RemoteFailure => "remote-failure",
            Self::RenderingFailure => "rendering-failure",
        }
    }
}

/// Result of one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Ran to the end. Holds the followed-repo count (star sync) or the
    /// number of new versions (version sync).
    Completed(usize),
    /// Stopped early. `count` covers what was processed before the stop.
    Partial { count: usize, reason: StopReason },
    /// Nothing was done.
    Aborted(AbortReason),
}

impl SyncOutcome {
    /// The processed count, or `None` when the unit was aborted.
    pub fn count(&self) -> Option<usize> {
        match self {
            Self::Completed(count) | Self::Partial { count, .. } => Some(*count),
            Self::Aborted(_) => None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(count) => write!(f, "completed ({count})"),
            Self::Partial { count, reason } => {
                write!(f, "partial ({count}, {})", reason.as_str())
            }
            Self::Aborted(reason) => write!(f, "aborted ({})", reason.as_str()),
        }
    }
}

/// Unexpected faults that end a unit of work.
///
/// Expected conditions (missing entities, removals, quota, remote hiccups)
/// are reported through [`SyncOutcome`] instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
