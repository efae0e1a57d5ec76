//! The two synchronizers driven by the worker.
//!
//! - [`stars`] reconciles a user's followed repositories with GitHub.
//! - [`versions`] turns a repository's tags into `versions` rows.
//!
//! Both take an already selected client and report expected conditions as a
//! [`SyncOutcome`]; only store faults come back as [`SyncError`].

pub mod stars;
mod types;
pub mod versions;

pub use stars::sync_starred_repos;
pub use types::{
    AbortReason, DEFAULT_FLUSH_EVERY, Result, StopReason, SyncError, SyncOptions, SyncOutcome,
};
pub use versions::{blob_body, strip_pgp_signature, sync_versions};
