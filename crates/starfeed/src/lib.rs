//! Starfeed - release tracking for starred GitHub repositories.
//!
//! The library is the synchronization engine behind the feeds: it keeps each
//! user's starred repositories in sync with GitHub, turns new tags into
//! `versions` rows, and tells a WebSub hub when feeds change.
//!
//! # Features
//!
//! - `sqlite` / `postgres` - database backends
//! - `migrate` - database migration support, including
//!   [`connect_and_migrate`]
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use starfeed::{
//!     CredentialSelector, DbStore, Engine, GitHubClientFactory, NullPublisher, SyncOptions,
//!     WorkItem, connect_and_migrate,
//! };
//!
//! let store = Arc::new(DbStore::new(connect_and_migrate("sqlite://starfeed.db?mode=rwc").await?));
//! let selector = CredentialSelector::new(store.clone(), Arc::new(GitHubClientFactory::default()), None);
//! let engine = Engine::new(store, Arc::new(selector), Arc::new(NullPublisher), SyncOptions::default());
//!
//! let outcome = engine.handle(&WorkItem::SyncVersion { repo_id: 724712 }).await?;
//! println!("{outcome}");
//! ```

pub mod credentials;
pub mod db;
pub mod entity;
pub mod github;
pub mod http;
pub mod publisher;
pub mod retry;
pub mod store;
pub mod sync;
pub mod worker;

#[cfg(feature = "migrate")]
pub mod migration;

pub use credentials::{
    ClientFactory, Credential, CredentialSelector, GitHubClientFactory, Identity, Quota,
    SelectedClient, THRESHOLD_APP, THRESHOLD_USER, probe_quota,
};
pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use github::{ApiError, ApiRateLimiter, GitHubApi, GitHubClient, ListingKind};
pub use http::{HttpTransport, ReqwestTransport};
pub use publisher::{NullPublisher, Publisher, WebSubPublisher};
pub use store::{DbStore, Store, StoreError, UserCredential};
pub use sync::{AbortReason, StopReason, SyncError, SyncOptions, SyncOutcome};
pub use worker::{DEFAULT_CONCURRENCY, Engine, QueueStats, WorkItem};
