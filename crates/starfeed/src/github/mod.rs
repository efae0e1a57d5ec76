//! GitHub API access for the sync engine.
//!
//! # Module Structure
//!
//! - [`error`] - [`ApiError`] and its classification helpers
//! - [`types`] - Wire data and the [`GitHubApi`] trait the engine depends on
//! - [`listing`] - REST and GraphQL listing strategies
//! - [`client`] - The octocrab-backed [`GitHubClient`]
//! - [`rate_limit`] - Client-side request pacing
//! - `routes` - Percent-encoded REST paths
//! - [`convert`] - Conversion to starfeed entities
//!
//! ```ignore
//! use starfeed::github::{GitHubClient, ListingKind, create_token_client};
//!
//! let client = GitHubClient::new(create_token_client(&token)?, ListingKind::Rest, None);
//! let page = client.starred_page("octocat", None, 100).await?;
//! ```

pub mod client;
pub mod convert;
pub mod error;
pub mod listing;
pub mod rate_limit;
mod routes;
pub mod types;

pub use client::{GitHubClient, create_app_client, create_token_client};
pub use convert::to_repo_active_model;
pub use error::{ApiError, short_error_message};
pub use listing::{GraphQlListing, ListingKind, RepoListing, RestListing};
pub use rate_limit::{ApiRateLimiter, DEFAULT_REQUESTS_PER_SECOND};
pub use types::{
    BlobObject, CommitObject, DEFAULT_PAGE_SIZE, GitHubApi, GitSignature, ObjectKind, Page,
    RemoteRelease, RemoteRepo, RemoteTag, TagObject,
};
