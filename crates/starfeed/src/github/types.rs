//! Data structures returned by the GitHub API and the client trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::error::Result;

/// Default page size for paginated listings (GitHub's maximum).
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// A page of results plus the cursor for the next one.
///
/// `next` is `None` when the upstream says there is nothing more; for
/// page-number listings it is always the following page, and the walk ends
/// on the first empty page instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next: Option<String>) -> Self {
        Self { items, next }
    }

    /// Whether a walk should stop after this page.
    pub fn is_last(&self) -> bool {
        self.items.is_empty() || self.next.is_none()
    }
}

/// Repository metadata as seen in a starred listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepo {
    pub id: i64,
    pub full_name: String,
    pub name: String,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub language: Option<String>,
    pub owner_avatar_url: Option<String>,
}

/// Kind of git object a tag ref points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    /// An annotated tag object.
    Tag,
    Commit,
    Blob,
    /// Anything else (trees, unknown future kinds).
    Other(String),
}

impl ObjectKind {
    /// Parse the REST (`"tag"`) or GraphQL (`"Tag"`) spelling.
    pub fn parse(kind: &str) -> Self {
        match kind.to_ascii_lowercase().as_str() {
            "tag" => Self::Tag,
            "commit" => Self::Commit,
            "blob" => Self::Blob,
            _ => Self::Other(kind.to_string()),
        }
    }
}

/// A tag ref and the object it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTag {
    /// Tag name without the `refs/tags/` prefix.
    pub name: String,
    pub object_sha: String,
    pub object_kind: ObjectKind,
}

/// A published release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteRelease {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// Author or tagger signature of a git object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitSignature {
    #[serde(default)]
    pub name: Option<String>,
    pub date: DateTime<Utc>,
}

/// An annotated tag object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TagObject {
    pub tagger: GitSignature,
    #[serde(default)]
    pub message: String,
}

/// A commit object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitObject {
    pub author: GitSignature,
    #[serde(default)]
    pub message: String,
}

/// A blob object, content already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobObject {
    pub size: u64,
    pub content: String,
}

/// The GitHub operations the sync engine depends on.
///
/// Every call is a single remote request (or a short sequence of them for
/// complete listings) and never retries on its own.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Remaining core API calls for this credential.
    async fn remaining_calls(&self) -> Result<usize>;

    /// One page of the repositories starred by `username`.
    async fn starred_page(
        &self,
        username: &str,
        cursor: Option<&str>,
        per_page: u32,
    ) -> Result<Page<RemoteRepo>>;

    /// Cheap, cacheable check whether the repository has at least one tag.
    async fn has_tags(&self, full_name: &str) -> Result<bool>;

    /// Every tag of the repository, in upstream order.
    async fn all_tags(&self, full_name: &str) -> Result<Vec<RemoteTag>>;

    /// The release published for `tag`, or `None` when there is none.
    async fn release_by_tag(&self, full_name: &str, tag: &str) -> Result<Option<RemoteRelease>>;

    async fn annotated_tag(&self, full_name: &str, sha: &str) -> Result<TagObject>;

    async fn commit(&self, full_name: &str, sha: &str) -> Result<CommitObject>;

    async fn blob(&self, full_name: &str, sha: &str) -> Result<BlobObject>;

    /// Render GitHub-flavoured markdown to HTML in the context of a repository.
    async fn render_markdown(&self, text: &str, context: &str) -> Result<String>;
}
