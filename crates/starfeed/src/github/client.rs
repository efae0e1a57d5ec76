//! GitHub API client creation and the [`GitHubApi`] implementation.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use octocrab::Octocrab;
use serde::Deserialize;
use serde_json::json;

use super::error::{ApiError, Result, from_octocrab};
use super::listing::{ListingKind, RepoListing};
use super::rate_limit::ApiRateLimiter;
use super::routes;
use super::types::{
    BlobObject, CommitObject, GitHubApi, Page, RemoteRelease, RemoteRepo, RemoteTag, TagObject,
};

/// Create an Octocrab instance authenticated with a personal or OAuth token.
pub fn create_token_client(token: &str) -> Result<Octocrab> {
    Octocrab::builder()
        .personal_token(token.to_string())
        .build()
        .map_err(|e| from_octocrab(e, "client"))
}

/// Create an Octocrab instance authenticated as an OAuth application.
///
/// GitHub accepts `client_id:client_secret` basic auth on public endpoints,
/// with a quota shared by every caller using the same application.
pub fn create_app_client(client_id: &str, client_secret: &str) -> Result<Octocrab> {
    Octocrab::builder()
        .basic_auth(client_id.to_string(), client_secret.to_string())
        .build()
        .map_err(|e| from_octocrab(e, "client"))
}

#[derive(Debug, Deserialize)]
struct RawBlob {
    size: u64,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

/// Decode a blob payload. GitHub wraps base64 content at 60 columns.
fn decode_blob(raw: RawBlob) -> Result<BlobObject> {
    let content = if raw.encoding == "base64" {
        let compact: String = raw.content.split_whitespace().collect();
        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| ApiError::decode(format!("invalid blob encoding: {e}")))?;
        String::from_utf8_lossy(&bytes).into_owned()
    } else {
        raw.content
    };

    Ok(BlobObject {
        size: raw.size,
        content,
    })
}

/// GitHub client implementing [`GitHubApi`].
///
/// Wraps an `Octocrab` instance; listings go through the [`RepoListing`]
/// chosen at construction time, and every request is paced by the optional
/// shared [`ApiRateLimiter`].
#[derive(Clone)]
pub struct GitHubClient {
    inner: Arc<Octocrab>,
    listing: Arc<dyn RepoListing>,
    rate_limiter: Option<ApiRateLimiter>,
}

impl GitHubClient {
    /// Wrap an authenticated Octocrab instance.
    pub fn new(
        client: Octocrab,
        listing: ListingKind,
        rate_limiter: Option<ApiRateLimiter>,
    ) -> Self {
        let inner = Arc::new(client);
        Self {
            listing: listing.build(Arc::clone(&inner)),
            inner,
            rate_limiter,
        }
    }

    /// Get a reference to the inner Octocrab client.
    pub fn inner(&self) -> &Octocrab {
        &self.inner
    }

    async fn wait_for_rate_limit(&self) {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, route: &str) -> Result<T> {
        self.wait_for_rate_limit().await;
        self.inner
            .get(route, None::<&()>)
            .await
            .map_err(|e| from_octocrab(e, route))
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn remaining_calls(&self) -> Result<usize> {
        let rate_limit = self
            .inner
            .ratelimit()
            .get()
            .await
            .map_err(|e| from_octocrab(e, "/rate_limit"))?;
        Ok(rate_limit.resources.core.remaining)
    }

    async fn starred_page(
        &self,
        username: &str,
        cursor: Option<&str>,
        per_page: u32,
    ) -> Result<Page<RemoteRepo>> {
        self.wait_for_rate_limit().await;
        self.listing.starred_page(username, cursor, per_page).await
    }

    async fn has_tags(&self, full_name: &str) -> Result<bool> {
        self.wait_for_rate_limit().await;
        self.listing.has_tags(full_name).await
    }

    async fn all_tags(&self, full_name: &str) -> Result<Vec<RemoteTag>> {
        self.wait_for_rate_limit().await;
        self.listing.all_tags(full_name).await
    }

    async fn release_by_tag(&self, full_name: &str, tag: &str) -> Result<Option<RemoteRelease>> {
        let route = routes::repo(full_name, &["releases", "tags", tag])?;
        match self.get_json::<RemoteRelease>(&route).await {
            Ok(release) => Ok(Some(release)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn annotated_tag(&self, full_name: &str, sha: &str) -> Result<TagObject> {
        self.get_json(&routes::repo(full_name, &["git", "tags", sha])?)
            .await
    }

    async fn commit(&self, full_name: &str, sha: &str) -> Result<CommitObject> {
        self.get_json(&routes::repo(full_name, &["git", "commits", sha])?)
            .await
    }

    async fn blob(&self, full_name: &str, sha: &str) -> Result<BlobObject> {
        let raw: RawBlob = self
            .get_json(&routes::repo(full_name, &["git", "blobs", sha])?)
            .await?;
        decode_blob(raw)
    }

    async fn render_markdown(&self, text: &str, context: &str) -> Result<String> {
        self.wait_for_rate_limit().await;

        // POST /markdown answers with text/html, so the typed helpers do not apply
        let route = "/markdown";
        let body = json!({ "text": text, "mode": "gfm", "context": context });
        let response = self
            .inner
            ._post(route, Some(&body))
            .await
            .map_err(|e| from_octocrab(e, route))?;

        let status = response.status().as_u16();
        let content = self
            .inner
            .body_to_string(response)
            .await
            .map_err(|e| from_octocrab(e, route))?;

        if (200..300).contains(&status) {
            Ok(content)
        } else {
            Err(ApiError::from_status(status, route, content))
        }
    }
}
