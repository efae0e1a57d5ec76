//! Notification of a WebSub (PubSubHubbub) hub when new versions appear.
//!
//! Each user has one feed. When a repository gets new versions, every feed
//! of a user following it is announced to the hub in a single request.

use std::sync::Arc;

use async_trait::async_trait;

use crate::http::{HttpError, HttpRequest, HttpTransport};
use crate::retry::RetryPolicy;
use crate::store::Store;

/// Placeholder substituted in the feed URL template.
pub const USERNAME_PLACEHOLDER: &str = "{username}";

/// Receives the ids of repositories that just got new versions.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Returns whether the hub accepted the notification.
    async fn ping_hub(&self, repo_ids: &[i64]) -> bool;
}

/// Publisher used when no hub is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPublisher;

#[async_trait]
impl Publisher for NullPublisher {
    async fn ping_hub(&self, repo_ids: &[i64]) -> bool {
        tracing::debug!(?repo_ids, "No hub configured, skipping ping");
        false
    }
}

pub struct WebSubPublisher {
    store: Arc<dyn Store>,
    transport: Arc<dyn HttpTransport>,
    hub_url: String,
    feed_url_template: String,
    retry: RetryPolicy,
}

impl WebSubPublisher {
    pub fn new(
        store: Arc<dyn Store>,
        transport: Arc<dyn HttpTransport>,
        hub_url: impl Into<String>,
        feed_url_template: impl Into<String>,
    ) -> Self {
        Self {
            store,
            transport,
            hub_url: hub_url.into(),
            feed_url_template: feed_url_template.into(),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn feed_url(&self, username: &str) -> String {
        self.feed_url_template
            .replace(USERNAME_PLACEHOLDER, username)
    }

    fn build_request(&self, usernames: &[String]) -> HttpRequest {
        let feeds: Vec<String> = usernames.iter().map(|u| self.feed_url(u)).collect();
        let mut pairs: Vec<(&str, &str)> = Vec::with_capacity(feeds.len() + 1);
        pairs.push(("hub.mode", "publish"));
        pairs.extend(feeds.iter().map(|feed| ("hub.url", feed.as_str())));
        HttpRequest::form(self.hub_url.clone(), &pairs)
    }
}

#[async_trait]
impl Publisher for WebSubPublisher {
    async fn ping_hub(&self, repo_ids: &[i64]) -> bool {
        let usernames = match self.store.find_stargazer_usernames(repo_ids).await {
            Ok(usernames) => usernames,
            Err(e) => {
                tracing::warn!(error = %e, "Could not resolve feeds to publish");
                return false;
            }
        };

        if usernames.is_empty() {
            tracing::debug!(?repo_ids, "No followers, nothing to publish");
            return false;
        }

        let request = self.build_request(&usernames);
        let result = self
            .retry
            .run(
                "Hub ping",
                || self.transport.send(request.clone()),
                |e: &HttpError| matches!(e, HttpError::Transport(_)),
            )
            .await;

        match result {
            Ok(resp) if resp.is_success() => {
                tracing::debug!(feeds = usernames.len(), status = resp.status, "Pinged hub");
                true
            }
            Ok(resp) => {
                tracing::warn!(status = resp.status, hub = %self.hub_url, "Hub rejected ping");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, hub = %self.hub_url, "Hub ping failed");
                false
            }
        }
    }
}

#[cfg(all(test, feature = "sqlite", feature = "migrate"))]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, Set};

    use super::*;
    use crate::db::connect_and_migrate;
    use crate::entity::{repo, star, user};
    use crate::http::{HttpMethod, MockTransport};
    use crate::store::DbStore;

    const HUB: &str = "https://hub.example/";

    async fn seeded_store() -> Arc<dyn Store> {
        let db = connect_and_migrate("sqlite::memory:").await.expect("db");
        let now = Utc::now().fixed_offset();

        for (id, username) in [(1, "alice"), (2, "bob")] {
            user::ActiveModel {
                id: Set(id),
                username: Set(username.to_string()),
                name: Set(None),
                avatar_url: Set(None),
                access_token: Set(String::new()),
                created_at: Set(now),
                removed_at: Set(None),
            }
            .insert(&db)
            .await
            .expect("user");
        }

        repo::ActiveModel {
            id: Set(10),
            full_name: Set("octo/app".to_string()),
            name: Set("app".to_string()),
            description: Set(None),
            homepage: Set(None),
            language: Set(None),
            owner_avatar_url: Set(None),
            updated_at: Set(now),
            removed_at: Set(None),
        }
        .insert(&db)
        .await
        .expect("repo");

        for user_id in [1, 2] {
            star::ActiveModel {
                user_id: Set(user_id),
                repo_id: Set(10),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&db)
            .await
            .expect("star");
        }

        Arc::new(DbStore::new(db))
    }

    fn publisher(store: Arc<dyn Store>, transport: &MockTransport) -> WebSubPublisher {
        WebSubPublisher::new(
            store,
            Arc::new(transport.clone()),
            HUB,
            "https://feeds.example/{username}.atom",
        )
        .with_retry_policy(RetryPolicy::fixed(Duration::from_millis(1), 2))
    }

    #[tokio::test]
    async fn ping_posts_one_feed_per_follower() {
        let transport = MockTransport::new();
        transport.push_response(HttpMethod::Post, HUB, 204);
        let publisher = publisher(seeded_store().await, &transport);

        assert!(publisher.ping_hub(&[10]).await);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let body = String::from_utf8(requests[0].body.clone()).expect("utf8");
        assert!(body.starts_with("hub.mode=publish"));
        assert!(body.contains("hub.url=https%3A%2F%2Ffeeds.example%2Falice.atom"));
        assert!(body.contains("hub.url=https%3A%2F%2Ffeeds.example%2Fbob.atom"));
    }

    #[tokio::test]
    async fn ping_retries_transport_errors() {
        let transport = MockTransport::new();
        transport.push_error(HttpMethod::Post, HUB, "connection reset");
        transport.push_response(HttpMethod::Post, HUB, 204);
        let publisher = publisher(seeded_store().await, &transport);

        assert!(publisher.ping_hub(&[10]).await);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn ping_reports_rejection() {
        let transport = MockTransport::new();
        transport.push_response(HttpMethod::Post, HUB, 400);
        let publisher = publisher(seeded_store().await, &transport);

        assert!(!publisher.ping_hub(&[10]).await);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn ping_without_followers_sends_nothing() {
        let transport = MockTransport::new();
        let publisher = publisher(seeded_store().await, &transport);

        assert!(!publisher.ping_hub(&[999]).await);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn null_publisher_never_succeeds() {
        assert!(!NullPublisher.ping_hub(&[1]).await);
    }
}
