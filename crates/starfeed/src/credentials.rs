//! Credential selection under GitHub's per-credential quota.
//!
//! The shared application credential is tried first and kept above
//! [`THRESHOLD_APP`]; past that, user tokens are rotated and the first one
//! with at least [`THRESHOLD_USER`] calls left wins. The choice is returned
//! as a [`SelectedClient`] value and handed to each unit of work.

use std::fmt;
use std::sync::Arc;

use crate::github::{
    ApiError, ApiRateLimiter, GitHubApi, GitHubClient, ListingKind, create_app_client,
    create_token_client,
};
use crate::store::{Store, StoreError, UserCredential};

/// Minimum remaining calls for the shared application credential.
pub const THRESHOLD_APP: usize = 200;

/// Minimum remaining calls for a user credential.
pub const THRESHOLD_USER: usize = 2000;

/// Result of a quota probe.
///
/// `Remaining(0)` means the quota is legitimately spent; `Unavailable` means
/// the probe itself failed. Neither allows further work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    Remaining(usize),
    Unavailable,
}

impl Quota {
    /// Whether at least `threshold` calls are known to be left.
    pub fn at_least(self, threshold: usize) -> bool {
        matches!(self, Self::Remaining(n) if n >= threshold)
    }

    /// Whether any call at all is known to be left.
    pub fn is_usable(self) -> bool {
        matches!(self, Self::Remaining(n) if n > 0)
    }
}

impl fmt::Display for Quota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remaining(n) => write!(f, "{n}"),
            Self::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// Ask GitHub how many calls the client has left. Failures are logged and
/// reported as [`Quota::Unavailable`].
pub async fn probe_quota(client: &dyn GitHubApi) -> Quota {
    match client.remaining_calls().await {
        Ok(remaining) => Quota::Remaining(remaining),
        Err(e) => {
            tracing::warn!(error = %e, "Rate limit probe failed");
            Quota::Unavailable
        }
    }
}

/// A credential that can be turned into an authenticated client.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// The shared OAuth application credential.
    App {
        client_id: String,
        client_secret: String,
    },
    /// A user's own access token.
    User(UserCredential),
}

impl Credential {
    pub fn identity(&self) -> Identity {
        match self {
            Self::App { .. } => Identity::App,
            Self::User(user) => Identity::User {
                user_id: user.user_id,
                username: user.username.clone(),
            },
        }
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.identity())
    }
}

/// Who a selected client acts as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    App,
    User { user_id: i64, username: String },
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::App => f.write_str("application"),
            Self::User { username, user_id } => write!(f, "user {username} (id {user_id})"),
        }
    }
}

/// Turns credentials into authenticated clients.
pub trait ClientFactory: Send + Sync {
    fn authenticate(&self, credential: &Credential) -> Result<Arc<dyn GitHubApi>, ApiError>;
}

/// Builds [`GitHubClient`]s sharing one listing kind and one request pacer.
#[derive(Debug, Clone, Default)]
pub struct GitHubClientFactory {
    listing: ListingKind,
    rate_limiter: Option<ApiRateLimiter>,
}

impl GitHubClientFactory {
    pub fn new(listing: ListingKind, rate_limiter: Option<ApiRateLimiter>) -> Self {
        Self {
            listing,
            rate_limiter,
        }
    }
}

impl ClientFactory for GitHubClientFactory {
    fn authenticate(&self, credential: &Credential) -> Result<Arc<dyn GitHubApi>, ApiError> {
        let octocrab = match credential {
            Credential::App {
                client_id,
                client_secret,
            } => create_app_client(client_id, client_secret)?,
            Credential::User(user) => create_token_client(&user.token)?,
        };
        Ok(Arc::new(GitHubClient::new(
            octocrab,
            self.listing,
            self.rate_limiter.clone(),
        )))
    }
}

/// An authenticated client chosen by [`CredentialSelector::find`].
#[derive(Clone)]
pub struct SelectedClient {
    pub api: Arc<dyn GitHubApi>,
    pub identity: Identity,
    /// Quota observed when the client was chosen.
    pub quota: Quota,
}

impl fmt::Debug for SelectedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedClient")
            .field("identity", &self.identity)
            .field("quota", &self.quota)
            .finish_non_exhaustive()
    }
}

/// Chooses the best available credential for the next unit of work.
pub struct CredentialSelector {
    store: Arc<dyn Store>,
    factory: Arc<dyn ClientFactory>,
    app: Option<Credential>,
    app_threshold: usize,
    user_threshold: usize,
}

impl CredentialSelector {
    /// `app` is the shared default credential; `None` goes straight to user
    /// token rotation.
    pub fn new(
        store: Arc<dyn Store>,
        factory: Arc<dyn ClientFactory>,
        app: Option<Credential>,
    ) -> Self {
        Self {
            store,
            factory,
            app,
            app_threshold: THRESHOLD_APP,
            user_threshold: THRESHOLD_USER,
        }
    }

    /// Override the default thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, app: usize, user: usize) -> Self {
        self.app_threshold = app;
        self.user_threshold = user;
        self
    }

    /// Authenticate and probe one credential. Authentication failures count
    /// as an unavailable quota.
    async fn try_credential(&self, credential: &Credential) -> Option<(Arc<dyn GitHubApi>, Quota)> {
        match self.factory.authenticate(credential) {
            Ok(api) => {
                let quota = probe_quota(api.as_ref()).await;
                Some((api, quota))
            }
            Err(e) => {
                tracing::warn!(identity = %credential.identity(), error = %e, "Could not authenticate");
                None
            }
        }
    }

    /// Find a client with enough quota left, or `None` when no credential
    /// qualifies. Callers must not proceed on `None`.
    ///
    /// # Errors
    /// Only store failures while listing user tokens are reported as errors.
    pub async fn find(&self) -> Result<Option<SelectedClient>, StoreError> {
        if let Some(app) = &self.app
            && let Some((api, quota)) = self.try_credential(app).await
        {
            if quota.at_least(self.app_threshold) {
                tracing::debug!(remaining = %quota, "Using application credential");
                return Ok(Some(SelectedClient {
                    api,
                    identity: Identity::App,
                    quota,
                }));
            }
            tracing::debug!(
                remaining = %quota,
                threshold = self.app_threshold,
                "Application credential below threshold, rotating user tokens"
            );
        }

        for user in self.store.user_credentials().await? {
            let credential = Credential::User(user);
            let Some((api, quota)) = self.try_credential(&credential).await else {
                continue;
            };

            if quota.at_least(self.user_threshold) {
                let identity = credential.identity();
                tracing::info!(identity = %identity, remaining = %quota, "Using user credential");
                return Ok(Some(SelectedClient {
                    api,
                    identity,
                    quota,
                }));
            }
        }

        tracing::warn!("No GitHub credential with sufficient quota available");
        Ok(None)
    }
}
