//! Persistent store for users, repositories, stars, and versions.
//!
//! The sync engine talks to the database through the [`Store`] trait so a
//! unit of work only ever sees the handful of operations it needs. The
//! [`DbStore`] implementation maps them onto sea-orm queries; the free
//! functions in the submodules can also be used directly with any
//! connection or transaction.

mod errors;
pub mod repos;
pub mod stars;
pub mod users;
pub mod versions;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;

use crate::entity::{repo, user, version};

pub use errors::{Result, StoreError};

/// A user token known to the store, as used for credential rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCredential {
    pub user_id: i64,
    pub username: String,
    pub token: String,
}

impl From<user::Model> for UserCredential {
    fn from(model: user::Model) -> Self {
        Self {
            user_id: model.id,
            username: model.username,
            token: model.access_token,
        }
    }
}

/// Logical store operations consumed by the sync engine.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user(&self, id: i64) -> Result<Option<user::Model>>;

    async fn mark_user_removed(&self, id: i64, at: DateTime<Utc>) -> Result<()>;

    /// Tokens of every active user, in ascending id order.
    async fn user_credentials(&self) -> Result<Vec<UserCredential>>;

    async fn find_repo(&self, id: i64) -> Result<Option<repo::Model>>;

    /// Insert or refresh repository metadata keyed by GitHub id.
    async fn upsert_repo(&self, model: repo::ActiveModel) -> Result<repo::Model>;

    async fn mark_repo_removed(&self, id: i64, at: DateTime<Utc>) -> Result<()>;

    /// Repository ids the user currently follows.
    async fn find_stars_by_user(&self, user_id: i64) -> Result<Vec<i64>>;

    /// Create a follow edge. Creating an existing edge is a no-op.
    async fn create_star(&self, user_id: i64, repo_id: i64) -> Result<()>;

    /// Delete the follow edges between `user_id` and each of `repo_ids`.
    async fn delete_stars(&self, repo_ids: &[i64], user_id: i64) -> Result<u64>;

    /// Exact (case-sensitive) tag name lookup.
    async fn find_existing_version(&self, repo_id: i64, tag_name: &str) -> Result<bool>;

    /// Persist a batch of staged versions atomically.
    async fn create_versions(&self, versions: Vec<version::ActiveModel>) -> Result<u64>;

    /// Usernames of active users following any of the repositories.
    async fn find_stargazer_usernames(&self, repo_ids: &[i64]) -> Result<Vec<String>>;

    async fn active_user_ids(&self) -> Result<Vec<i64>>;

    async fn active_repo_ids(&self) -> Result<Vec<i64>>;
}

/// [`Store`] backed by a sea-orm connection.
///
/// The connection sits behind an `Arc` because `DatabaseConnection` is not
/// `Clone` when sea-orm's `mock` feature is enabled.
#[derive(Clone)]
pub struct DbStore {
    db: Arc<DatabaseConnection>,
}

impl DbStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self::shared(Arc::new(db))
    }

    /// Build a store over a connection that other code also holds.
    pub fn shared(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// The underlying connection.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl Store for DbStore {
    async fn find_user(&self, id: i64) -> Result<Option<user::Model>> {
        users::find_by_id(self.connection(), id).await
    }

    async fn mark_user_removed(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        users::mark_removed(self.connection(), id, at).await.map(|_| ())
    }

    async fn user_credentials(&self) -> Result<Vec<UserCredential>> {
        let models = users::find_with_credentials(self.connection()).await?;
        Ok(models.into_iter().map(UserCredential::from).collect())
    }

    async fn find_repo(&self, id: i64) -> Result<Option<repo::Model>> {
        repos::find_by_id(self.connection(), id).await
    }

    async fn upsert_repo(&self, model: repo::ActiveModel) -> Result<repo::Model> {
        repos::upsert(self.connection(), model).await
    }

    async fn mark_repo_removed(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        repos::mark_removed(self.connection(), id, at).await.map(|_| ())
    }

    async fn find_stars_by_user(&self, user_id: i64) -> Result<Vec<i64>> {
        stars::find_repo_ids_by_user(self.connection(), user_id).await
    }

    async fn create_star(&self, user_id: i64, repo_id: i64) -> Result<()> {
        stars::create(self.connection(), user_id, repo_id).await
    }

    async fn delete_stars(&self, repo_ids: &[i64], user_id: i64) -> Result<u64> {
        stars::delete_for_user(self.connection(), repo_ids, user_id).await
    }

    async fn find_existing_version(&self, repo_id: i64, tag_name: &str) -> Result<bool> {
        versions::exists(self.connection(), repo_id, tag_name).await
    }

    async fn create_versions(&self, batch: Vec<version::ActiveModel>) -> Result<u64> {
        versions::insert_batch(self.connection(), batch).await
    }

    async fn find_stargazer_usernames(&self, repo_ids: &[i64]) -> Result<Vec<String>> {
        stars::find_stargazer_usernames(self.connection(), repo_ids).await
    }

    async fn active_user_ids(&self) -> Result<Vec<i64>> {
        users::find_active_ids(self.connection()).await
    }

    async fn active_repo_ids(&self) -> Result<Vec<i64>> {
        repos::find_active_ids(self.connection()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_cloned_store_shares_connection() {
        let store = DbStore::new(MockDatabase::new(DatabaseBackend::Sqlite).into_connection());
        let clone = store.clone();
        assert!(std::ptr::eq(store.connection(), clone.connection()));

        let db = Arc::new(MockDatabase::new(DatabaseBackend::Sqlite).into_connection());
        let shared = DbStore::shared(Arc::clone(&db));
        assert!(std::ptr::eq(shared.connection(), db.as_ref()));
    }

    #[test]
    fn test_store_error_invalid_input() {
        let err = StoreError::invalid_input("Missing required field: id");
        let msg = err.to_string();
        assert!(msg.contains("Invalid input"));
        assert!(msg.contains("id"));
    }

    #[test]
    fn test_store_error_from_db_err() {
        let err: StoreError = sea_orm::DbErr::RecordNotFound("repo".to_string()).into();
        assert!(err.to_string().contains("Database error"));
    }

    #[test]
    fn test_user_credential_from_model() {
        let model = user::Model {
            id: 7,
            username: "octocat".to_string(),
            name: None,
            avatar_url: None,
            access_token: "gho_token".to_string(),
            created_at: Utc::now().fixed_offset(),
            removed_at: None,
        };
        let credential = UserCredential::from(model);
        assert_eq!(credential.user_id, 7);
        assert_eq!(credential.username, "octocat");
        assert_eq!(credential.token, "gho_token");
    }
}
