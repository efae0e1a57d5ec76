//! Shared fixtures for the integration tests: an in-memory database, a
//! scripted GitHub, and a publisher that records its calls.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use starfeed::credentials::{ClientFactory, Credential, Identity, Quota, SelectedClient};
use starfeed::entity::{repo, star, user, version};
use starfeed::github::{
    ApiError, BlobObject, CommitObject, GitHubApi, GitSignature, ObjectKind, Page, RemoteRelease,
    RemoteRepo, RemoteTag, TagObject,
};
use starfeed::publisher::Publisher;
use starfeed::store::{Store, StoreError, UserCredential};
use starfeed::{DbStore, connect_and_migrate};

type ApiResult<T> = Result<T, ApiError>;

// ─── Database ────────────────────────────────────────────────────────────────

pub async fn setup_store() -> (Arc<DatabaseConnection>, Arc<DbStore>) {
    let db = connect_and_migrate("sqlite::memory:")
        .await
        .expect("Failed to create test database");
    let db = Arc::new(db);
    let store = Arc::new(DbStore::shared(Arc::clone(&db)));
    (db, store)
}

pub async fn seed_user(db: &DatabaseConnection, id: i64, username: &str, token: &str) -> user::Model {
    user::ActiveModel {
        id: Set(id),
        username: Set(username.to_string()),
        name: Set(None),
        avatar_url: Set(None),
        access_token: Set(token.to_string()),
        created_at: Set(Utc::now().fixed_offset()),
        removed_at: Set(None),
    }
    .insert(db)
    .await
    .expect("insert user")
}

pub async fn seed_repo(
    db: &DatabaseConnection,
    id: i64,
    full_name: &str,
    updated_at: DateTime<Utc>,
) -> repo::Model {
    let name = full_name.rsplit('/').next().unwrap_or(full_name);
    repo::ActiveModel {
        id: Set(id),
        full_name: Set(full_name.to_string()),
        name: Set(name.to_string()),
        description: Set(None),
        homepage: Set(None),
        language: Set(None),
        owner_avatar_url: Set(None),
        updated_at: Set(updated_at.fixed_offset()),
        removed_at: Set(None),
    }
    .insert(db)
    .await
    .expect("insert repo")
}

pub async fn seed_star(db: &DatabaseConnection, user_id: i64, repo_id: i64) {
    star::ActiveModel {
        user_id: Set(user_id),
        repo_id: Set(repo_id),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert star");
}

pub async fn seed_version(db: &DatabaseConnection, repo_id: i64, tag_name: &str) {
    version::ActiveModel {
        repo_id: Set(repo_id),
        tag_name: Set(tag_name.to_string()),
        name: Set(tag_name.to_string()),
        prerelease: Set(false),
        body: Set(String::new()),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert version");
}

pub async fn all_versions(db: &DatabaseConnection) -> Vec<version::Model> {
    version::Entity::find().all(db).await.expect("list versions")
}

pub async fn star_pairs(db: &DatabaseConnection) -> Vec<(i64, i64)> {
    let mut pairs: Vec<(i64, i64)> = star::Entity::find()
        .all(db)
        .await
        .expect("list stars")
        .into_iter()
        .map(|s| (s.user_id, s.repo_id))
        .collect();
    pairs.sort_unstable();
    pairs
}

/// Delegates to a [`DbStore`] and records the size of every version batch.
pub struct BatchRecordingStore {
    inner: Arc<DbStore>,
    batches: Mutex<Vec<usize>>,
}

impl BatchRecordingStore {
    pub fn new(inner: Arc<DbStore>) -> Self {
        Self {
            inner,
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn batches(&self) -> Vec<usize> {
        self.batches.lock().expect("batches lock").clone()
    }
}

type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
impl Store for BatchRecordingStore {
    async fn find_user(&self, id: i64) -> StoreResult<Option<user::Model>> {
        self.inner.find_user(id).await
    }

    async fn mark_user_removed(&self, id: i64, at: DateTime<Utc>) -> StoreResult<()> {
        self.inner.mark_user_removed(id, at).await
    }

    async fn user_credentials(&self) -> StoreResult<Vec<UserCredential>> {
        self.inner.user_credentials().await
    }

    async fn find_repo(&self, id: i64) -> StoreResult<Option<repo::Model>> {
        self.inner.find_repo(id).await
    }

    async fn upsert_repo(&self, model: repo::ActiveModel) -> StoreResult<repo::Model> {
        self.inner.upsert_repo(model).await
    }

    async fn mark_repo_removed(&self, id: i64, at: DateTime<Utc>) -> StoreResult<()> {
        self.inner.mark_repo_removed(id, at).await
    }

    async fn find_stars_by_user(&self, user_id: i64) -> StoreResult<Vec<i64>> {
        self.inner.find_stars_by_user(user_id).await
    }

    async fn create_star(&self, user_id: i64, repo_id: i64) -> StoreResult<()> {
        self.inner.create_star(user_id, repo_id).await
    }

    async fn delete_stars(&self, repo_ids: &[i64], user_id: i64) -> StoreResult<u64> {
        self.inner.delete_stars(repo_ids, user_id).await
    }

    async fn find_existing_version(&self, repo_id: i64, tag_name: &str) -> StoreResult<bool> {
        self.inner.find_existing_version(repo_id, tag_name).await
    }

    async fn create_versions(&self, versions: Vec<version::ActiveModel>) -> StoreResult<u64> {
        self.batches
            .lock()
            .expect("batches lock")
            .push(versions.len());
        self.inner.create_versions(versions).await
    }

    async fn find_stargazer_usernames(&self, repo_ids: &[i64]) -> StoreResult<Vec<String>> {
        self.inner.find_stargazer_usernames(repo_ids).await
    }

    async fn active_user_ids(&self) -> StoreResult<Vec<i64>> {
        self.inner.active_user_ids().await
    }

    async fn active_repo_ids(&self) -> StoreResult<Vec<i64>> {
        self.inner.active_repo_ids().await
    }
}

// ─── Remote data builders ────────────────────────────────────────────────────

pub fn remote_repo(id: i64, full_name: &str) -> RemoteRepo {
    RemoteRepo {
        id,
        full_name: full_name.to_string(),
        name: full_name.rsplit('/').next().unwrap_or(full_name).to_string(),
        description: Some(format!("Repository {full_name}")),
        homepage: None,
        language: Some("Rust".to_string()),
        owner_avatar_url: None,
    }
}

pub fn remote_repos(ids: std::ops::Range<i64>) -> Vec<RemoteRepo> {
    ids.map(|id| remote_repo(id, &format!("owner/repo-{id}")))
        .collect()
}

pub fn tag(name: &str, sha: &str, kind: ObjectKind) -> RemoteTag {
    RemoteTag {
        name: name.to_string(),
        object_sha: sha.to_string(),
        object_kind: kind,
    }
}

pub fn release(tag_name: &str, body: &str, published_at: DateTime<Utc>) -> RemoteRelease {
    RemoteRelease {
        tag_name: tag_name.to_string(),
        name: Some(format!("Release {tag_name}")),
        prerelease: false,
        body: Some(body.to_string()),
        created_at: None,
        published_at: Some(published_at),
    }
}

pub fn signature(date: DateTime<Utc>) -> GitSignature {
    GitSignature {
        name: Some("A. Developer".to_string()),
        date,
    }
}

pub fn fixed_date(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .expect("valid date")
        .with_timezone(&Utc)
}

// ─── Scripted GitHub ─────────────────────────────────────────────────────────

/// Number of calls made to each scripted endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub remaining: usize,
    pub starred: usize,
    pub has_tags: usize,
    pub all_tags: usize,
    pub release: usize,
    pub tag_object: usize,
    pub commit: usize,
    pub blob: usize,
    pub render: usize,
}

struct FakeState {
    remaining: ApiResult<usize>,
    starred_pages: VecDeque<ApiResult<Page<RemoteRepo>>>,
    starred_cursors: Vec<Option<String>>,
    has_tags: ApiResult<bool>,
    tags: ApiResult<Vec<RemoteTag>>,
    releases: HashMap<String, RemoteRelease>,
    tag_objects: HashMap<String, TagObject>,
    commits: HashMap<String, CommitObject>,
    blobs: HashMap<String, BlobObject>,
    /// Rendering fails from this call number on (1-based).
    render_fails_from: Option<usize>,
    calls: CallCounts,
}

/// A GitHub double answering from scripted data.
pub struct FakeGitHub {
    state: Mutex<FakeState>,
}

impl Default for FakeGitHub {
    fn default() -> Self {
        Self {
            state: Mutex::new(FakeState {
                remaining: Ok(5000),
                starred_pages: VecDeque::new(),
                starred_cursors: Vec::new(),
                has_tags: Ok(true),
                tags: Ok(Vec::new()),
                releases: HashMap::new(),
                tag_objects: HashMap::new(),
                commits: HashMap::new(),
                blobs: HashMap::new(),
                render_fails_from: None,
                calls: CallCounts::default(),
            }),
        }
    }
}

impl FakeGitHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().expect("fake state lock");
        f(&mut state)
    }

    pub fn set_remaining(&self, remaining: ApiResult<usize>) {
        self.with_state(|s| s.remaining = remaining);
    }

    /// Queue a starred page whose cursor points at the following page.
    pub fn push_starred_page(&self, items: Vec<RemoteRepo>) {
        self.with_state(|s| {
            let next = Some((s.starred_pages.len() + 2).to_string());
            s.starred_pages.push_back(Ok(Page::new(items, next)));
        });
    }

    pub fn push_starred_error(&self, err: ApiError) {
        self.with_state(|s| s.starred_pages.push_back(Err(err)));
    }

    pub fn set_has_tags(&self, result: ApiResult<bool>) {
        self.with_state(|s| s.has_tags = result);
    }

    pub fn set_tags(&self, result: ApiResult<Vec<RemoteTag>>) {
        self.with_state(|s| s.tags = result);
    }

    pub fn add_release(&self, release: RemoteRelease) {
        self.with_state(|s| {
            s.releases.insert(release.tag_name.clone(), release);
        });
    }

    pub fn add_tag_object(&self, sha: &str, object: TagObject) {
        self.with_state(|s| {
            s.tag_objects.insert(sha.to_string(), object);
        });
    }

    pub fn add_commit(&self, sha: &str, object: CommitObject) {
        self.with_state(|s| {
            s.commits.insert(sha.to_string(), object);
        });
    }

    pub fn add_blob(&self, sha: &str, object: BlobObject) {
        self.with_state(|s| {
            s.blobs.insert(sha.to_string(), object);
        });
    }

    pub fn fail_render_from(&self, call: usize) {
        self.with_state(|s| s.render_fails_from = Some(call));
    }

    pub fn calls(&self) -> CallCounts {
        self.with_state(|s| s.calls.clone())
    }

    pub fn starred_cursors(&self) -> Vec<Option<String>> {
        self.with_state(|s| s.starred_cursors.clone())
    }
}

fn lookup<T: Clone>(map: &HashMap<String, T>, sha: &str) -> ApiResult<T> {
    map.get(sha)
        .cloned()
        .ok_or_else(|| ApiError::not_found(sha.to_string()))
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn remaining_calls(&self) -> ApiResult<usize> {
        self.with_state(|s| {
            s.calls.remaining += 1;
            s.remaining.clone()
        })
    }

    async fn starred_page(
        &self,
        _username: &str,
        cursor: Option<&str>,
        _per_page: u32,
    ) -> ApiResult<Page<RemoteRepo>> {
        self.with_state(|s| {
            s.calls.starred += 1;
            s.starred_cursors.push(cursor.map(str::to_string));
            s.starred_pages
                .pop_front()
                .unwrap_or_else(|| Ok(Page::new(Vec::new(), None)))
        })
    }

    async fn has_tags(&self, _full_name: &str) -> ApiResult<bool> {
        self.with_state(|s| {
            s.calls.has_tags += 1;
            s.has_tags.clone()
        })
    }

    async fn all_tags(&self, _full_name: &str) -> ApiResult<Vec<RemoteTag>> {
        self.with_state(|s| {
            s.calls.all_tags += 1;
            s.tags.clone()
        })
    }

    async fn release_by_tag(&self, _full_name: &str, tag: &str) -> ApiResult<Option<RemoteRelease>> {
        self.with_state(|s| {
            s.calls.release += 1;
            Ok(s.releases.get(tag).cloned())
        })
    }

    async fn annotated_tag(&self, _full_name: &str, sha: &str) -> ApiResult<TagObject> {
        self.with_state(|s| {
            s.calls.tag_object += 1;
            lookup(&s.tag_objects, sha)
        })
    }

    async fn commit(&self, _full_name: &str, sha: &str) -> ApiResult<CommitObject> {
        self.with_state(|s| {
            s.calls.commit += 1;
            lookup(&s.commits, sha)
        })
    }

    async fn blob(&self, _full_name: &str, sha: &str) -> ApiResult<BlobObject> {
        self.with_state(|s| {
            s.calls.blob += 1;
            lookup(&s.blobs, sha)
        })
    }

    async fn render_markdown(&self, text: &str, _context: &str) -> ApiResult<String> {
        self.with_state(|s| {
            s.calls.render += 1;
            match s.render_fails_from {
                Some(from) if s.calls.render >= from => Err(ApiError::Status {
                    status: 403,
                    message: "You have triggered an abuse detection mechanism".to_string(),
                }),
                _ => Ok(render(text)),
            }
        })
    }
}

/// What [`FakeGitHub`] renders `text` to.
pub fn render(text: &str) -> String {
    format!("<p>{text}</p>")
}

pub fn selected(fake: &Arc<FakeGitHub>) -> SelectedClient {
    SelectedClient {
        api: fake.clone(),
        identity: Identity::App,
        quota: Quota::Remaining(5000),
    }
}

// ─── Client factory ──────────────────────────────────────────────────────────

/// Hands out fakes per credential: `"app"` for the application credential,
/// the username for a user credential. Unknown credentials fail to
/// authenticate.
#[derive(Default)]
pub struct FakeFactory {
    clients: Mutex<HashMap<String, Arc<FakeGitHub>>>,
    authenticated: Mutex<Vec<String>>,
}

impl FakeFactory {
    pub fn with_client(self, key: &str, remaining: ApiResult<usize>) -> Self {
        let fake = FakeGitHub::new();
        fake.set_remaining(remaining);
        self.clients
            .lock()
            .expect("factory lock")
            .insert(key.to_string(), fake);
        self
    }

    pub fn client(&self, key: &str) -> Arc<FakeGitHub> {
        self.clients.lock().expect("factory lock")[key].clone()
    }

    pub fn authenticated(&self) -> Vec<String> {
        self.authenticated.lock().expect("factory lock").clone()
    }
}

impl ClientFactory for FakeFactory {
    fn authenticate(&self, credential: &Credential) -> Result<Arc<dyn GitHubApi>, ApiError> {
        let key = match credential {
            Credential::App { .. } => "app".to_string(),
            Credential::User(user) => user.username.clone(),
        };
        self.authenticated
            .lock()
            .expect("factory lock")
            .push(key.clone());

        let clients = self.clients.lock().expect("factory lock");
        match clients.get(&key) {
            Some(fake) => Ok(fake.clone() as Arc<dyn GitHubApi>),
            None => Err(ApiError::Status {
                status: 401,
                message: "Bad credentials".to_string(),
            }),
        }
    }
}

pub fn app_credential() -> Credential {
    Credential::App {
        client_id: "Iv1.test".to_string(),
        client_secret: "secret".to_string(),
    }
}

// ─── Publisher ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingPublisher {
    pings: Mutex<Vec<Vec<i64>>>,
}

impl RecordingPublisher {
    pub fn pings(&self) -> Vec<Vec<i64>> {
        self.pings.lock().expect("publisher lock").clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn ping_hub(&self, repo_ids: &[i64]) -> bool {
        self.pings
            .lock()
            .expect("publisher lock")
            .push(repo_ids.to_vec());
        true
    }
}
