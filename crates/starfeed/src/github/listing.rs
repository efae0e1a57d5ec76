//! Listing strategies for starred repositories and tags.
//!
//! GitHub exposes the same listings through REST (page numbers) and GraphQL
//! (cursors). Both are implemented behind [`RepoListing`]; which one a
//! client uses is decided once, when the client is built.

use std::sync::Arc;

use async_trait::async_trait;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::error::{ApiError, Result, from_octocrab};
use super::routes::{self, split_full_name};
use super::types::{ObjectKind, Page, RemoteRepo, RemoteTag};

/// Which listing implementation a client uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    #[default]
    Rest,
    GraphQl,
}

impl ListingKind {
    /// Build the listing for this kind on top of an authenticated client.
    pub fn build(self, client: Arc<Octocrab>) -> Arc<dyn RepoListing> {
        match self {
            Self::Rest => Arc::new(RestListing::new(client)),
            Self::GraphQl => Arc::new(GraphQlListing::new(client)),
        }
    }
}

/// Paginated listings the sync engine walks.
#[async_trait]
pub trait RepoListing: Send + Sync {
    async fn starred_page(
        &self,
        username: &str,
        cursor: Option<&str>,
        per_page: u32,
    ) -> Result<Page<RemoteRepo>>;

    async fn has_tags(&self, full_name: &str) -> Result<bool>;

    async fn all_tags(&self, full_name: &str) -> Result<Vec<RemoteTag>>;
}

// ─── REST ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RestOwner {
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RestRepo {
    id: i64,
    full_name: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    homepage: Option<String>,
    #[serde(default)]
    language: Option<String>,
    owner: Option<RestOwner>,
}

impl From<RestRepo> for RemoteRepo {
    fn from(repo: RestRepo) -> Self {
        Self {
            id: repo.id,
            full_name: repo.full_name,
            name: repo.name,
            description: repo.description,
            homepage: repo.homepage.filter(|h| !h.is_empty()),
            language: repo.language,
            owner_avatar_url: repo.owner.and_then(|o| o.avatar_url),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RestRefObject {
    sha: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct RestRef {
    #[serde(rename = "ref")]
    git_ref: String,
    object: RestRefObject,
}

impl From<RestRef> for RemoteTag {
    fn from(r: RestRef) -> Self {
        let name = r
            .git_ref
            .strip_prefix("refs/tags/")
            .unwrap_or(&r.git_ref)
            .to_string();
        Self {
            name,
            object_sha: r.object.sha,
            object_kind: ObjectKind::parse(&r.object.kind),
        }
    }
}

/// `git/refs/tags` answers with an object instead of an array when exactly
/// one ref matches.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RestRefs {
    Many(Vec<RestRef>),
    One(RestRef),
}

/// REST listings: page-number pagination, complete tag list in one call.
pub struct RestListing {
    client: Arc<Octocrab>,
}

impl RestListing {
    pub fn new(client: Arc<Octocrab>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RepoListing for RestListing {
    async fn starred_page(
        &self,
        username: &str,
        cursor: Option<&str>,
        per_page: u32,
    ) -> Result<Page<RemoteRepo>> {
        let page = cursor.and_then(|c| c.parse::<u32>().ok()).unwrap_or(1);
        let route = format!(
            "{}?per_page={per_page}&page={page}",
            routes::user(username, &["starred"])?
        );
        let repos: Vec<RestRepo> = self
            .client
            .get(&route, None::<&()>)
            .await
            .map_err(|e| from_octocrab(e, &route))?;

        let items = repos.into_iter().map(RemoteRepo::from).collect();
        Ok(Page::new(items, Some((page + 1).to_string())))
    }

    async fn has_tags(&self, full_name: &str) -> Result<bool> {
        let route = format!("{}?per_page=1&page=1", routes::repo(full_name, &["tags"])?);
        let tags: Vec<Value> = self
            .client
            .get(&route, None::<&()>)
            .await
            .map_err(|e| from_octocrab(e, &route))?;
        Ok(!tags.is_empty())
    }

    async fn all_tags(&self, full_name: &str) -> Result<Vec<RemoteTag>> {
        let route = routes::repo(full_name, &["git", "refs", "tags"])?;
        let refs: RestRefs = self
            .client
            .get(&route, None::<&()>)
            .await
            .map_err(|e| from_octocrab(e, &route))?;

        let refs = match refs {
            RestRefs::Many(refs) => refs,
            RestRefs::One(r) => vec![r],
        };
        Ok(refs.into_iter().map(RemoteTag::from).collect())
    }
}

// ─── GraphQL ─────────────────────────────────────────────────────────────────

const STARRED_QUERY: &str = r#"
query($login: String!, $first: Int!, $after: String) {
  user(login: $login) {
    starredRepositories(first: $first, after: $after) {
      pageInfo { hasNextPage endCursor }
      nodes {
        databaseId
        nameWithOwner
        name
        description
        homepageUrl
        primaryLanguage { name }
        owner { avatarUrl }
      }
    }
  }
}"#;

const TAG_COUNT_QUERY: &str = r#"
query($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    refs(refPrefix: "refs/tags/", first: 1) { totalCount }
  }
}"#;

const TAGS_QUERY: &str = r#"
query($owner: String!, $name: String!, $after: String) {
  repository(owner: $owner, name: $name) {
    refs(refPrefix: "refs/tags/", first: 100, after: $after) {
      pageInfo { hasNextPage endCursor }
      nodes { name target { __typename oid } }
    }
  }
}"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

impl PageInfo {
    fn next(self) -> Option<String> {
        if self.has_next_page {
            self.end_cursor
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct NamedLanguage {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlOwner {
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlRepo {
    database_id: i64,
    name_with_owner: String,
    name: String,
    description: Option<String>,
    homepage_url: Option<String>,
    primary_language: Option<NamedLanguage>,
    owner: Option<GqlOwner>,
}

impl From<GqlRepo> for RemoteRepo {
    fn from(repo: GqlRepo) -> Self {
        Self {
            id: repo.database_id,
            full_name: repo.name_with_owner,
            name: repo.name,
            description: repo.description,
            homepage: repo.homepage_url.filter(|h| !h.is_empty()),
            language: repo.primary_language.map(|l| l.name),
            owner_avatar_url: repo.owner.and_then(|o| o.avatar_url),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StarredConnection {
    page_info: PageInfo,
    nodes: Vec<GqlRepo>,
}

#[derive(Debug, Deserialize)]
struct GqlTarget {
    #[serde(rename = "__typename")]
    typename: String,
    oid: String,
}

#[derive(Debug, Deserialize)]
struct GqlRef {
    name: String,
    target: GqlTarget,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefConnection {
    #[serde(default)]
    page_info: Option<PageInfo>,
    #[serde(default)]
    nodes: Vec<GqlRef>,
    #[serde(default)]
    total_count: Option<u64>,
}

/// Pull `data.<root>.<field>` out of a GraphQL response.
///
/// A `null` root object, or an error of type `NOT_FOUND`, is reported as
/// [`ApiError::NotFound`].
fn extract_connection<T: serde::de::DeserializeOwned>(
    response: Value,
    root: &str,
    field: &str,
    resource: &str,
) -> Result<T> {
    if let Some(errors) = response.get("errors").and_then(Value::as_array)
        && !errors.is_empty()
    {
        let not_found = errors
            .iter()
            .any(|e| e.get("type").and_then(Value::as_str) == Some("NOT_FOUND"));
        if not_found {
            return Err(ApiError::not_found(resource));
        }
        let message = errors
            .iter()
            .filter_map(|e| e.get("message").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ApiError::decode(format!("GraphQL error: {message}")));
    }

    let root_value = response
        .get("data")
        .and_then(|d| d.get(root))
        .filter(|v| !v.is_null())
        .ok_or_else(|| ApiError::not_found(resource))?;

    let connection = root_value
        .get(field)
        .cloned()
        .ok_or_else(|| ApiError::decode(format!("missing {root}.{field} in response")))?;

    serde_json::from_value(connection).map_err(|e| ApiError::decode(e.to_string()))
}

/// GraphQL listings: cursor pagination for both stars and tags.
pub struct GraphQlListing {
    client: Arc<Octocrab>,
}

impl GraphQlListing {
    pub fn new(client: Arc<Octocrab>) -> Self {
        Self { client }
    }

    async fn query(&self, query: &str, variables: Value, resource: &str) -> Result<Value> {
        self.client
            .graphql::<Value>(&json!({ "query": query, "variables": variables }))
            .await
            .map_err(|e| from_octocrab(e, resource))
    }
}

#[async_trait]
impl RepoListing for GraphQlListing {
    async fn starred_page(
        &self,
        username: &str,
        cursor: Option<&str>,
        per_page: u32,
    ) -> Result<Page<RemoteRepo>> {
        let resource = format!("user {username}");
        let response = self
            .query(
                STARRED_QUERY,
                json!({ "login": username, "first": per_page, "after": cursor }),
                &resource,
            )
            .await?;

        let connection: StarredConnection =
            extract_connection(response, "user", "starredRepositories", &resource)?;
        let items = connection.nodes.into_iter().map(RemoteRepo::from).collect();
        Ok(Page::new(items, connection.page_info.next()))
    }

    async fn has_tags(&self, full_name: &str) -> Result<bool> {
        let (owner, name) = split_full_name(full_name)?;
        let response = self
            .query(
                TAG_COUNT_QUERY,
                json!({ "owner": owner, "name": name }),
                full_name,
            )
            .await?;

        let refs: RefConnection = extract_connection(response, "repository", "refs", full_name)?;
        Ok(refs.total_count.unwrap_or(0) > 0)
    }

    async fn all_tags(&self, full_name: &str) -> Result<Vec<RemoteTag>> {
        let (owner, name) = split_full_name(full_name)?;
        let mut tags = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let response = self
                .query(
                    TAGS_QUERY,
                    json!({ "owner": owner, "name": name, "after": after }),
                    full_name,
                )
                .await?;

            let refs: RefConnection =
                extract_connection(response, "repository", "refs", full_name)?;
            tags.extend(refs.nodes.into_iter().map(|r| RemoteTag {
                name: r.name,
                object_sha: r.target.oid,
                object_kind: ObjectKind::parse(&r.target.typename),
            }));

            match refs.page_info.and_then(PageInfo::next) {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }

        Ok(tags)
    }
}
