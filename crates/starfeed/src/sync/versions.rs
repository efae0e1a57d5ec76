//! Version synchronization for one repository.
//!
//! Every tag of the repository is fetched on each pass, since GitHub does
//! not order tags by date. Each tag without a stored version is resolved
//! through a fallback chain:
//!
//! 1. the release published for the tag, if any;
//! 2. otherwise the object the tag points to: an annotated tag, a commit,
//!    or a blob.
//!
//! The resolved message is stripped of its PGP signature, rendered to HTML
//! and staged. Staged versions are written in batches.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sea_orm::Set;

use super::types::{AbortReason, Result, StopReason, SyncOptions, SyncOutcome};
use crate::credentials::{SelectedClient, probe_quota};
use crate::entity::{repo, version};
use crate::github::{ApiError, GitHubApi, ObjectKind, RemoteTag};
use crate::publisher::Publisher;
use crate::store::Store;

/// Marker opening an inline PGP signature in tag and commit messages.
pub const PGP_SIGNATURE_MARKER: &str = "-----BEGIN PGP SIGNATURE-----";

/// Cut `message` at the PGP signature marker and trim trailing whitespace.
pub fn strip_pgp_signature(message: &str) -> &str {
    let unsigned = match message.find(PGP_SIGNATURE_MARKER) {
        Some(at) => &message[..at],
        None => message,
    };
    unsigned.trim_end()
}

/// Body used for tags pointing at a blob: its size, then its content.
pub fn blob_body(size: u64, content: &str) -> String {
    format!("{size} bytes\n\n{content}")
}

/// Metadata resolved for one tag, before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedTag {
    name: String,
    prerelease: bool,
    published_at: DateTime<Utc>,
    message: String,
}

/// Resolve a tag through the release, then its underlying object.
///
/// Returns `Ok(None)` for object kinds that carry nothing usable.
async fn resolve_tag(
    api: &dyn GitHubApi,
    full_name: &str,
    tag: &RemoteTag,
) -> std::result::Result<Option<ResolvedTag>, ApiError> {
    if let Some(release) = api.release_by_tag(full_name, &tag.name).await? {
        let name = release
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| tag.name.clone());
        let published_at = release
            .published_at
            .or(release.created_at)
            .unwrap_or_else(Utc::now);

        return Ok(Some(ResolvedTag {
            name,
            prerelease: release.prerelease,
            published_at,
            // Release notes are markdown too and take the same strip and render path.
            message: release.body.unwrap_or_default(),
        }));
    }

    let (published_at, message) = match &tag.object_kind {
        ObjectKind::Tag => {
            let object = api.annotated_tag(full_name, &tag.object_sha).await?;
            (object.tagger.date, object.message)
        }
        ObjectKind::Commit => {
            let object = api.commit(full_name, &tag.object_sha).await?;
            (object.author.date, object.message)
        }
        ObjectKind::Blob => {
            let object = api.blob(full_name, &tag.object_sha).await?;
            // Blobs carry no date. The fetch time is only an approximation.
            (Utc::now(), blob_body(object.size, &object.content))
        }
        ObjectKind::Other(kind) => {
            tracing::error!(
                repo = full_name,
                tag = %tag.name,
                kind = %kind,
                "Unsupported tag object kind, skipping tag"
            );
            return Ok(None);
        }
    };

    Ok(Some(ResolvedTag {
        name: tag.name.clone(),
        prerelease: false,
        published_at,
        message,
    }))
}

/// Versions staged for insertion during one pass.
///
/// Tag names are remembered lower-cased for the whole pass, flushed or not,
/// so `v1.0` and `V1.0` never both make it in.
#[derive(Default)]
struct Staging {
    names: HashSet<String>,
    pending: Vec<version::ActiveModel>,
    created: usize,
}

impl Staging {
    fn contains(&self, tag_name: &str) -> bool {
        self.names.contains(&tag_name.to_lowercase())
    }

    fn stage(&mut self, model: version::ActiveModel, tag_name: &str) {
        self.names.insert(tag_name.to_lowercase());
        self.pending.push(model);
        self.created += 1;
    }

    async fn flush(&mut self, store: &dyn Store) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.pending);
        store.create_versions(batch).await?;
        Ok(())
    }
}

fn to_version_model(repo_id: i64, tag_name: &str, resolved: ResolvedTag, body: String) -> version::ActiveModel {
    version::ActiveModel {
        repo_id: Set(repo_id),
        tag_name: Set(tag_name.to_string()),
        name: Set(resolved.name),
        prerelease: Set(resolved.prerelease),
        body: Set(body),
        created_at: Set(resolved.published_at.fixed_offset()),
        ..Default::default()
    }
}

/// Mark the repository removed when `err` says it is gone upstream.
async fn handle_listing_error(
    store: &dyn Store,
    repo: &repo::Model,
    err: ApiError,
) -> Result<SyncOutcome> {
    if err.is_removed_upstream() {
        tracing::info!(repo = %repo.full_name, error = %err, "Repository gone upstream, marking removed");
        store.mark_repo_removed(repo.id, Utc::now()).await?;
        return Ok(SyncOutcome::Aborted(AbortReason::RemovedUpstream));
    }

    tracing::warn!(repo = %repo.full_name, error = %err, "Could not list tags");
    Ok(SyncOutcome::Aborted(AbortReason::RemoteFailure))
}

/// Flush what is staged, notify the publisher and report the count.
async fn finish(
    store: &dyn Store,
    publisher: &dyn Publisher,
    repo: &repo::Model,
    mut staging: Staging,
    stop: Option<StopReason>,
) -> Result<SyncOutcome> {
    staging.flush(store).await?;
    let count = staging.created;

    if count > 0 && !publisher.ping_hub(&[repo.id]).await {
        tracing::warn!(repo = %repo.full_name, "Hub ping failed");
    }

    tracing::info!(repo = %repo.full_name, created = count, "Synced versions");

    Ok(match stop {
        Some(reason) => SyncOutcome::Partial { count, reason },
        None => SyncOutcome::Completed(count),
    })
}

/// Create a version for every tag of the repository not seen before.
///
/// Returns the number of versions created. A rendering failure or a remote
/// failure mid-pass stops the pass early; versions staged up to that point
/// are kept. The publisher is notified whenever at least one version was
/// created.
///
/// # Errors
/// Store failures are returned as [`SyncError`](super::SyncError).
pub async fn sync_versions(
    store: &dyn Store,
    client: &SelectedClient,
    publisher: &dyn Publisher,
    repo_id: i64,
    options: &SyncOptions,
) -> Result<SyncOutcome> {
    let Some(repo) = store.find_repo(repo_id).await? else {
        tracing::info!(repo_id, "Repository not found, skipping version sync");
        return Ok(SyncOutcome::Aborted(AbortReason::RepoNotFound));
    };

    if repo.is_removed() {
        tracing::debug!(repo = %repo.full_name, "Repository removed upstream, skipping version sync");
        return Ok(SyncOutcome::Aborted(AbortReason::AlreadyRemoved));
    }

    let api = client.api.as_ref();
    let quota = probe_quota(api).await;
    if !quota.is_usable() {
        tracing::info!(repo = %repo.full_name, remaining = %quota, "No quota left, skipping version sync");
        return Ok(SyncOutcome::Aborted(AbortReason::QuotaExhausted));
    }

    match api.has_tags(&repo.full_name).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(repo = %repo.full_name, "Repository has no tags");
            return Ok(SyncOutcome::Completed(0));
        }
        Err(e) => return handle_listing_error(store, &repo, e).await,
    }

    let tags = match api.all_tags(&repo.full_name).await {
        Ok(tags) => tags,
        Err(e) => return handle_listing_error(store, &repo, e).await,
    };
    tracing::debug!(repo = %repo.full_name, tags = tags.len(), "Fetched tags");

    let mut staging = Staging::default();

    for tag in &tags {
        if store.find_existing_version(repo.id, &tag.name).await? || staging.contains(&tag.name) {
            continue;
        }

        let resolved = match resolve_tag(api, &repo.full_name, tag).await {
            Ok(Some(resolved)) => resolved,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(repo = %repo.full_name, tag = %tag.name, error = %e, "Could not resolve tag");
                return finish(store, publisher, &repo, staging, Some(StopReason::RemoteFailure)).await;
            }
        };

        let message = strip_pgp_signature(&resolved.message);
        let body = if message.is_empty() {
            String::new()
        } else {
            match api.render_markdown(message, &repo.full_name).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!(
                        repo = %repo.full_name,
                        tag = %tag.name,
                        error = %e,
                        "Markdown rendering failed, deferring remaining tags"
                    );
                    return finish(store, publisher, &repo, staging, Some(StopReason::RenderingFailure))
                        .await;
                }
            }
        };

        let model = to_version_model(repo.id, &tag.name, resolved, body);
        staging.stage(model, &tag.name);

        if staging.pending.len() >= options.flush_every {
            staging.flush(store).await?;
        }
    }

    finish(store, publisher, &repo, staging, None).await
}
