//! Starred repository synchronization for one user.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::types::{AbortReason, Result, StopReason, SyncOptions, SyncOutcome};
use crate::credentials::{SelectedClient, probe_quota};
use crate::entity::repo;
use crate::github::{RemoteRepo, to_repo_active_model};
use crate::store::Store;

/// Whether a known repository's metadata should be refreshed.
fn is_stale(known: &repo::Model, now: DateTime<Utc>, options: &SyncOptions) -> bool {
    known.updated_at.with_timezone(&Utc) < now - options.stale_after
}

/// Upsert the repository unless a fresh copy is already stored.
async fn refresh_repo(
    store: &dyn Store,
    remote: &RemoteRepo,
    now: DateTime<Utc>,
    options: &SyncOptions,
) -> Result<()> {
    let needs_upsert = match store.find_repo(remote.id).await? {
        Some(known) => is_stale(&known, now, options),
        None => true,
    };

    if needs_upsert {
        store
            .upsert_repo(to_repo_active_model(remote, now))
            .await?;
        tracing::debug!(repo = %remote.full_name, "Refreshed repository metadata");
    }

    Ok(())
}

/// Reconcile the user's stars with their starred listing on GitHub.
///
/// Walks every listing page, refreshing unknown or stale repositories and
/// creating stars for newly followed ones. Stars whose repository no longer
/// appears are deleted only when the walk reaches the last page.
///
/// Returns the number of repositories currently followed. A 404 on the
/// first page marks the user removed.
///
/// # Errors
/// Store failures are returned as [`SyncError`](super::SyncError).
pub async fn sync_starred_repos(
    store: &dyn Store,
    client: &SelectedClient,
    user_id: i64,
    options: &SyncOptions,
) -> Result<SyncOutcome> {
    let Some(user) = store.find_user(user_id).await? else {
        tracing::info!(user_id, "User not found, skipping star sync");
        return Ok(SyncOutcome::Aborted(AbortReason::UserNotFound));
    };

    if user.is_removed() {
        tracing::debug!(user = %user.username, "User removed upstream, skipping star sync");
        return Ok(SyncOutcome::Aborted(AbortReason::AlreadyRemoved));
    }

    let quota = probe_quota(client.api.as_ref()).await;
    if !quota.is_usable() {
        tracing::info!(user = %user.username, remaining = %quota, "No quota left, skipping star sync");
        return Ok(SyncOutcome::Aborted(AbortReason::QuotaExhausted));
    }

    let previously: HashSet<i64> = store
        .find_stars_by_user(user.id)
        .await?
        .into_iter()
        .collect();
    let mut current: HashSet<i64> = HashSet::new();
    let mut created = 0usize;
    let mut cursor: Option<String> = None;
    let mut first_page = true;

    loop {
        let page = match client
            .api
            .starred_page(&user.username, cursor.as_deref(), options.page_size)
            .await
        {
            Ok(page) => page,
            Err(e) if first_page && e.is_not_found() => {
                tracing::info!(user = %user.username, "User not found on GitHub, marking removed");
                store.mark_user_removed(user.id, Utc::now()).await?;
                return Ok(SyncOutcome::Aborted(AbortReason::RemovedUpstream));
            }
            Err(e) if first_page => {
                tracing::warn!(user = %user.username, error = %e, "Could not list starred repositories");
                return Ok(SyncOutcome::Aborted(AbortReason::RemoteFailure));
            }
            Err(e) => {
                tracing::warn!(
                    user = %user.username,
                    processed = current.len(),
                    error = %e,
                    "Starred listing failed mid-walk, keeping progress"
                );
                return Ok(SyncOutcome::Partial {
                    count: current.len(),
                    reason: StopReason::RemoteFailure,
                });
            }
        };
        first_page = false;

        let now = Utc::now();
        for remote in &page.items {
            refresh_repo(store, remote, now, options).await?;

            if current.insert(remote.id) && !previously.contains(&remote.id) {
                store.create_star(user.id, remote.id).await?;
                created += 1;
            }
        }

        if page.is_last() {
            break;
        }
        cursor = page.next;
    }

    let removed: Vec<i64> = previously.difference(&current).copied().collect();
    let deleted = if removed.is_empty() {
        0
    } else {
        store.delete_stars(&removed, user.id).await?
    };

    tracing::info!(
        user = %user.username,
        followed = current.len(),
        created,
        deleted,
        "Synced starred repositories"
    );

    Ok(SyncOutcome::Completed(current.len()))
}
