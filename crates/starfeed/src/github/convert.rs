//! Conversion of GitHub data into starfeed entities.

use chrono::{DateTime, Utc};
use sea_orm::Set;

use super::types::RemoteRepo;
use crate::entity::repo::ActiveModel as RepoActiveModel;

/// Build a repo active model from a starred-listing item.
///
/// `removed_at` is left unset so an upsert never clears or sets it.
pub fn to_repo_active_model(remote: &RemoteRepo, refreshed_at: DateTime<Utc>) -> RepoActiveModel {
    RepoActiveModel {
        id: Set(remote.id),
        full_name: Set(remote.full_name.clone()),
        name: Set(remote.name.clone()),
        description: Set(remote.description.clone()),
        homepage: Set(remote.homepage.clone()),
        language: Set(remote.language.clone()),
        owner_avatar_url: Set(remote.owner_avatar_url.clone()),
        updated_at: Set(refreshed_at.fixed_offset()),
        ..Default::default()
    }
}
