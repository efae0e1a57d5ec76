use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, TransactionTrait,
};

use crate::entity::version::{ActiveModel, Column, Entity as Version};

use super::errors::Result;

/// Whether a version with exactly this tag name exists for the repository.
pub async fn exists<C: ConnectionTrait>(db: &C, repo_id: i64, tag_name: &str) -> Result<bool> {
    let count = Version::find()
        .filter(Column::RepoId.eq(repo_id))
        .filter(Column::TagName.eq(tag_name))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Insert a batch of versions in a single transaction.
///
/// # Errors
/// Returns `StoreError::Database` if any insert fails; nothing from the batch is kept.
pub async fn insert_batch<C>(db: &C, models: Vec<ActiveModel>) -> Result<u64>
where
    C: ConnectionTrait + TransactionTrait,
{
    if models.is_empty() {
        return Ok(0);
    }

    let count = models.len() as u64;
    let txn = db.begin().await?;
    Version::insert_many(models)
        .exec_without_returning(&txn)
        .await?;
    txn.commit().await?;

    tracing::debug!(count, "Inserted version batch");
    Ok(count)
}
