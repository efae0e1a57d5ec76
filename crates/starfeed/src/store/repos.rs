use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::entity::repo::{ActiveModel, Column, Entity as Repo, Model};

use super::errors::{Result, StoreError};

/// Find a repository by GitHub repository id.
pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Model>> {
    Ok(Repo::find_by_id(id).one(db).await?)
}

/// Columns refreshed when an already-known repository is upserted.
///
/// `removed_at` is deliberately absent.
const REFRESHED_COLUMNS: [Column; 7] = [
    Column::FullName,
    Column::Name,
    Column::Description,
    Column::Homepage,
    Column::Language,
    Column::OwnerAvatarUrl,
    Column::UpdatedAt,
];

pub(crate) fn build_upsert_on_conflict() -> OnConflict {
    OnConflict::column(Column::Id)
        .update_columns(REFRESHED_COLUMNS)
        .to_owned()
}

/// Insert or refresh a repository keyed by its GitHub id.
pub async fn upsert<C: ConnectionTrait>(db: &C, model: ActiveModel) -> Result<Model> {
    let id = match &model.id {
        ActiveValue::Set(id) | ActiveValue::Unchanged(id) => *id,
        ActiveValue::NotSet => return Err(StoreError::invalid_input("Missing required field: id")),
    };

    Repo::insert(model)
        .on_conflict(build_upsert_on_conflict())
        .exec_without_returning(db)
        .await?;

    find_by_id(db, id)
        .await?
        .ok_or_else(|| StoreError::invalid_input(format!("repo {id} vanished after upsert")))
}

/// Set `removed_at` on a repository. Returns the number of rows touched.
pub async fn mark_removed<C: ConnectionTrait>(
    db: &C,
    id: i64,
    at: DateTime<Utc>,
) -> Result<u64> {
    let result = Repo::update_many()
        .col_expr(Column::RemovedAt, Expr::value(at.fixed_offset()))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Ids of every repository still accessible upstream, by ascending id.
pub async fn find_active_ids<C: ConnectionTrait>(db: &C) -> Result<Vec<i64>> {
    Ok(Repo::find()
        .select_only()
        .column(Column::Id)
        .filter(Column::RemovedAt.is_null())
        .order_by_asc(Column::Id)
        .into_tuple()
        .all(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{QueryTrait, Set};

    #[test]
    fn upsert_on_conflict_never_touches_removed_at() {
        let model = ActiveModel {
            id: Set(1),
            full_name: Set("octocat/hello-world".to_string()),
            name: Set("hello-world".to_string()),
            description: Set(None),
            homepage: Set(None),
            language: Set(None),
            owner_avatar_url: Set(None),
            updated_at: Set(Utc::now().fixed_offset()),
            removed_at: Set(None),
        };

        let sql = Repo::insert(model)
            .on_conflict(build_upsert_on_conflict())
            .build(sea_orm::DatabaseBackend::Sqlite)
            .to_string();

        assert!(sql.contains("ON CONFLICT"), "missing ON CONFLICT: {sql}");
        assert!(sql.contains("DO UPDATE"), "missing DO UPDATE: {sql}");
        let update_clause = sql.split("DO UPDATE").nth(1).unwrap_or_default();
        assert!(update_clause.contains("\"updated_at\""), "{sql}");
        assert!(!update_clause.contains("\"removed_at\""), "{sql}");
    }
}
