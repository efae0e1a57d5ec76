use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::entity::user::{Column, Entity as User, Model};

use super::errors::Result;

/// Find a user by GitHub account id.
pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Model>> {
    Ok(User::find_by_id(id).one(db).await?)
}

/// Set `removed_at` on a user. Returns the number of rows touched.
pub async fn mark_removed<C: ConnectionTrait>(
    db: &C,
    id: i64,
    at: DateTime<Utc>,
) -> Result<u64> {
    let result = User::update_many()
        .col_expr(Column::RemovedAt, Expr::value(at.fixed_offset()))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// All users that are still present upstream and hold a token, by ascending id.
pub async fn find_with_credentials<C: ConnectionTrait>(db: &C) -> Result<Vec<Model>> {
    Ok(User::find()
        .filter(Column::RemovedAt.is_null())
        .filter(Column::AccessToken.ne(""))
        .order_by_asc(Column::Id)
        .all(db)
        .await?)
}

/// Ids of every user still present upstream, by ascending id.
pub async fn find_active_ids<C: ConnectionTrait>(db: &C) -> Result<Vec<i64>> {
    Ok(User::find()
        .select_only()
        .column(Column::Id)
        .filter(Column::RemovedAt.is_null())
        .order_by_asc(Column::Id)
        .into_tuple()
        .all(db)
        .await?)
}
