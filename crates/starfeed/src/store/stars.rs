use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set,
};

use crate::entity::star::{self, ActiveModel, Column, Entity as Star};
use crate::entity::user;

use super::errors::Result;

/// Repository ids currently followed by a user.
pub async fn find_repo_ids_by_user<C: ConnectionTrait>(db: &C, user_id: i64) -> Result<Vec<i64>> {
    Ok(Star::find()
        .select_only()
        .column(Column::RepoId)
        .filter(Column::UserId.eq(user_id))
        .order_by_asc(Column::RepoId)
        .into_tuple()
        .all(db)
        .await?)
}

/// Create the `(user_id, repo_id)` edge if it does not exist yet.
pub async fn create<C: ConnectionTrait>(db: &C, user_id: i64, repo_id: i64) -> Result<()> {
    let model = ActiveModel {
        user_id: Set(user_id),
        repo_id: Set(repo_id),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    };

    Star::insert(model)
        .on_conflict(
            OnConflict::columns([Column::UserId, Column::RepoId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Delete the edges between `user_id` and each of `repo_ids`.
pub async fn delete_for_user<C: ConnectionTrait>(
    db: &C,
    repo_ids: &[i64],
    user_id: i64,
) -> Result<u64> {
    if repo_ids.is_empty() {
        return Ok(0);
    }

    let result = Star::delete_many()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::RepoId.is_in(repo_ids.iter().copied()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Distinct usernames of active users following any of `repo_ids`.
pub async fn find_stargazer_usernames<C: ConnectionTrait>(
    db: &C,
    repo_ids: &[i64],
) -> Result<Vec<String>> {
    if repo_ids.is_empty() {
        return Ok(Vec::new());
    }

    Ok(Star::find()
        .select_only()
        .column(user::Column::Username)
        .distinct()
        .join(JoinType::InnerJoin, star::Relation::User.def())
        .filter(Column::RepoId.is_in(repo_ids.iter().copied()))
        .filter(user::Column::RemovedAt.is_null())
        .order_by_asc(user::Column::Username)
        .into_tuple()
        .all(db)
        .await?)
}
