//! Version entity - a release (or bare tag) of a repository.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Version model. `(repo_id, tag_name)` is unique and compared case-sensitively.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "versions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub repo_id: i64,
    pub tag_name: String,
    /// Display name (release title, or the tag name when there is no release).
    pub name: String,
    #[sea_orm(default_value = false)]
    pub prerelease: bool,
    /// Rendered description.
    #[sea_orm(column_type = "Text")]
    pub body: String,
    /// When the release was published upstream, not when the row was inserted.
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::repo::Entity",
        from = "Column::RepoId",
        to = "super::repo::Column::Id",
        on_delete = "Cascade"
    )]
    Repo,
}

impl Related<super::repo::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repo.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
