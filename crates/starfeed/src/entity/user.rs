//! User entity - an account whose starred repositories are followed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User model, keyed by the GitHub account id.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// GitHub account id.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    /// GitHub login.
    pub username: String,
    /// Display name.
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    /// OAuth access token obtained at login.
    #[serde(skip_serializing)]
    #[sea_orm(column_type = "Text")]
    pub access_token: String,
    pub created_at: DateTimeWithTimeZone,
    /// Set once the account is gone upstream.
    pub removed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::star::Entity")]
    Star,
}

impl Related<super::star::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Star.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the account has been marked as gone upstream.
    pub fn is_removed(&self) -> bool {
        self.removed_at.is_some()
    }
}
