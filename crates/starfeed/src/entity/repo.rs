//! Repo entity - a GitHub repository starred by at least one user.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Repo model, keyed by the GitHub repository id.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repos")]
pub struct Model {
    /// GitHub repository id.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    // ─── Naming ──────────────────────────────────────────────────────────────
    /// Full name in `owner/name` form.
    pub full_name: String,
    /// Repository name without the owner.
    pub name: String,

    // ─── Content ─────────────────────────────────────────────────────────────
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub homepage: Option<String>,
    /// Primary programming language.
    pub language: Option<String>,
    pub owner_avatar_url: Option<String>,

    // ─── Tracking ────────────────────────────────────────────────────────────
    /// When the metadata was last refreshed from GitHub.
    pub updated_at: DateTimeWithTimeZone,
    /// Set once the repository is inaccessible (deleted or blocked) upstream.
    pub removed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::star::Entity")]
    Star,
    #[sea_orm(has_many = "super::version::Entity")]
    Version,
}

impl Related<super::star::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Star.def()
    }
}

impl Related<super::version::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Version.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the repository has been marked as gone upstream.
    pub fn is_removed(&self) -> bool {
        self.removed_at.is_some()
    }

    /// Split the full name into `(owner, name)`.
    pub fn owner_and_name(&self) -> (&str, &str) {
        self.full_name
            .split_once('/')
            .unwrap_or(("", self.full_name.as_str()))
    }
}
