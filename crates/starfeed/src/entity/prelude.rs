//! Common re-exports for convenient entity usage.

pub use super::repo::{
    ActiveModel as RepoActiveModel, Column as RepoColumn, Entity as Repo, Model as RepoModel,
};
pub use super::star::{
    ActiveModel as StarActiveModel, Column as StarColumn, Entity as Star, Model as StarModel,
};
pub use super::user::{
    ActiveModel as UserActiveModel, Column as UserColumn, Entity as User, Model as UserModel,
};
pub use super::version::{
    ActiveModel as VersionActiveModel, Column as VersionColumn, Entity as Version,
    Model as VersionModel,
};
