//! Initial migration to create the starfeed database schema.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_users(manager).await?;
        self.create_repos(manager).await?;
        self.create_stars(manager).await?;
        self.create_versions(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Versions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Stars::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Repos::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_users(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Username).string().not_null())
                    .col(ColumnDef::new(Users::Name).string().null())
                    .col(ColumnDef::new(Users::AvatarUrl).string().null())
                    .col(ColumnDef::new(Users::AccessToken).text().not_null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Users::RemovedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_username")
                    .table(Users::Table)
                    .col(Users::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_repos(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Repos::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Repos::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    // Naming
                    .col(ColumnDef::new(Repos::FullName).string().not_null())
                    .col(ColumnDef::new(Repos::Name).string().not_null())
                    // Content
                    .col(ColumnDef::new(Repos::Description).text().null())
                    .col(ColumnDef::new(Repos::Homepage).text().null())
                    .col(ColumnDef::new(Repos::Language).string().null())
                    .col(ColumnDef::new(Repos::OwnerAvatarUrl).string().null())
                    // Tracking
                    .col(
                        ColumnDef::new(Repos::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Repos::RemovedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_repos_full_name")
                    .table(Repos::Table)
                    .col(Repos::FullName)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_stars(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Stars::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Stars::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Stars::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Stars::RepoId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Stars::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stars_user")
                            .from(Stars::Table, Stars::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stars_repo")
                            .from(Stars::Table, Stars::RepoId)
                            .to(Repos::Table, Repos::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One follow edge per (user, repo)
        manager
            .create_index(
                Index::create()
                    .name("idx_stars_user_repo")
                    .table(Stars::Table)
                    .col(Stars::UserId)
                    .col(Stars::RepoId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stars_repo")
                    .table(Stars::Table)
                    .col(Stars::RepoId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_versions(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Versions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Versions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Versions::RepoId).big_integer().not_null())
                    .col(ColumnDef::new(Versions::TagName).string().not_null())
                    .col(ColumnDef::new(Versions::Name).string().not_null())
                    .col(
                        ColumnDef::new(Versions::Prerelease)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Versions::Body).text().not_null())
                    .col(
                        ColumnDef::new(Versions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_versions_repo")
                            .from(Versions::Table, Versions::RepoId)
                            .to(Repos::Table, Repos::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Case-sensitive: "v1.0" and "V1.0" may both exist across passes
        manager
            .create_index(
                Index::create()
                    .name("idx_versions_repo_tag")
                    .table(Versions::Table)
                    .col(Versions::RepoId)
                    .col(Versions::TagName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Feed queries order by publish date
        manager
            .create_index(
                Index::create()
                    .name("idx_versions_created_at")
                    .table(Versions::Table)
                    .col(Versions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Name,
    AvatarUrl,
    AccessToken,
    CreatedAt,
    RemovedAt,
}

#[derive(DeriveIden)]
enum Repos {
    Table,
    Id,
    FullName,
    Name,
    Description,
    Homepage,
    Language,
    OwnerAvatarUrl,
    UpdatedAt,
    RemovedAt,
}

#[derive(DeriveIden)]
enum Stars {
    Table,
    Id,
    UserId,
    RepoId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Versions {
    Table,
    Id,
    RepoId,
    TagName,
    Name,
    Prerelease,
    Body,
    CreatedAt,
}
