use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserGroups::Table)
                    .if_not_exists()
                    .col(pk_auto(UserGroups::Id))
                    .col(integer(UserGroups::UserId))
                    .col(integer(UserGroups::GroupId))
                    .col(timestamp_with_time_zone(UserGroups::CreateTime).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone_null(UserGroups::DeleteTime))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_groups_user_id")
                    .table(UserGroups::Table)
                    .col(UserGroups::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_groups_group_id")
                    .table(UserGroups::Table)
                    .col(UserGroups::GroupId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserGroups::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserGroups {
    Table,
    Id,
    UserId,
    GroupId,
    CreateTime,
    DeleteTime,
}
