use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserIdentities::Table)
                    .if_not_exists()
                    .col(pk_auto(UserIdentities::Id))
                    .col(integer(UserIdentities::UserId))
                    .col(string_len(UserIdentities::IdentityType, 100))
                    .col(string_len(UserIdentities::Identifier, 100))
                    .col(string(UserIdentities::Credential))
                    .col(
                        timestamp_with_time_zone(UserIdentities::CreateTime)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(UserIdentities::UpdateTime)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(UserIdentities::DeleteTime))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_identities_user_id")
                    .table(UserIdentities::Table)
                    .col(UserIdentities::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_identities_lookup")
                    .table(UserIdentities::Table)
                    .col(UserIdentities::IdentityType)
                    .col(UserIdentities::Identifier)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserIdentities::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserIdentities {
    Table,
    Id,
    UserId,
    IdentityType,
    Identifier,
    Credential,
    CreateTime,
    UpdateTime,
    DeleteTime,
}
