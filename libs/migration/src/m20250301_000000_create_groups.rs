use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Groups::Table)
                    .if_not_exists()
                    .col(pk_auto(Groups::Id))
                    .col(string(Groups::Name).unique_key())
                    .col(text_null(Groups::Info))
                    .col(integer(Groups::Level))
                    .col(timestamp_with_time_zone(Groups::CreateTime).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(Groups::UpdateTime).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone_null(Groups::DeleteTime))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_groups_level")
                    .table(Groups::Table)
                    .col(Groups::Level)
                    .to_owned(),
            )
            .await?;

        // Level 1 marks the administrative group, level 2 the registration default.
        let seed = Query::insert()
            .into_table(Groups::Table)
            .columns([Groups::Name, Groups::Info, Groups::Level])
            .values_panic(["root".into(), "Super administrators".into(), 1.into()])
            .values_panic(["guest".into(), "Default group for new users".into(), 2.into()])
            .to_owned();
        manager.exec_stmt(seed).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Groups::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Groups {
    Table,
    Id,
    Name,
    Info,
    Level,
    CreateTime,
    UpdateTime,
    DeleteTime,
}
