use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string_len(Users::Username, 24))
                    .col(string_null(Users::Email))
                    .col(timestamp_with_time_zone(Users::CreateTime).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(Users::UpdateTime).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone_null(Users::DeleteTime))
                    .to_owned(),
            )
            .await?;

        // Uniqueness only binds live rows so a soft-deleted name can be reused.
        let conn = manager.get_connection();
        conn.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS uq_users_username_live \
             ON users (username) WHERE delete_time IS NULL",
        )
        .await?;
        conn.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS uq_users_email_live \
             ON users (email) WHERE delete_time IS NULL",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    CreateTime,
    UpdateTime,
    DeleteTime,
}
