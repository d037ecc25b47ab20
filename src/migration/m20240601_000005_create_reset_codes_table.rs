use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum ResetCodes {
    Table,
    Id,
    Email,
    Code,
    ExpiresAt,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ResetCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ResetCodes::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ResetCodes::Email).string_len(255).not_null())
                    .col(ColumnDef::new(ResetCodes::Code).string_len(6).not_null())
                    .col(ColumnDef::new(ResetCodes::ExpiresAt).timestamp().not_null())
                    .col(
                        ColumnDef::new(ResetCodes::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reset_codes_email_expires")
                    .table(ResetCodes::Table)
                    .col(ResetCodes::Email)
                    .col(ResetCodes::ExpiresAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ResetCodes::Table).to_owned())
            .await
    }
}
