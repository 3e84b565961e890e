use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProviderBlacklist::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProviderBlacklist::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProviderBlacklist::Platform).text().not_null())
                    .col(
                        ColumnDef::new(ProviderBlacklist::ProviderName)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProviderBlacklist::FailureCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ProviderBlacklist::BlacklistedAt).timestamp())
                    .col(ColumnDef::new(ProviderBlacklist::BlacklistedUntil).timestamp())
                    .col(ColumnDef::new(ProviderBlacklist::LastFailureAt).timestamp())
                    .col(
                        ColumnDef::new(ProviderBlacklist::BlacklistLevel)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ProviderBlacklist::LastRecoveredAt).timestamp())
                    .col(
                        ColumnDef::new(ProviderBlacklist::LastDegradeHour)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ProviderBlacklist::LastFailureWindowStart).timestamp())
                    .col(
                        ColumnDef::new(ProviderBlacklist::AutoRecovered)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ProviderBlacklist::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ProviderBlacklist::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ProviderBlacklist::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // (platform, provider_name) 唯一，插入竞争由该约束裁决
        manager
            .create_index(
                Index::create()
                    .name("idx_provider_blacklist_platform_provider")
                    .table(ProviderBlacklist::Table)
                    .col(ProviderBlacklist::Platform)
                    .col(ProviderBlacklist::ProviderName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_provider_blacklist_blacklisted_until")
                    .table(ProviderBlacklist::Table)
                    .col(ProviderBlacklist::BlacklistedUntil)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProviderBlacklist::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProviderBlacklist {
    Table,
    Id,
    Platform,
    ProviderName,
    FailureCount,
    BlacklistedAt,
    BlacklistedUntil,
    LastFailureAt,
    BlacklistLevel,
    LastRecoveredAt,
    LastDegradeHour,
    LastFailureWindowStart,
    AutoRecovered,
    Version,
    CreatedAt,
    UpdatedAt,
}
