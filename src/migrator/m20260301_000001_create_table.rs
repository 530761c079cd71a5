use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create Users Table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(Users::UpdatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        // Create Animals Table
        manager
            .create_table(
                Table::create()
                    .table(Animals::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Animals::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Animals::Name).string().not_null())
                    .col(ColumnDef::new(Animals::Species).string().not_null())
                    .col(ColumnDef::new(Animals::PenLocation).string().not_null())
                    .col(ColumnDef::new(Animals::AgeMonths).integer().not_null())
                    .col(ColumnDef::new(Animals::WeightKg).double().not_null())
                    .col(
                        ColumnDef::new(Animals::HealthStatus)
                            .string()
                            .not_null()
                            .default("healthy"),
                    )
                    .col(
                        ColumnDef::new(Animals::LastChecked)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Animals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Animals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    PasswordHash,
    Name,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Animals {
    Table,
    Id,
    Name,
    Species,
    PenLocation,
    AgeMonths,
    WeightKg,
    HealthStatus,
    LastChecked,
    CreatedAt,
}
