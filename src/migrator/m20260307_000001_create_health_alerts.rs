use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(HealthAlerts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HealthAlerts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(HealthAlerts::AnimalId).uuid().not_null())
                    .col(ColumnDef::new(HealthAlerts::AlertType).string().not_null())
                    .col(ColumnDef::new(HealthAlerts::Severity).string().not_null())
                    .col(ColumnDef::new(HealthAlerts::Description).text().not_null())
                    .col(
                        ColumnDef::new(HealthAlerts::ConfidenceScore)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(HealthAlerts::VideoUrl).string())
                    .col(
                        ColumnDef::new(HealthAlerts::DetectedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(HealthAlerts::Resolved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(HealthAlerts::ResolvedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(HealthAlerts::Notes).text())
                    .col(
                        ColumnDef::new(HealthAlerts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-health_alert-animal_id")
                            .from(HealthAlerts::Table, HealthAlerts::AnimalId)
                            .to(Animals::Table, Animals::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Triage views fetch unresolved alerts per animal constantly
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx-health_alerts-animal_id-resolved")
                    .table(HealthAlerts::Table)
                    .col(HealthAlerts::AnimalId)
                    .col(HealthAlerts::Resolved)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(HealthAlerts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum HealthAlerts {
    Table,
    Id,
    AnimalId,
    AlertType,
    Severity,
    Description,
    ConfidenceScore,
    VideoUrl,
    DetectedAt,
    Resolved,
    ResolvedAt,
    Notes,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Animals {
    Table,
    Id,
}
