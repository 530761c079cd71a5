use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VideoAnalyses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VideoAnalyses::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VideoAnalyses::AnimalId).uuid().not_null())
                    .col(ColumnDef::new(VideoAnalyses::VideoUrl).string().not_null())
                    .col(
                        ColumnDef::new(VideoAnalyses::AnalysisStatus)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(VideoAnalyses::DurationSeconds)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(VideoAnalyses::BehaviorsDetected)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VideoAnalyses::AnomaliesFound)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(VideoAnalyses::ProcessedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(VideoAnalyses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-video_analysis-animal_id")
                            .from(VideoAnalyses::Table, VideoAnalyses::AnimalId)
                            .to(Animals::Table, Animals::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VideoAnalyses::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VideoAnalyses {
    Table,
    Id,
    AnimalId,
    VideoUrl,
    AnalysisStatus,
    DurationSeconds,
    BehaviorsDetected,
    AnomaliesFound,
    ProcessedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Animals {
    Table,
    Id,
}
