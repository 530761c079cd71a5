use sea_orm_migration::prelude::*;

mod m20260301_000001_create_table;
mod m20260305_000001_create_video_analyses;
mod m20260307_000001_create_health_alerts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_table::Migration),
            Box::new(m20260305_000001_create_video_analyses::Migration),
            Box::new(m20260307_000001_create_health_alerts::Migration),
        ]
    }
}
