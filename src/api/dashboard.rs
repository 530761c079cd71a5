use axum::{extract::Extension, response::IntoResponse, Json};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;

use crate::entities::{animal, health_alert};
use crate::error::ApiError;
use crate::health::HealthStatus;
use crate::herd::health_rate;

#[derive(Serialize)]
pub struct DashboardStats {
    pub total_animals: u64,
    pub healthy_animals: u64,
    pub monitoring_animals: u64,
    pub active_alerts: u64,
    pub health_rate: i32,
}

pub async fn stats(
    Extension(db): Extension<DatabaseConnection>,
) -> Result<impl IntoResponse, ApiError> {
    let total_animals = animal::Entity::find().count(&db).await?;
    let healthy_animals = animal::Entity::find()
        .filter(animal::Column::HealthStatus.eq(HealthStatus::Healthy.as_str()))
        .count(&db)
        .await?;
    let monitoring_animals = animal::Entity::find()
        .filter(animal::Column::HealthStatus.eq(HealthStatus::Monitoring.as_str()))
        .count(&db)
        .await?;
    let active_alerts = health_alert::Entity::find()
        .filter(health_alert::Column::Resolved.eq(false))
        .count(&db)
        .await?;

    Ok(Json(DashboardStats {
        total_animals,
        healthy_animals,
        monitoring_animals,
        active_alerts,
        health_rate: health_rate(healthy_animals, total_animals),
    }))
}
