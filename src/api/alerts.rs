use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{animal, health_alert};
use crate::error::ApiError;
use crate::notify::{ChangeBroadcaster, ChangeEvent};

#[derive(Serialize)]
pub struct AlertWithAnimal {
    #[serde(flatten)]
    pub alert: health_alert::Model,
    pub animal: Option<animal::Model>,
}

pub async fn list_alerts(
    Extension(db): Extension<DatabaseConnection>,
) -> Result<impl IntoResponse, ApiError> {
    let alerts = health_alert::Entity::find()
        .order_by_desc(health_alert::Column::DetectedAt)
        .all(&db)
        .await?;

    let animals = animal::Entity::find().all(&db).await?;
    let animal_map: HashMap<Uuid, animal::Model> =
        animals.into_iter().map(|a| (a.id, a)).collect();

    let response: Vec<AlertWithAnimal> = alerts
        .into_iter()
        .map(|alert| AlertWithAnimal {
            animal: animal_map.get(&alert.animal_id).cloned(),
            alert,
        })
        .collect();

    Ok(Json(response))
}

pub async fn get_alert(
    Extension(db): Extension<DatabaseConnection>,
    Path(alert_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let alert = health_alert::Entity::find_by_id(alert_id)
        .one(&db)
        .await?
        .ok_or(ApiError::NotFound("Alert"))?;
    let animal = animal::Entity::find_by_id(alert.animal_id).one(&db).await?;
    Ok(Json(AlertWithAnimal { alert, animal }))
}

pub async fn list_animal_alerts(
    Extension(db): Extension<DatabaseConnection>,
    Path(animal_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    animal::Entity::find_by_id(animal_id)
        .one(&db)
        .await?
        .ok_or(ApiError::NotFound("Animal"))?;

    let alerts = health_alert::Entity::find()
        .filter(health_alert::Column::AnimalId.eq(animal_id))
        .order_by_desc(health_alert::Column::DetectedAt)
        .all(&db)
        .await?;
    Ok(Json(alerts))
}

#[derive(Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub notes: String,
}

/// Marks an alert handled. Re-resolving is allowed and overwrites the
/// notes and timestamp.
pub fn apply_resolution(
    mut alert: health_alert::Model,
    notes: String,
    now: DateTime<FixedOffset>,
) -> health_alert::Model {
    alert.resolved = true;
    alert.resolved_at = Some(now);
    alert.notes = Some(notes);
    alert
}

pub async fn resolve_alert(
    Extension(db): Extension<DatabaseConnection>,
    Extension(broadcaster): Extension<Arc<ChangeBroadcaster>>,
    Path(alert_id): Path<Uuid>,
    Json(payload): Json<ResolveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let alert = health_alert::Entity::find_by_id(alert_id)
        .one(&db)
        .await?
        .ok_or(ApiError::NotFound("Alert"))?;

    let resolved = apply_resolution(alert, payload.notes, Utc::now().fixed_offset());

    let mut active = resolved.clone().into_active_model();
    active.resolved = Set(resolved.resolved);
    active.resolved_at = Set(resolved.resolved_at);
    active.notes = Set(resolved.notes.clone());
    let saved = active.update(&db).await?;

    tracing::Span::current()
        .record("alert_id", tracing::field::display(saved.id))
        .record("business_event", "alert resolved");
    metrics::counter!("herdwatch_alerts_resolved_total").increment(1);
    broadcaster
        .publish("health_alerts", ChangeEvent::Update, saved.id)
        .await;

    Ok(Json(saved))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unresolved_alert() -> health_alert::Model {
        let now = Utc::now().fixed_offset();
        health_alert::Model {
            id: Uuid::new_v4(),
            animal_id: Uuid::new_v4(),
            alert_type: "coughing".to_string(),
            severity: "critical".to_string(),
            description: "Repeated coughing pattern detected".to_string(),
            confidence_score: 88,
            video_url: None,
            detected_at: now,
            resolved: false,
            resolved_at: None,
            notes: None,
            created_at: now,
        }
    }

    #[test]
    fn resolution_sets_all_three_fields() {
        let now = Utc::now().fixed_offset();
        let resolved = apply_resolution(unresolved_alert(), "treated".to_string(), now);
        assert!(resolved.resolved);
        assert_eq!(resolved.resolved_at, Some(now));
        assert_eq!(resolved.notes.as_deref(), Some("treated"));
    }

    #[test]
    fn re_resolution_keeps_latest_notes_and_timestamp() {
        let first_at = Utc::now().fixed_offset();
        let second_at = first_at + chrono::Duration::minutes(10);

        let once = apply_resolution(unresolved_alert(), "treated".to_string(), first_at);
        let twice = apply_resolution(once, "follow-up exam clear".to_string(), second_at);

        assert!(twice.resolved);
        assert_eq!(twice.notes.as_deref(), Some("follow-up exam clear"));
        assert_eq!(twice.resolved_at, Some(second_at));
    }
}
