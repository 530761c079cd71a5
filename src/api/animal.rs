use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::entities::{animal, health_alert};
use crate::error::ApiError;
use crate::health::{HealthStatus, Species};
use crate::herd::{self, AnimalFilter};
use crate::notify::{ChangeBroadcaster, ChangeEvent};

#[derive(Deserialize)]
pub struct CreateAnimalRequest {
    name: String,
    species: String,
    pen_location: String,
    age_months: i32,
    weight_kg: f64,
}

fn validate_vitals(age_months: i32, weight_kg: f64) -> Result<(), ApiError> {
    if age_months < 0 {
        return Err(ApiError::Validation("age_months must not be negative".to_string()));
    }
    if weight_kg < 0.0 || !weight_kg.is_finite() {
        return Err(ApiError::Validation("weight_kg must not be negative".to_string()));
    }
    Ok(())
}

pub async fn create_animal(
    Extension(db): Extension<DatabaseConnection>,
    Extension(broadcaster): Extension<Arc<ChangeBroadcaster>>,
    Json(payload): Json<CreateAnimalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }
    let species = Species::parse(&payload.species)
        .ok_or_else(|| ApiError::Validation(format!("unknown species '{}'", payload.species)))?;
    validate_vitals(payload.age_months, payload.weight_kg)?;

    let now = Utc::now();
    let new_animal = animal::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        species: Set(species.as_str().to_string()),
        pen_location: Set(payload.pen_location),
        age_months: Set(payload.age_months),
        weight_kg: Set(payload.weight_kg),
        health_status: Set(HealthStatus::Healthy.as_str().to_string()),
        last_checked: Set(now.into()),
        created_at: Set(now.into()),
    };

    let saved = new_animal.insert(&db).await?;
    tracing::Span::current()
        .record("animal_id", tracing::field::display(saved.id))
        .record("business_event", "animal registered");
    metrics::gauge!("herdwatch_animals_total").increment(1.0);
    broadcaster
        .publish("animals", ChangeEvent::Insert, saved.id)
        .await;

    Ok((StatusCode::CREATED, Json(saved)))
}

#[derive(Deserialize)]
pub struct ListAnimalsParams {
    pub species: Option<String>,
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct AnimalWithAlerts {
    #[serde(flatten)]
    pub animal: animal::Model,
    pub unresolved_alerts: u64,
}

pub async fn list_animals(
    Extension(db): Extension<DatabaseConnection>,
    Query(params): Query<ListAnimalsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = AnimalFilter::from_params(params.species.as_deref(), params.status.as_deref())?;

    let animals = animal::Entity::find()
        .order_by_desc(animal::Column::CreatedAt)
        .all(&db)
        .await?;

    let open_alerts = health_alert::Entity::find()
        .filter(health_alert::Column::Resolved.eq(false))
        .all(&db)
        .await?;
    let counts = herd::unresolved_counts(&open_alerts);

    let response: Vec<AnimalWithAlerts> = herd::filter_animals(animals, filter)
        .into_iter()
        .map(|animal| AnimalWithAlerts {
            unresolved_alerts: counts.get(&animal.id).copied().unwrap_or(0),
            animal,
        })
        .collect();

    Ok(Json(response))
}

pub async fn get_animal(
    Extension(db): Extension<DatabaseConnection>,
    Path(animal_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let animal = animal::Entity::find_by_id(animal_id)
        .one(&db)
        .await?
        .ok_or(ApiError::NotFound("Animal"))?;
    Ok(Json(animal))
}

#[derive(Deserialize)]
pub struct UpdateAnimalRequest {
    name: Option<String>,
    species: Option<String>,
    pen_location: Option<String>,
    age_months: Option<i32>,
    weight_kg: Option<f64>,
    /// Direct user edit of the status, outside the analysis workflow.
    health_status: Option<String>,
}

pub async fn update_animal(
    Extension(db): Extension<DatabaseConnection>,
    Extension(broadcaster): Extension<Arc<ChangeBroadcaster>>,
    Path(animal_id): Path<Uuid>,
    Json(payload): Json<UpdateAnimalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let animal = animal::Entity::find_by_id(animal_id)
        .one(&db)
        .await?
        .ok_or(ApiError::NotFound("Animal"))?;

    let mut active = animal.into_active_model();
    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::Validation("name must not be empty".to_string()));
        }
        active.name = Set(name);
    }
    if let Some(species) = payload.species {
        let species = Species::parse(&species)
            .ok_or_else(|| ApiError::Validation(format!("unknown species '{species}'")))?;
        active.species = Set(species.as_str().to_string());
    }
    if let Some(pen_location) = payload.pen_location {
        active.pen_location = Set(pen_location);
    }
    if let Some(age_months) = payload.age_months {
        validate_vitals(age_months, 0.0)?;
        active.age_months = Set(age_months);
    }
    if let Some(weight_kg) = payload.weight_kg {
        validate_vitals(0, weight_kg)?;
        active.weight_kg = Set(weight_kg);
    }
    if let Some(status) = payload.health_status {
        let status = HealthStatus::parse(&status)
            .ok_or_else(|| ApiError::Validation(format!("unknown health status '{status}'")))?;
        active.health_status = Set(status.as_str().to_string());
        active.last_checked = Set(Utc::now().into());
    }

    let updated = active.update(&db).await?;
    broadcaster
        .publish("animals", ChangeEvent::Update, updated.id)
        .await;
    Ok(Json(updated))
}

pub async fn delete_animal(
    Extension(db): Extension<DatabaseConnection>,
    Extension(broadcaster): Extension<Arc<ChangeBroadcaster>>,
    Path(animal_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = animal::Entity::delete_by_id(animal_id).exec(&db).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Animal"));
    }
    metrics::gauge!("herdwatch_animals_total").decrement(1.0);
    broadcaster
        .publish("animals", ChangeEvent::Delete, animal_id)
        .await;
    Ok(Json(json!({"message": "Animal deleted"})))
}
