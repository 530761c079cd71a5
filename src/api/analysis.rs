use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Multipart, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::analyzer::VideoAnalyzer;
use crate::entities::{animal, video_analysis};
use crate::error::ApiError;
use crate::health::AnalysisStatus;
use crate::locks::AnimalLocks;
use crate::notify::{ChangeBroadcaster, ChangeEvent};
use crate::processing::{run_analysis, AnalysisOutcome};
use crate::storage::VideoStore;

fn analysis_response(result: Result<AnalysisOutcome, ApiError>) -> Response {
    match result {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "analysis": outcome,
                "message": "Video analysis completed successfully",
            })),
        )
            .into_response(),
        Err(e) => (
            e.status_code(),
            Json(json!({"success": false, "error": e.to_string()})),
        )
            .into_response(),
    }
}

/// Full workflow behind one submit: store the footage, open an analysis
/// row, analyze, derive, persist. Synchronous; the response carries the
/// finished report.
pub async fn analyze_animal(
    Extension(db): Extension<DatabaseConnection>,
    Extension(store): Extension<Arc<VideoStore>>,
    Extension(analyzer): Extension<Arc<dyn VideoAnalyzer>>,
    Extension(locks): Extension<Arc<AnimalLocks>>,
    Extension(broadcaster): Extension<Arc<ChangeBroadcaster>>,
    Path(animal_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Response {
    let result = async {
        animal::Entity::find_by_id(animal_id)
            .one(&db)
            .await?
            .ok_or(ApiError::NotFound("Animal"))?;

        let mut video = None;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::Validation(e.to_string()))?
        {
            if field.name() == Some("video") {
                let file_name = field.file_name().unwrap_or("video.mp4").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(e.to_string()))?;
                video = Some((file_name, data));
                break;
            }
        }
        let (file_name, data) =
            video.ok_or_else(|| ApiError::Validation("no video field in upload".to_string()))?;

        let stored = store.store(animal_id, &file_name, data).await?;

        let analysis_id = Uuid::new_v4();
        let now = Utc::now();
        let row = video_analysis::ActiveModel {
            id: Set(analysis_id),
            animal_id: Set(animal_id),
            video_url: Set(stored.public_url),
            analysis_status: Set(AnalysisStatus::Processing.as_str().to_string()),
            duration_seconds: Set(0),
            behaviors_detected: Set(json!([])),
            anomalies_found: Set(0),
            processed_at: Set(None),
            created_at: Set(now.into()),
        };
        row.insert(&db).await?;
        broadcaster
            .publish("video_analyses", ChangeEvent::Insert, analysis_id)
            .await;

        run_analysis(&db, analyzer.as_ref(), &locks, &broadcaster, analysis_id).await
    }
    .await;

    analysis_response(result)
}

#[derive(Deserialize)]
pub struct InternalAnalyzeRequest {
    pub video_url: String,
    pub animal_id: Uuid,
    pub analysis_id: Uuid,
}

/// Analysis-endpoint contract: runs analysis for an already-created row.
pub async fn internal_analyze(
    Extension(db): Extension<DatabaseConnection>,
    Extension(analyzer): Extension<Arc<dyn VideoAnalyzer>>,
    Extension(locks): Extension<Arc<AnimalLocks>>,
    Extension(broadcaster): Extension<Arc<ChangeBroadcaster>>,
    Json(payload): Json<InternalAnalyzeRequest>,
) -> Response {
    let result = async {
        let analysis = video_analysis::Entity::find_by_id(payload.analysis_id)
            .one(&db)
            .await?
            .ok_or(ApiError::NotFound("Analysis"))?;

        if analysis.animal_id != payload.animal_id || analysis.video_url != payload.video_url {
            return Err(ApiError::Validation(
                "request does not match the analysis record".to_string(),
            ));
        }

        run_analysis(&db, analyzer.as_ref(), &locks, &broadcaster, payload.analysis_id).await
    }
    .await;

    analysis_response(result)
}

#[derive(Serialize)]
pub struct AnalysisWithAnimal {
    #[serde(flatten)]
    pub analysis: video_analysis::Model,
    pub animal: Option<animal::Model>,
}

pub async fn list_analyses(
    Extension(db): Extension<DatabaseConnection>,
) -> Result<impl IntoResponse, ApiError> {
    let analyses = video_analysis::Entity::find()
        .order_by_desc(video_analysis::Column::CreatedAt)
        .all(&db)
        .await?;

    let animals = animal::Entity::find().all(&db).await?;
    let animal_map: HashMap<Uuid, animal::Model> =
        animals.into_iter().map(|a| (a.id, a)).collect();

    let response: Vec<AnalysisWithAnimal> = analyses
        .into_iter()
        .map(|analysis| AnalysisWithAnimal {
            animal: animal_map.get(&analysis.animal_id).cloned(),
            analysis,
        })
        .collect();

    Ok(Json(response))
}

pub async fn list_animal_analyses(
    Extension(db): Extension<DatabaseConnection>,
    Path(animal_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    animal::Entity::find_by_id(animal_id)
        .one(&db)
        .await?
        .ok_or(ApiError::NotFound("Animal"))?;

    let analyses = video_analysis::Entity::find()
        .filter(video_analysis::Column::AnimalId.eq(animal_id))
        .order_by_desc(video_analysis::Column::CreatedAt)
        .all(&db)
        .await?;
    Ok(Json(analyses))
}
