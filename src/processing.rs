use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, Set, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::analyzer::{AnalysisReport, VideoAnalyzer};
use crate::deriver::derive;
use crate::entities::{animal, health_alert, video_analysis};
use crate::error::ApiError;
use crate::health::{AnalysisStatus, HealthStatus};
use crate::locks::AnimalLocks;
use crate::notify::{ChangeBroadcaster, ChangeEvent};

#[derive(Debug, Serialize)]
pub struct AnalysisOutcome {
    pub analysis_id: Uuid,
    pub animal_id: Uuid,
    #[serde(flatten)]
    pub report: AnalysisReport,
    pub alerts_created: usize,
    pub new_status: HealthStatus,
}

/// Runs one analysis to completion: analyze the stored video, derive
/// alerts and the status transition, persist both in a single transaction,
/// then notify subscribers. Invoked exactly once per analysis row; the row
/// must still be pending or processing.
pub async fn run_analysis(
    db: &DatabaseConnection,
    analyzer: &dyn VideoAnalyzer,
    locks: &AnimalLocks,
    broadcaster: &ChangeBroadcaster,
    analysis_id: Uuid,
) -> Result<AnalysisOutcome, ApiError> {
    let analysis = video_analysis::Entity::find_by_id(analysis_id)
        .one(db)
        .await?
        .ok_or(ApiError::NotFound("Analysis"))?;

    match analysis.analysis_status.as_str() {
        "pending" | "processing" => {}
        other => {
            return Err(ApiError::Validation(format!(
                "analysis already finalized as '{other}'"
            )))
        }
    }

    let animal = animal::Entity::find_by_id(analysis.animal_id)
        .one(db)
        .await?
        .ok_or(ApiError::NotFound("Animal"))?;

    if analysis.analysis_status == AnalysisStatus::Pending.as_str() {
        let mut active = analysis.clone().into_active_model();
        active.analysis_status = Set(AnalysisStatus::Processing.as_str().to_string());
        active.update(db).await?;
        broadcaster
            .publish("video_analyses", ChangeEvent::Update, analysis_id)
            .await;
    }

    let started = std::time::Instant::now();
    let video_url = analysis.video_url.clone();

    let report = match analyzer.analyze(&video_url).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(%analysis_id, "analysis failed: {}", e);
            mark_failed(db, &analysis).await?;
            broadcaster
                .publish("video_analyses", ChangeEvent::Update, analysis_id)
                .await;
            metrics::counter!("herdwatch_analyses_failed_total").increment(1);
            return Err(ApiError::Analyzer(e));
        }
    };

    let now = Utc::now();
    let derivation = derive(&report, animal.id, Some(&video_url), now);

    // Hold the animal's write lock across the whole transaction so two
    // concurrent analyses cannot interleave their status updates.
    let _guard = locks.acquire(animal.id).await;

    let behaviors_json = serde_json::to_value(&report.behaviors)
        .map_err(|e| ApiError::Internal(format!("failed to encode behaviors: {e}")))?;

    let alert_ids: Vec<Uuid> = derivation.alerts.iter().map(|_| Uuid::new_v4()).collect();

    let txn = db.begin().await?;

    let mut active_analysis = analysis.into_active_model();
    active_analysis.analysis_status = Set(AnalysisStatus::Completed.as_str().to_string());
    active_analysis.behaviors_detected = Set(behaviors_json);
    active_analysis.anomalies_found = Set(report.anomalies.len() as i32);
    active_analysis.duration_seconds = Set(report.duration_seconds);
    active_analysis.processed_at = Set(Some(now.into()));
    active_analysis.update(&txn).await?;

    if !derivation.alerts.is_empty() {
        let rows: Vec<health_alert::ActiveModel> = derivation
            .alerts
            .iter()
            .zip(&alert_ids)
            .map(|(alert, id)| health_alert::ActiveModel {
                id: Set(*id),
                animal_id: Set(alert.animal_id),
                alert_type: Set(alert.alert_type.as_str().to_string()),
                severity: Set(alert.severity.as_str().to_string()),
                description: Set(alert.description.clone()),
                confidence_score: Set(alert.confidence_score),
                video_url: Set(alert.video_url.clone()),
                detected_at: Set(alert.detected_at.into()),
                resolved: Set(false),
                resolved_at: Set(None),
                notes: Set(None),
                created_at: Set(now.into()),
            })
            .collect();
        health_alert::Entity::insert_many(rows).exec(&txn).await?;
    }

    let animal_id = animal.id;
    let mut active_animal = animal.into_active_model();
    active_animal.health_status = Set(derivation.new_status.as_str().to_string());
    active_animal.last_checked = Set(derivation.last_checked.into());
    active_animal.update(&txn).await?;

    txn.commit().await?;
    drop(_guard);

    metrics::counter!("herdwatch_analyses_completed_total").increment(1);
    for alert in &derivation.alerts {
        metrics::counter!(
            "herdwatch_alerts_raised_total",
            "severity" => alert.severity.as_str()
        )
        .increment(1);
    }
    metrics::histogram!("herdwatch_analysis_duration_seconds")
        .record(started.elapsed().as_secs_f64());

    broadcaster
        .publish("video_analyses", ChangeEvent::Update, analysis_id)
        .await;
    for alert_id in &alert_ids {
        broadcaster
            .publish("health_alerts", ChangeEvent::Insert, *alert_id)
            .await;
    }
    broadcaster
        .publish("animals", ChangeEvent::Update, animal_id)
        .await;

    tracing::info!(
        %analysis_id,
        %animal_id,
        alerts = derivation.alerts.len(),
        new_status = derivation.new_status.as_str(),
        "analysis completed"
    );

    Ok(AnalysisOutcome {
        analysis_id,
        animal_id,
        report,
        alerts_created: derivation.alerts.len(),
        new_status: derivation.new_status,
    })
}

async fn mark_failed(
    db: &DatabaseConnection,
    analysis: &video_analysis::Model,
) -> Result<(), ApiError> {
    let mut active = analysis.clone().into_active_model();
    active.analysis_status = Set(AnalysisStatus::Failed.as_str().to_string());
    active.update(db).await?;
    Ok(())
}
