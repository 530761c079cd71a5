use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

use crate::entities::{animal, health_alert, user, video_analysis};
use crate::health::Species;

/// Seeds the entity gauges at startup; the handlers keep them current.
pub async fn init_metrics(db: &DatabaseConnection) {
    let user_count = user::Entity::find().count(db).await.unwrap_or(0);
    metrics::gauge!("herdwatch_users_total").set(user_count as f64);

    let animal_count = animal::Entity::find().count(db).await.unwrap_or(0);
    metrics::gauge!("herdwatch_animals_total").set(animal_count as f64);

    let analysis_count = video_analysis::Entity::find().count(db).await.unwrap_or(0);
    metrics::gauge!("herdwatch_analyses_total").set(analysis_count as f64);

    let open_alerts = health_alert::Entity::find()
        .filter(health_alert::Column::Resolved.eq(false))
        .count(db)
        .await
        .unwrap_or(0);
    metrics::gauge!("herdwatch_unresolved_alerts_total").set(open_alerts as f64);

    for species in Species::ALL {
        let count = animal::Entity::find()
            .filter(animal::Column::Species.eq(species.as_str()))
            .count(db)
            .await
            .unwrap_or(0);
        metrics::gauge!("herdwatch_species_animals_total", "species" => species.as_str())
            .set(count as f64);
    }

    tracing::info!(
        "Initialized metrics: Users={}, Animals={}, Analyses={}, OpenAlerts={}",
        user_count,
        animal_count,
        analysis_count,
        open_alerts
    );
}
