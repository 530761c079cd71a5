use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "animals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub species: String,
    pub pen_location: String,
    pub age_months: i32,
    pub weight_kg: f64,
    pub health_status: String,
    pub last_checked: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::health_alert::Entity")]
    HealthAlert,
    #[sea_orm(has_many = "super::video_analysis::Entity")]
    VideoAnalysis,
}

impl Related<super::health_alert::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::HealthAlert.def()
    }
}

impl Related<super::video_analysis::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VideoAnalysis.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
