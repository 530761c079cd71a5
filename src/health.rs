use serde::{Deserialize, Serialize};

/// Animal species tracked by the herd. Stored as lowercase strings in the
/// `animals.species` column.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Cow,
    Pig,
    Chicken,
}

impl Species {
    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Cow => "cow",
            Species::Pig => "pig",
            Species::Chicken => "chicken",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cow" => Some(Species::Cow),
            "pig" => Some(Species::Pig),
            "chicken" => Some(Species::Chicken),
            _ => None,
        }
    }

    pub const ALL: [Species; 3] = [Species::Cow, Species::Pig, Species::Chicken];
}

/// An animal is always in exactly one of these states. The status is only
/// ever written by the analysis workflow or a direct user edit, never
/// recomputed on read.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Monitoring,
    Sick,
    Critical,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Monitoring => "monitoring",
            HealthStatus::Sick => "sick",
            HealthStatus::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "healthy" => Some(HealthStatus::Healthy),
            "monitoring" => Some(HealthStatus::Monitoring),
            "sick" => Some(HealthStatus::Sick),
            "critical" => Some(HealthStatus::Critical),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    PostureChange,
    Lethargy,
    Coughing,
    PeckingPattern,
    AbnormalMovement,
    Other,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::PostureChange => "posture_change",
            AlertType::Lethargy => "lethargy",
            AlertType::Coughing => "coughing",
            AlertType::PeckingPattern => "pecking_pattern",
            AlertType::AbnormalMovement => "abnormal_movement",
            AlertType::Other => "other",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// High and critical issues force the animal into `sick`.
    pub fn is_escalating(&self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }
}

/// Lifecycle of a video analysis. A row is created `processing` at upload
/// and transitions exactly once to `completed` or `failed`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn species_round_trips_through_column_form() {
        for species in Species::ALL {
            assert_eq!(Species::parse(species.as_str()), Some(species));
        }
        assert_eq!(Species::parse("goat"), None);
    }

    #[test]
    fn health_status_rejects_unknown_values() {
        assert_eq!(HealthStatus::parse("sick"), Some(HealthStatus::Sick));
        assert_eq!(HealthStatus::parse("quarantined"), None);
    }

    #[test]
    fn only_high_and_critical_escalate() {
        assert!(!Severity::Low.is_escalating());
        assert!(!Severity::Medium.is_escalating());
        assert!(Severity::High.is_escalating());
        assert!(Severity::Critical.is_escalating());
    }
}
