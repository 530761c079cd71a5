use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::analyzer::AnalysisReport;
use crate::health::{AlertType, HealthStatus, Severity};

/// Alert row content before it gets an id and is persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct NewAlert {
    pub animal_id: Uuid,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub description: String,
    pub confidence_score: i32,
    pub video_url: Option<String>,
    pub detected_at: DateTime<Utc>,
    pub resolved: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Derivation {
    pub alerts: Vec<NewAlert>,
    pub new_status: HealthStatus,
    /// Written to the animal in every branch, issues or not.
    pub last_checked: DateTime<Utc>,
}

/// Maps a completed analysis report onto alert rows and the animal's next
/// health status.
///
/// No issues means the animal is declared healthy. Otherwise every issue
/// becomes one unresolved alert, and the animal goes to `sick` when any
/// issue is high or critical severity, `monitoring` when none is.
pub fn derive(
    report: &AnalysisReport,
    animal_id: Uuid,
    video_url: Option<&str>,
    now: DateTime<Utc>,
) -> Derivation {
    if report.health_issues.is_empty() {
        return Derivation {
            alerts: Vec::new(),
            new_status: HealthStatus::Healthy,
            last_checked: now,
        };
    }

    let alerts = report
        .health_issues
        .iter()
        .map(|issue| NewAlert {
            animal_id,
            alert_type: issue.alert_type,
            severity: issue.severity,
            description: issue.description.clone(),
            confidence_score: issue.confidence.round() as i32,
            video_url: video_url.map(str::to_string),
            detected_at: now,
            resolved: false,
        })
        .collect();

    let new_status = if report.health_issues.iter().any(|i| i.severity.is_escalating()) {
        HealthStatus::Sick
    } else {
        HealthStatus::Monitoring
    };

    Derivation {
        alerts,
        new_status,
        last_checked: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::HealthIssue;

    fn report_with(issues: Vec<HealthIssue>) -> AnalysisReport {
        AnalysisReport {
            behaviors: Vec::new(),
            anomalies: Vec::new(),
            health_issues: issues,
            duration_seconds: 180,
        }
    }

    fn issue(severity: Severity, confidence: f64) -> HealthIssue {
        HealthIssue {
            alert_type: AlertType::Lethargy,
            severity,
            description: "Reduced movement detected".to_string(),
            confidence,
        }
    }

    #[test]
    fn empty_report_means_healthy_and_no_alerts() {
        let now = Utc::now();
        let d = derive(&report_with(vec![]), Uuid::new_v4(), None, now);
        assert!(d.alerts.is_empty());
        assert_eq!(d.new_status, HealthStatus::Healthy);
        assert_eq!(d.last_checked, now);
    }

    #[test]
    fn low_and_medium_issues_put_the_animal_on_monitoring() {
        let d = derive(
            &report_with(vec![issue(Severity::Low, 82.0), issue(Severity::Medium, 78.0)]),
            Uuid::new_v4(),
            None,
            Utc::now(),
        );
        assert_eq!(d.alerts.len(), 2);
        assert_eq!(d.new_status, HealthStatus::Monitoring);
    }

    #[test]
    fn any_high_issue_makes_the_animal_sick() {
        let d = derive(
            &report_with(vec![issue(Severity::Low, 82.0), issue(Severity::High, 90.0)]),
            Uuid::new_v4(),
            None,
            Utc::now(),
        );
        assert_eq!(d.new_status, HealthStatus::Sick);
    }

    #[test]
    fn critical_issue_also_makes_the_animal_sick() {
        let d = derive(
            &report_with(vec![issue(Severity::Critical, 95.0)]),
            Uuid::new_v4(),
            None,
            Utc::now(),
        );
        assert_eq!(d.new_status, HealthStatus::Sick);
    }

    #[test]
    fn alerts_copy_issue_fields_verbatim_and_start_unresolved() {
        let animal_id = Uuid::new_v4();
        let now = Utc::now();
        let d = derive(
            &report_with(vec![issue(Severity::Medium, 78.4)]),
            animal_id,
            Some("https://storage.googleapis.com/herd/pen4.mp4"),
            now,
        );
        let alert = &d.alerts[0];
        assert_eq!(alert.animal_id, animal_id);
        assert_eq!(alert.alert_type, AlertType::Lethargy);
        assert_eq!(alert.description, "Reduced movement detected");
        assert_eq!(alert.detected_at, now);
        assert!(!alert.resolved);
        assert_eq!(
            alert.video_url.as_deref(),
            Some("https://storage.googleapis.com/herd/pen4.mp4")
        );
    }

    #[test]
    fn confidence_rounds_to_nearest_integer() {
        let d = derive(
            &report_with(vec![issue(Severity::Low, 82.5), issue(Severity::Low, 78.4)]),
            Uuid::new_v4(),
            None,
            Utc::now(),
        );
        assert_eq!(d.alerts[0].confidence_score, 83);
        assert_eq!(d.alerts[1].confidence_score, 78);
    }

    #[test]
    fn last_checked_advances_in_every_branch() {
        let now = Utc::now();
        let healthy = derive(&report_with(vec![]), Uuid::new_v4(), None, now);
        let sick = derive(
            &report_with(vec![issue(Severity::High, 90.0)]),
            Uuid::new_v4(),
            None,
            now,
        );
        assert_eq!(healthy.last_checked, now);
        assert_eq!(sick.last_checked, now);
    }
}
