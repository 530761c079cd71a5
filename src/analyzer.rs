use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::health::{AlertType, Severity};

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("failed to decode video: {0}")]
    Decode(String),
    #[error("analysis timed out after {0:?}")]
    Timeout(Duration),
    #[error("analyzer unavailable: {0}")]
    Unavailable(String),
}

/// One behavior segment recognized in the footage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectedBehavior {
    pub behavior: String,
    pub duration_seconds: i32,
    pub normal: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub kind: String,
    pub timestamp_seconds: i32,
    pub confidence: f64,
}

/// A suspected health problem. The deriver turns each of these into one
/// alert row; confidence is a 0-100 score, rounded at derivation time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthIssue {
    pub alert_type: AlertType,
    pub severity: Severity,
    pub description: String,
    pub confidence: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub behaviors: Vec<DetectedBehavior>,
    pub anomalies: Vec<Anomaly>,
    pub health_issues: Vec<HealthIssue>,
    pub duration_seconds: i32,
}

/// Contract between the analysis workflow and whatever produces behavior
/// reports from video. Implementations read the video and report on it;
/// they never touch animal or alert state, which belongs to the deriver.
#[async_trait]
pub trait VideoAnalyzer: Send + Sync {
    async fn analyze(&self, video_url: &str) -> Result<AnalysisReport, AnalyzerError>;
}

const POSTURE_GATE: f64 = 0.6;
const LETHARGY_GATE: f64 = 0.7;
const POSTURE_HIGH_THRESHOLD: f64 = 0.85;
const LETHARGY_HIGH_THRESHOLD: f64 = 0.9;

/// Fixture generator standing in for a real model. One uniform draw gates
/// both synthetic issue classes; severities and confidences come from that
/// same draw, not from any property of the footage.
pub struct StubAnalyzer {
    rng: Mutex<StdRng>,
    delay: Duration,
}

impl StubAnalyzer {
    pub fn new(delay: Duration) -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            delay,
        }
    }

    /// Deterministic variant for tests.
    pub fn with_seed(seed: u64, delay: Duration) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            delay,
        }
    }

    pub fn from_env() -> Self {
        let delay_ms = std::env::var("STUB_ANALYZER_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(2000);
        Self::new(Duration::from_millis(delay_ms))
    }
}

#[async_trait]
impl VideoAnalyzer for StubAnalyzer {
    async fn analyze(&self, _video_url: &str) -> Result<AnalysisReport, AnalyzerError> {
        // Stand in for inference latency
        tokio::time::sleep(self.delay).await;

        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let draw = rng.gen::<f64>();
        Ok(fabricate_report(draw, &mut *rng))
    }
}

/// Builds the stub report for a primary draw in [0,1). Split out from the
/// trait impl so tests can force either probability gate.
pub fn fabricate_report<R: Rng>(draw: f64, rng: &mut R) -> AnalysisReport {
    let behaviors = vec![
        DetectedBehavior {
            behavior: "standing".to_string(),
            duration_seconds: 45,
            normal: true,
        },
        DetectedBehavior {
            behavior: "lying_down".to_string(),
            duration_seconds: 120,
            normal: true,
        },
        DetectedBehavior {
            behavior: "eating".to_string(),
            duration_seconds: 30,
            normal: true,
        },
        DetectedBehavior {
            behavior: "walking".to_string(),
            duration_seconds: 25,
            normal: true,
        },
    ];

    let mut anomalies = Vec::new();
    let mut health_issues = Vec::new();

    if draw > POSTURE_GATE {
        anomalies.push(Anomaly {
            kind: "abnormal_posture".to_string(),
            timestamp_seconds: 8,
            confidence: 0.78,
        });
        health_issues.push(HealthIssue {
            alert_type: AlertType::PostureChange,
            severity: if draw > POSTURE_HIGH_THRESHOLD {
                Severity::High
            } else {
                Severity::Medium
            },
            description: "Animal showing abnormal posture, possibly indicating discomfort or pain"
                .to_string(),
            confidence: 78.0 + rng.gen_range(0.0..15.0),
        });
    }

    if draw > LETHARGY_GATE {
        anomalies.push(Anomaly {
            kind: "reduced_movement".to_string(),
            timestamp_seconds: 12,
            confidence: 0.82,
        });
        health_issues.push(HealthIssue {
            alert_type: AlertType::Lethargy,
            severity: if draw > LETHARGY_HIGH_THRESHOLD {
                Severity::High
            } else {
                Severity::Low
            },
            description: "Reduced movement detected, animal may be lethargic or fatigued"
                .to_string(),
            confidence: 82.0 + rng.gen_range(0.0..12.0),
        });
    }

    AnalysisReport {
        behaviors,
        anomalies,
        health_issues,
        duration_seconds: 180 + rng.gen_range(0..120),
    }
}

/// Drop-in replacement that defers to an external analysis service
/// implementing the same report contract over HTTP.
pub struct RemoteAnalyzer {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct RemoteAnalysisResponse {
    success: bool,
    analysis: Option<AnalysisReport>,
    error: Option<String>,
}

impl RemoteAnalyzer {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl VideoAnalyzer for RemoteAnalyzer {
    async fn analyze(&self, video_url: &str) -> Result<AnalysisReport, AnalyzerError> {
        let res = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "video_url": video_url }))
            .send()
            .await
            .map_err(|e| AnalyzerError::Unavailable(e.to_string()))?;

        if !res.status().is_success() {
            return Err(AnalyzerError::Unavailable(format!(
                "analysis service returned {}",
                res.status()
            )));
        }

        let body: RemoteAnalysisResponse = res
            .json()
            .await
            .map_err(|e| AnalyzerError::Decode(e.to_string()))?;

        if !body.success {
            return Err(AnalyzerError::Decode(
                body.error.unwrap_or_else(|| "analysis failed".to_string()),
            ));
        }

        body.analysis
            .ok_or_else(|| AnalyzerError::Decode("response carried no analysis".to_string()))
    }
}

// The stub fabricates severities and confidences from a random draw; none
// of the assertions below reflect genuine signal in any video.
#[cfg(test)]
mod tests {
    use super::*;

    fn test_rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn quiet_draw_reports_no_issues() {
        let report = fabricate_report(0.5, &mut test_rng());
        assert!(report.health_issues.is_empty());
        assert!(report.anomalies.is_empty());
        assert_eq!(report.behaviors.len(), 4);
        assert!(report.behaviors.iter().all(|b| b.normal));
    }

    #[test]
    fn posture_gate_opens_above_point_six() {
        let report = fabricate_report(0.65, &mut test_rng());
        assert_eq!(report.health_issues.len(), 1);
        let issue = &report.health_issues[0];
        assert_eq!(issue.alert_type, AlertType::PostureChange);
        assert_eq!(issue.severity, Severity::Medium);
        assert!(issue.confidence >= 78.0 && issue.confidence < 93.0);
        assert_eq!(report.anomalies[0].kind, "abnormal_posture");
    }

    #[test]
    fn both_gates_open_above_point_seven() {
        let report = fabricate_report(0.75, &mut test_rng());
        let types: Vec<_> = report
            .health_issues
            .iter()
            .map(|i| i.alert_type)
            .collect();
        assert_eq!(types, vec![AlertType::PostureChange, AlertType::Lethargy]);
        // Below both secondary thresholds
        assert_eq!(report.health_issues[0].severity, Severity::Medium);
        assert_eq!(report.health_issues[1].severity, Severity::Low);
        let lethargy = &report.health_issues[1];
        assert!(lethargy.confidence >= 82.0 && lethargy.confidence < 94.0);
    }

    #[test]
    fn secondary_thresholds_escalate_severity() {
        let report = fabricate_report(0.87, &mut test_rng());
        assert_eq!(report.health_issues[0].severity, Severity::High);
        assert_eq!(report.health_issues[1].severity, Severity::Low);

        let report = fabricate_report(0.95, &mut test_rng());
        assert_eq!(report.health_issues[0].severity, Severity::High);
        assert_eq!(report.health_issues[1].severity, Severity::High);
    }

    #[test]
    fn duration_stays_in_the_fixture_window() {
        for draw in [0.1, 0.65, 0.95] {
            let report = fabricate_report(draw, &mut test_rng());
            assert!(report.duration_seconds >= 180 && report.duration_seconds < 300);
        }
    }

    #[tokio::test]
    async fn seeded_stub_is_deterministic() {
        let a = StubAnalyzer::with_seed(7, Duration::ZERO);
        let b = StubAnalyzer::with_seed(7, Duration::ZERO);
        let ra = a.analyze("gs://bucket/a.mp4").await.unwrap();
        let rb = b.analyze("gs://bucket/a.mp4").await.unwrap();
        assert_eq!(ra, rb);
    }
}
