use std::collections::HashMap;

use uuid::Uuid;

use crate::entities::{animal, health_alert};
use crate::error::ApiError;
use crate::health::{HealthStatus, Species};

/// List filters. `None` (or the literal `all` in query form) matches
/// everything; both filters combine with logical AND.
#[derive(Copy, Clone, Debug, Default)]
pub struct AnimalFilter {
    pub species: Option<Species>,
    pub status: Option<HealthStatus>,
}

impl AnimalFilter {
    pub fn from_params(
        species: Option<&str>,
        status: Option<&str>,
    ) -> Result<Self, ApiError> {
        let species = match species {
            None | Some("all") => None,
            Some(s) => Some(
                Species::parse(s)
                    .ok_or_else(|| ApiError::Validation(format!("unknown species '{s}'")))?,
            ),
        };
        let status = match status {
            None | Some("all") => None,
            Some(s) => Some(
                HealthStatus::parse(s)
                    .ok_or_else(|| ApiError::Validation(format!("unknown health status '{s}'")))?,
            ),
        };
        Ok(Self { species, status })
    }
}

/// Applies the filter in place, preserving the incoming order.
pub fn filter_animals(animals: Vec<animal::Model>, filter: AnimalFilter) -> Vec<animal::Model> {
    animals
        .into_iter()
        .filter(|a| {
            let species_match = filter
                .species
                .map_or(true, |s| a.species == s.as_str());
            let status_match = filter
                .status
                .map_or(true, |s| a.health_status == s.as_str());
            species_match && status_match
        })
        .collect()
}

/// Unresolved alert count per animal id.
pub fn unresolved_counts(alerts: &[health_alert::Model]) -> HashMap<Uuid, u64> {
    let mut counts = HashMap::new();
    for alert in alerts.iter().filter(|a| !a.resolved) {
        *counts.entry(alert.animal_id).or_insert(0) += 1;
    }
    counts
}

/// Share of healthy animals as a whole percentage; 0 for an empty herd.
pub fn health_rate(healthy: u64, total: u64) -> i32 {
    if total == 0 {
        return 0;
    }
    ((healthy as f64 / total as f64) * 100.0).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn animal(species: Species, status: HealthStatus) -> animal::Model {
        let now = Utc::now().fixed_offset();
        animal::Model {
            id: Uuid::new_v4(),
            name: "Bella".to_string(),
            species: species.as_str().to_string(),
            pen_location: "Pen 4".to_string(),
            age_months: 30,
            weight_kg: 540.0,
            health_status: status.as_str().to_string(),
            last_checked: now,
            created_at: now,
        }
    }

    fn alert(animal_id: Uuid, resolved: bool) -> health_alert::Model {
        let now = Utc::now().fixed_offset();
        health_alert::Model {
            id: Uuid::new_v4(),
            animal_id,
            alert_type: "lethargy".to_string(),
            severity: "low".to_string(),
            description: "Reduced movement detected".to_string(),
            confidence_score: 82,
            video_url: None,
            detected_at: now,
            resolved,
            resolved_at: resolved.then_some(now),
            notes: None,
            created_at: now,
        }
    }

    #[test]
    fn all_all_returns_the_full_set_in_order() {
        let herd = vec![
            animal(Species::Cow, HealthStatus::Healthy),
            animal(Species::Pig, HealthStatus::Sick),
            animal(Species::Chicken, HealthStatus::Monitoring),
        ];
        let ids: Vec<_> = herd.iter().map(|a| a.id).collect();
        let filter = AnimalFilter::from_params(Some("all"), Some("all")).unwrap();
        let filtered = filter_animals(herd, filter);
        let filtered_ids: Vec<_> = filtered.iter().map(|a| a.id).collect();
        assert_eq!(filtered_ids, ids);
    }

    #[test]
    fn filters_combine_with_and() {
        let herd = vec![
            animal(Species::Cow, HealthStatus::Healthy),
            animal(Species::Cow, HealthStatus::Sick),
            animal(Species::Pig, HealthStatus::Sick),
        ];
        let filter = AnimalFilter::from_params(Some("cow"), Some("sick")).unwrap();
        let filtered = filter_animals(herd, filter);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].species, "cow");
        assert_eq!(filtered[0].health_status, "sick");
    }

    #[test]
    fn unknown_filter_values_are_rejected() {
        assert!(AnimalFilter::from_params(Some("goat"), None).is_err());
        assert!(AnimalFilter::from_params(None, Some("resting")).is_err());
    }

    #[test]
    fn unresolved_counts_skip_resolved_alerts() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let alerts = vec![alert(a, false), alert(a, true), alert(a, false), alert(b, true)];
        let counts = unresolved_counts(&alerts);
        assert_eq!(counts.get(&a), Some(&2));
        assert_eq!(counts.get(&b), None);
    }

    #[test]
    fn health_rate_is_zero_for_an_empty_herd() {
        assert_eq!(health_rate(0, 0), 0);
    }

    #[test]
    fn health_rate_rounds_to_whole_percent() {
        assert_eq!(health_rate(3, 4), 75);
        assert_eq!(health_rate(1, 3), 33);
        assert_eq!(health_rate(2, 3), 67);
        assert_eq!(health_rate(5, 5), 100);
    }
}
