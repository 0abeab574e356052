//! Saved what-if scenarios for a session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{Channel, ScenarioEstimate, SpendAllocation};
use uuid::Uuid;

use super::projection::{self, Projection};
use crate::error::{PlannerError, PlannerResult};

/// Name of the seeded baseline scenario, which cannot be removed
pub const CURRENT_SCENARIO: &str = "Current";

/// Immutable snapshot of an allocation and its projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedScenario {
    pub id: Uuid,
    pub name: String,
    pub allocation: SpendAllocation,
    pub total_spend: f64,
    pub projected_sales: f64,
    pub roi: f64,
    /// The Model Service's own estimate, when it was reachable
    pub service_estimate: Option<ScenarioEstimate>,
    pub created_at: DateTime<Utc>,
}

impl SavedScenario {
    fn new(name: String, allocation: SpendAllocation, projection: &Projection, estimate: Option<&ScenarioEstimate>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            allocation,
            total_spend: projection.total_spend,
            projected_sales: projection.total_sales,
            roi: projection.roi,
            service_estimate: estimate.cloned(),
            created_at: Utc::now(),
        }
    }

    pub fn is_current(&self) -> bool {
        self.name == CURRENT_SCENARIO
    }
}

/// One row of the side-by-side scenario comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparisonRow {
    pub name: String,
    pub total_spend: f64,
    pub projected_sales: f64,
    pub roi: f64,
    pub spend_by_channel: SpendAllocation,
}

#[derive(Debug, Clone, Default)]
pub struct ScenarioBook {
    scenarios: Vec<SavedScenario>,
}

impl ScenarioBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start over with only the historical baseline
    pub fn seed_current(&mut self, channels: &[Channel]) {
        let allocation = SpendAllocation::historical(channels);
        let projection = projection::project(channels, &allocation);
        self.scenarios = vec![SavedScenario::new(
            CURRENT_SCENARIO.to_string(),
            allocation,
            &projection,
            None,
        )];
    }

    pub fn clear(&mut self) {
        self.scenarios.clear();
    }

    /// Trimmed scenario name, rejecting blanks and duplicates
    pub fn validate_name(&self, name: &str) -> PlannerResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlannerError::validation("name", "scenario name cannot be empty"));
        }
        if self.get(name).is_some() {
            return Err(PlannerError::validation(
                "name",
                format!("a scenario named '{name}' already exists"),
            ));
        }
        Ok(name.to_string())
    }

    pub fn save(
        &mut self,
        name: &str,
        allocation: SpendAllocation,
        projection: &Projection,
        estimate: Option<&ScenarioEstimate>,
    ) -> PlannerResult<&SavedScenario> {
        let name = self.validate_name(name)?;
        self.scenarios
            .push(SavedScenario::new(name, allocation, projection, estimate));
        Ok(&self.scenarios[self.scenarios.len() - 1])
    }

    pub fn remove(&mut self, name: &str) -> PlannerResult<SavedScenario> {
        if name.trim() == CURRENT_SCENARIO {
            return Err(PlannerError::validation("name", "the Current scenario cannot be removed"));
        }
        let index = self
            .scenarios
            .iter()
            .position(|s| s.name == name.trim())
            .ok_or_else(|| PlannerError::validation("name", format!("no scenario named '{}'", name.trim())))?;
        Ok(self.scenarios.remove(index))
    }

    pub fn get(&self, name: &str) -> Option<&SavedScenario> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SavedScenario> {
        self.scenarios.iter()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn comparison(&self) -> Vec<ScenarioComparisonRow> {
        self.scenarios
            .iter()
            .map(|s| ScenarioComparisonRow {
                name: s.name.clone(),
                total_spend: s.total_spend,
                projected_sales: s.projected_sales,
                roi: s.roi,
                spend_by_channel: s.allocation.clone(),
            })
            .collect()
    }

    /// `"Scenario N"`, numbered after the scenarios already saved
    pub fn next_default_name(&self) -> String {
        let mut n = self.scenarios.len().max(1);
        loop {
            let candidate = format!("Scenario {n}");
            if self.get(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Elasticity;

    fn channels() -> Vec<Channel> {
        vec![
            Channel::new("TV", 1_000.0, 400.0, Some(Elasticity::point(0.2))),
            Channel::new("Search", 500.0, 600.0, Some(Elasticity::point(0.4))),
        ]
    }

    fn seeded() -> ScenarioBook {
        let mut book = ScenarioBook::new();
        book.seed_current(&channels());
        book
    }

    #[test]
    fn test_seeded_current_matches_history() {
        let book = seeded();
        let current = book.get(CURRENT_SCENARIO).unwrap();
        assert!(current.is_current());
        assert_eq!(current.total_spend, 1_500.0);
        assert!((current.projected_sales - 1_000.0).abs() < 1e-9);
        assert_eq!(current.service_estimate, None);
    }

    #[test]
    fn test_save_rejects_blank_and_duplicate_names() {
        let mut book = seeded();
        let allocation = SpendAllocation::new().with("TV", 1_200.0);
        let projection = projection::project(&channels(), &allocation);

        assert!(book.save("   ", allocation.clone(), &projection, None).unwrap_err().is_validation());
        assert!(book.save("Current", allocation.clone(), &projection, None).unwrap_err().is_validation());

        let estimate = ScenarioEstimate { total_spend: 1_700.0, projected_sales: 1_050.0, roi: 0.6 };
        let saved = book.save(" More TV ", allocation.clone(), &projection, Some(&estimate)).unwrap();
        assert_eq!(saved.name, "More TV");
        assert_eq!(saved.service_estimate, Some(estimate));

        assert!(book.save("More TV", allocation, &projection, None).unwrap_err().is_validation());
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn test_current_cannot_be_removed() {
        let mut book = seeded();
        assert!(book.remove(CURRENT_SCENARIO).unwrap_err().is_validation());
        assert!(book.remove("missing").unwrap_err().is_validation());

        let projection = projection::project(&channels(), &SpendAllocation::new());
        book.save("Flat", SpendAllocation::new(), &projection, None).unwrap();
        let removed = book.remove("Flat").unwrap();
        assert_eq!(removed.name, "Flat");
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_next_default_name() {
        let mut book = seeded();
        assert_eq!(book.next_default_name(), "Scenario 1");

        let projection = projection::project(&channels(), &SpendAllocation::new());
        book.save("Scenario 2", SpendAllocation::new(), &projection, None).unwrap();
        // two scenarios saved, "Scenario 2" taken
        assert_eq!(book.next_default_name(), "Scenario 3");
        assert_eq!(ScenarioBook::new().next_default_name(), "Scenario 1");
    }

    #[test]
    fn test_comparison_rows_follow_save_order() {
        let mut book = seeded();
        let allocation = SpendAllocation::new().with("TV", 0.0);
        let projection = projection::project(&channels(), &allocation);
        book.save("No TV", allocation, &projection, None).unwrap();

        let rows = book.comparison();
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Current", "No TV"]);
        assert_eq!(rows[1].total_spend, 500.0);
    }
}
