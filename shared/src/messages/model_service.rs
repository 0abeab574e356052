//! Planner ↔ Model Service messages
//!
//! Field names follow the service's JSON wire format (snake_case). The
//! service owns the optimizer, the goal solver and model training; the
//! planner only depends on these shapes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{SharedError, SharedResult};
use crate::types::{Channel, ChannelId, Elasticity, SpendAllocation};

/// `POST /api/optimize`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OptimizeRequest {
    pub total_budget: f64,
    /// Per-channel `[min_fraction, max_fraction]` of the total budget
    pub constraints: BTreeMap<ChannelId, (f64, f64)>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OptimizeResponse {
    pub optimal_spend: SpendAllocation,
    pub current_spend: SpendAllocation,
    pub expected_lift: ExpectedLift,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ExpectedLift {
    pub current_sales: f64,
    pub expected_sales: f64,
    pub lift: f64,
    pub lift_pct: f64,
}

/// `POST /api/optimize-for-target`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TargetRequest {
    pub target_sales: f64,
    /// Cap on the searched budget, as a multiple of the historical budget
    pub max_budget_multiplier: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TargetResponse {
    pub achievable: bool,
    #[serde(default)]
    pub required_budget: f64,
    #[serde(default)]
    pub projected_sales: f64,
    #[serde(default)]
    pub budget_change_pct: f64,
    #[serde(default)]
    pub optimal_allocation: SpendAllocation,
    #[serde(default)]
    pub message: String,
}

/// `POST /api/scenarios/create`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ScenarioRequest {
    pub name: String,
    pub spend_allocation: SpendAllocation,
}

/// The service's own estimate for a scenario
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ScenarioEstimate {
    pub total_spend: f64,
    pub projected_sales: f64,
    #[serde(default)]
    pub roi: f64,
}

/// `POST /api/mapping`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ColumnMapping {
    pub date_col: String,
    pub target_col: String,
    pub media_cols: Vec<String>,
    #[serde(default)]
    pub control_cols: Vec<String>,
}

/// `POST /api/model/config` / `POST /api/model/train`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ModelConfig {
    pub model_type: String,
    pub seasonality_period: u32,
    pub fourier_harmonics: u32,
    pub mcmc_draws: u32,
    pub mcmc_tune: u32,
    pub mcmc_chains: u32,
    pub holdout_weeks: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_type: "loglog".to_string(),
            seasonality_period: 52,
            fourier_harmonics: 3,
            mcmc_draws: 2000,
            mcmc_tune: 1000,
            mcmc_chains: 4,
            holdout_weeks: 0,
        }
    }
}

/// Per-channel row of the ROI table in the results artifact
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChannelRoi {
    pub channel: ChannelId,
    pub spend: f64,
    pub contribution: f64,
    #[serde(default)]
    pub roi: f64,
}

/// `GET /api/model/results`: the artifact produced by the training collaborator
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelResults {
    pub r_squared: f64,
    pub mape: f64,
    pub elasticities: BTreeMap<ChannelId, Elasticity>,
    pub roi: Vec<ChannelRoi>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<serde_json::Value>,
}

impl ModelResults {
    /// Build the immutable channel set the projection engine works on
    ///
    /// Channels follow the ROI table order; channels that only appear in the
    /// elasticity map are appended in sorted order with zero history.
    pub fn channels(&self) -> Vec<Channel> {
        let mut channels: Vec<Channel> = self
            .roi
            .iter()
            .map(|row| {
                Channel::new(
                    row.channel.clone(),
                    row.spend,
                    row.contribution,
                    self.elasticities.get(&row.channel).copied(),
                )
            })
            .collect();

        for (id, elasticity) in &self.elasticities {
            if !self.roi.iter().any(|row| &row.channel == id) {
                channels.push(Channel::new(id.clone(), 0.0, 0.0, Some(*elasticity)));
            }
        }

        channels
    }

    /// Reject artifacts the planner cannot work with
    pub fn validate(&self) -> SharedResult<()> {
        if self.roi.is_empty() && self.elasticities.is_empty() {
            return Err(SharedError::DeserializationError {
                message: "model results contain no channels".to_string(),
            });
        }

        let mut seen = std::collections::BTreeSet::new();
        for row in &self.roi {
            if !seen.insert(&row.channel) {
                return Err(SharedError::InvalidChannel {
                    input: row.channel.to_string(),
                });
            }
        }

        for (channel, elasticity) in &self.elasticities {
            elasticity.validate(channel)?;
        }

        Ok(())
    }
}

/// `GET /api/health`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_results() -> ModelResults {
        serde_json::from_value(json!({
            "r_squared": 0.91,
            "mape": 6.2,
            "elasticities": {
                "TV": { "mean": 0.2, "ci_lower": 0.1, "ci_upper": 0.3 },
                "Search": { "mean": 0.35, "ci_lower": 0.25, "ci_upper": 0.45 },
                "Podcast": { "mean": 0.05, "ci_lower": 0.0, "ci_upper": 0.1 }
            },
            "roi": [
                { "channel": "TV", "spend": 1000000.0, "contribution": 400000.0, "roi": 0.4 },
                { "channel": "Search", "spend": 250000.0, "contribution": 300000.0, "roi": 1.2 }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_results_channel_order_and_fill_in() {
        let channels = sample_results().channels();
        let ids: Vec<&str> = channels.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["TV", "Search", "Podcast"]);

        let podcast = &channels[2];
        assert_eq!(podcast.historical_spend, 0.0);
        assert_eq!(podcast.elasticity_mean(), Some(0.05));
    }

    #[test]
    fn test_results_validation() {
        assert!(sample_results().validate().is_ok());

        let mut duplicated = sample_results();
        duplicated.roi.push(duplicated.roi[0].clone());
        assert!(matches!(duplicated.validate(), Err(SharedError::InvalidChannel { .. })));

        let mut inverted = sample_results();
        inverted
            .elasticities
            .insert("TV".into(), Elasticity { mean: 0.9, ci_lower: 0.1, ci_upper: 0.3 });
        assert!(matches!(
            inverted.validate(),
            Err(SharedError::InconsistentElasticity { .. })
        ));
    }

    #[test]
    fn test_constraints_serialize_as_pairs() {
        let mut constraints = BTreeMap::new();
        constraints.insert(ChannelId::from("TV"), (0.05, 0.8));
        let request = OptimizeRequest { total_budget: 1_000.0, constraints };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, json!({ "total_budget": 1000.0, "constraints": { "TV": [0.05, 0.8] } }));
    }

    #[test]
    fn test_unachievable_target_response_tolerates_missing_fields() {
        let response: TargetResponse = serde_json::from_value(json!({
            "achievable": false,
            "message": "Target exceeds 3.0x budget cap"
        }))
        .unwrap();

        assert!(!response.achievable);
        assert!(response.optimal_allocation.is_empty());
        assert_eq!(response.required_budget, 0.0);
    }

    #[test]
    fn test_health_status() {
        let status: HealthStatus = serde_json::from_value(json!({ "status": "healthy", "version": "1.0.0" })).unwrap();
        assert!(status.is_healthy());
    }
}
