//! Test fixtures for planner tests
//!
//! Two channels with known history so projections can be checked by hand:
//! TV spent 1,000,000 for 400,000 contribution at elasticity 0.2, Search
//! spent 500,000 for 300,000 at 0.3.

use serde_json::json;
use shared::{
    ChannelId, ColumnMapping, ExpectedLift, ModelResults, OptimizeResponse, ScenarioEstimate, SpendAllocation,
    TargetResponse,
};
use planner::DatasetSummary;

pub struct TestFixtures;

impl TestFixtures {
    pub const TV: &'static str = "TV";
    pub const SEARCH: &'static str = "Search";

    pub const TV_SPEND: f64 = 1_000_000.0;
    pub const TV_CONTRIBUTION: f64 = 400_000.0;
    pub const SEARCH_SPEND: f64 = 500_000.0;
    pub const SEARCH_CONTRIBUTION: f64 = 300_000.0;

    pub const HISTORICAL_TOTAL: f64 = Self::TV_SPEND + Self::SEARCH_SPEND;
    pub const HISTORICAL_SALES: f64 = Self::TV_CONTRIBUTION + Self::SEARCH_CONTRIBUTION;

    pub fn tv() -> ChannelId {
        ChannelId::from(Self::TV)
    }

    pub fn search() -> ChannelId {
        ChannelId::from(Self::SEARCH)
    }

    /// Results artifact as the Model Service returns it
    pub fn results_json() -> serde_json::Value {
        json!({
            "r_squared": 0.91,
            "mape": 6.4,
            "elasticities": {
                "TV": { "mean": 0.2, "ci_lower": 0.12, "ci_upper": 0.28 },
                "Search": { "mean": 0.3, "ci_lower": 0.2, "ci_upper": 0.4 }
            },
            "roi": [
                { "channel": "TV", "spend": 1000000.0, "contribution": 400000.0, "roi": 0.4 },
                { "channel": "Search", "spend": 500000.0, "contribution": 300000.0, "roi": 0.6 }
            ]
        })
    }

    pub fn results() -> ModelResults {
        serde_json::from_value(Self::results_json()).unwrap()
    }

    pub fn dataset() -> DatasetSummary {
        DatasetSummary::new(
            "weekly_sales.csv",
            vec![
                "week".to_string(),
                "revenue".to_string(),
                "TV".to_string(),
                "Search".to_string(),
                "price_index".to_string(),
            ],
            104,
        )
    }

    pub fn mapping() -> ColumnMapping {
        ColumnMapping {
            date_col: "week".to_string(),
            target_col: "revenue".to_string(),
            media_cols: vec!["TV".to_string(), "Search".to_string()],
            control_cols: vec!["price_index".to_string()],
        }
    }

    /// Solver shifts 300,000 from TV into Search at the historical total
    pub fn optimize_response() -> OptimizeResponse {
        OptimizeResponse {
            optimal_spend: SpendAllocation::new().with(Self::TV, 700_000.0).with(Self::SEARCH, 800_000.0),
            current_spend: SpendAllocation::new().with(Self::TV, Self::TV_SPEND).with(Self::SEARCH, Self::SEARCH_SPEND),
            expected_lift: ExpectedLift {
                current_sales: Self::HISTORICAL_SALES,
                expected_sales: 756_000.0,
                lift: 56_000.0,
                lift_pct: 8.0,
            },
        }
    }

    /// Same shape as `optimize_response` with a different split
    pub fn alternative_optimize_response() -> OptimizeResponse {
        OptimizeResponse {
            optimal_spend: SpendAllocation::new().with(Self::TV, 900_000.0).with(Self::SEARCH, 600_000.0),
            ..Self::optimize_response()
        }
    }

    pub fn achievable_target() -> TargetResponse {
        TargetResponse {
            achievable: true,
            required_budget: 1_800_000.0,
            projected_sales: 800_000.0,
            budget_change_pct: 20.0,
            optimal_allocation: SpendAllocation::new().with(Self::TV, 900_000.0).with(Self::SEARCH, 900_000.0),
            message: String::new(),
        }
    }

    pub fn unachievable_target() -> TargetResponse {
        TargetResponse {
            achievable: false,
            required_budget: 0.0,
            projected_sales: 0.0,
            budget_change_pct: 0.0,
            optimal_allocation: SpendAllocation::new(),
            message: "Target requires more than 3.0x the current budget".to_string(),
        }
    }

    pub fn scenario_estimate() -> ScenarioEstimate {
        ScenarioEstimate {
            total_spend: Self::HISTORICAL_TOTAL,
            projected_sales: 701_500.0,
            roi: 701_500.0 / Self::HISTORICAL_TOTAL,
        }
    }
}
