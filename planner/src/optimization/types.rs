//! Optimization result types
//!
//! These are the planner-side records of Model Service answers, kept
//! separate from the wire messages so the session never depends on the
//! transport shape.

use serde::{Deserialize, Serialize};
use shared::{ChannelId, ExpectedLift, OptimizeResponse, SpendAllocation, TargetResponse};
use std::collections::BTreeMap;

/// Authoritative budget-based optimization answer
///
/// Becomes the session's reference baseline until superseded or reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// The solver's view of the current allocation
    pub current_spend: SpendAllocation,
    pub optimal_spend: SpendAllocation,
    pub expected_lift: ExpectedLift,
    pub requested_budget: f64,
    pub constraints_used: BTreeMap<ChannelId, (f64, f64)>,
}

impl OptimizationResult {
    pub fn from_response(
        response: OptimizeResponse,
        requested_budget: f64,
        constraints_used: BTreeMap<ChannelId, (f64, f64)>,
    ) -> Self {
        Self {
            current_spend: response.current_spend,
            optimal_spend: response.optimal_spend,
            expected_lift: response.expected_lift,
            requested_budget,
            constraints_used,
        }
    }
}

/// Goal-based planning answer
///
/// `achievable == false` is a normal outcome; such a plan is never applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalResult {
    pub target_sales: f64,
    pub achievable: bool,
    pub required_budget: f64,
    pub projected_sales: f64,
    pub budget_change_pct: f64,
    pub optimal_allocation: SpendAllocation,
    pub message: String,
}

impl GoalResult {
    pub fn from_response(response: TargetResponse, target_sales: f64) -> Self {
        Self {
            target_sales,
            achievable: response.achievable,
            required_budget: response.required_budget,
            projected_sales: response.projected_sales,
            budget_change_pct: response.budget_change_pct,
            optimal_allocation: response.optimal_allocation,
            message: response.message,
        }
    }

    /// Allocation that may be adopted as the live one, if any
    pub fn appliable_allocation(&self) -> Option<&SpendAllocation> {
        (self.achievable && !self.optimal_allocation.is_empty()).then_some(&self.optimal_allocation)
    }
}

/// Result of an orchestrated call under last-request-wins
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome<T> {
    /// The response belonged to the latest request and was applied
    Applied(T),
    /// A newer request was issued before this one resolved; nothing changed
    Superseded,
}

impl<T> RequestOutcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, RequestOutcome::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            RequestOutcome::Applied(value) => Some(value),
            RequestOutcome::Superseded => None,
        }
    }
}
