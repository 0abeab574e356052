//! Optimization orchestrator
//!
//! Sends budget- and goal-based requests to the Model Service and reconciles
//! the answers into the session state. Ordering is last-request-wins by
//! request identity: every request takes a token from a shared ledger and a
//! response is applied only while its token is still the latest one. Budget
//! and goal requests share the ledger, so either kind supersedes the other.
//!
//! Responses are also tied to the state epoch they were requested under.
//! Loading a new dataset, mapping or results bumps the epoch, so an answer
//! about a model that is no longer loaded is discarded the same way.

use shared::{
    component_debug, component_info, component_warn, logging, ComponentId, ModelResults, OptimizeRequest, ScenarioRequest,
    TargetRequest,
};
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{GoalResult, OptimizationResult, RequestOutcome};
use crate::core::scenarios::SavedScenario;
use crate::core::state::{AllocationPreset, PlannerState, SharedState};
use crate::core::workflow::WorkflowStage;
use crate::error::{PlannerError, PlannerResult};
use crate::traits::ModelService;

/// Identity of an issued optimization request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Monotonic source of request tokens
#[derive(Debug, Default)]
pub struct RequestLedger {
    latest: AtomicU64,
}

impl RequestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token that supersedes every earlier one
    pub fn issue(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_latest(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }

    pub fn latest(&self) -> Option<RequestToken> {
        match self.latest.load(Ordering::SeqCst) {
            0 => None,
            n => Some(RequestToken(n)),
        }
    }
}

pub struct OptimizationOrchestrator<S: ModelService> {
    service: S,
    state: SharedState,
    ledger: RequestLedger,
}

impl<S: ModelService> OptimizationOrchestrator<S> {
    pub fn new(service: S, state: SharedState) -> Self {
        Self {
            service,
            state,
            ledger: RequestLedger::new(),
        }
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn latest_token(&self) -> Option<RequestToken> {
        self.ledger.latest()
    }

    fn is_current(&self, state: &PlannerState, token: RequestToken, epoch: u64) -> bool {
        self.ledger.is_latest(token) && state.epoch() == epoch
    }

    /// Budget-based optimization
    ///
    /// A non-positive budget is rejected before any call is made. On an
    /// authoritative success the result becomes the reference baseline and
    /// its optimal allocation the live one. A failure leaves state untouched.
    pub async fn optimize_budget(&self, total_budget: f64) -> PlannerResult<RequestOutcome<OptimizationResult>> {
        if !total_budget.is_finite() || total_budget <= 0.0 {
            return Err(PlannerError::validation("total_budget", "total budget must be greater than 0"));
        }

        let (token, epoch, constraints) = {
            let mut state = self.state.lock().await;
            state.ensure(WorkflowStage::Optimize)?;
            let constraints = state.constraints().to_wire();
            let token = self.ledger.issue();
            state.clear_goal();
            (token, state.epoch(), constraints)
        };

        component_info!(
            ComponentId::Optimizer,
            token = token.value(),
            total_budget,
            channels = constraints.len(),
            "📤 Requesting budget optimization"
        );

        let response = self
            .service
            .optimize(OptimizeRequest {
                total_budget,
                constraints: constraints.clone(),
            })
            .await;

        let mut state = self.state.lock().await;
        if !self.is_current(&state, token, epoch) {
            component_debug!(ComponentId::Optimizer, token = token.value(), "Discarding superseded optimization response");
            return Ok(RequestOutcome::Superseded);
        }

        match response {
            Ok(response) => {
                let result = OptimizationResult::from_response(response, total_budget, constraints);
                logging::log_success(
                    ComponentId::Optimizer,
                    &format!(
                        "Optimization applied: expected sales {:.2} ({:+.1}%)",
                        result.expected_lift.expected_sales, result.expected_lift.lift_pct
                    ),
                );
                state.adopt_optimization(result.clone());
                Ok(RequestOutcome::Applied(result))
            }
            Err(err) => {
                logging::log_error(ComponentId::Optimizer, "Budget optimization", &err);
                Err(err)
            }
        }
    }

    /// Goal-based planning: budget needed to reach `target_sales`
    ///
    /// An unreachable target is a normal `achievable: false` result.
    pub async fn optimize_for_target(
        &self,
        target_sales: f64,
        max_budget_multiplier: f64,
    ) -> PlannerResult<RequestOutcome<GoalResult>> {
        if !target_sales.is_finite() || target_sales <= 0.0 {
            return Err(PlannerError::validation("target_sales", "sales target must be greater than 0"));
        }
        if !max_budget_multiplier.is_finite() || max_budget_multiplier <= 0.0 {
            return Err(PlannerError::validation(
                "max_budget_multiplier",
                "budget multiplier must be greater than 0",
            ));
        }

        let (token, epoch) = {
            let mut state = self.state.lock().await;
            state.ensure(WorkflowStage::Optimize)?;
            let token = self.ledger.issue();
            state.clear_baseline();
            (token, state.epoch())
        };

        component_info!(
            ComponentId::Optimizer,
            token = token.value(),
            target_sales,
            max_budget_multiplier,
            "📤 Requesting goal-based plan"
        );

        let response = self
            .service
            .optimize_for_target(TargetRequest {
                target_sales,
                max_budget_multiplier,
            })
            .await;

        let mut state = self.state.lock().await;
        if !self.is_current(&state, token, epoch) {
            component_debug!(ComponentId::Optimizer, token = token.value(), "Discarding superseded goal response");
            return Ok(RequestOutcome::Superseded);
        }

        match response {
            Ok(response) => {
                let goal = GoalResult::from_response(response, target_sales);
                if goal.achievable {
                    logging::log_success(
                        ComponentId::Optimizer,
                        &format!("Goal reachable with budget {:.2}", goal.required_budget),
                    );
                } else {
                    component_warn!(ComponentId::Optimizer, reason = %goal.message, "Goal not reachable within budget cap");
                }
                state.record_goal(goal.clone());
                Ok(RequestOutcome::Applied(goal))
            }
            Err(err) => {
                logging::log_error(ComponentId::Optimizer, "Goal-based planning", &err);
                Err(err)
            }
        }
    }

    /// Adopt the latest goal plan as the live allocation
    ///
    /// Returns `false` without touching state when the plan is unachievable.
    pub async fn apply_goal_plan(&self) -> PlannerResult<bool> {
        self.state.lock().await.apply_preset(AllocationPreset::GoalPlan)
    }

    /// Save the live allocation as a named scenario
    ///
    /// The name is validated locally first. The Model Service's estimate is
    /// recorded next to the local projection; if the service fails nothing
    /// is saved. If the model changed while the estimate was in flight the
    /// snapshot is dropped and `Superseded` returned.
    pub async fn save_scenario(&self, name: &str) -> PlannerResult<RequestOutcome<SavedScenario>> {
        let (name, allocation, epoch) = {
            let state = self.state.lock().await;
            state.ensure(WorkflowStage::Scenario)?;
            (state.validate_scenario_name(name)?, state.allocation().clone(), state.epoch())
        };

        let estimate = self
            .service
            .create_scenario(ScenarioRequest {
                name: name.clone(),
                spend_allocation: allocation.clone(),
            })
            .await
            .map_err(|err| {
                logging::log_error(ComponentId::Scenarios, "Scenario estimate", &err);
                err
            })?;

        let mut state = self.state.lock().await;
        if state.epoch() != epoch {
            component_debug!(ComponentId::Scenarios, scenario = %name, "Discarding scenario for a replaced model");
            return Ok(RequestOutcome::Superseded);
        }
        let saved = state.save_scenario_snapshot(&name, allocation, Some(&estimate))?;
        logging::log_progress(ComponentId::Scenarios, "Saved scenario", &saved.name);
        Ok(RequestOutcome::Applied(saved))
    }

    /// Send the mapping and model configuration, train, and install the results
    ///
    /// The run is discarded when the dataset or mapping changed while the
    /// service was working.
    pub async fn train(&self) -> PlannerResult<RequestOutcome<ModelResults>> {
        let (mapping, config, epoch) = {
            let state = self.state.lock().await;
            state.ensure(WorkflowStage::Train)?;
            let workflow = state.workflow();
            let mapping = workflow.mapping().cloned().ok_or(PlannerError::StageLocked {
                requested: WorkflowStage::Train,
                redirect: WorkflowStage::Map,
            })?;
            (mapping, workflow.model_config(), state.epoch())
        };

        component_info!(
            ComponentId::ModelService,
            media_channels = mapping.media_cols.len(),
            model_type = %config.model_type,
            "📤 Submitting mapping and starting training"
        );

        let outcome = async {
            self.service.submit_mapping(mapping).await?;
            self.service.train(config).await?;
            self.service.fetch_results().await
        }
        .await;

        let mut state = self.state.lock().await;
        if state.epoch() != epoch {
            component_debug!(ComponentId::ModelService, "Discarding results trained on a replaced dataset or mapping");
            return Ok(RequestOutcome::Superseded);
        }

        match outcome {
            Ok(results) => {
                state.load_results(results.clone())?;
                logging::log_success(
                    ComponentId::ModelService,
                    &format!("Model trained: {} channels, r² {:.3}", state.channels().len(), results.r_squared),
                );
                Ok(RequestOutcome::Applied(results))
            }
            Err(err) => {
                logging::log_error(ComponentId::ModelService, "Model training", &err);
                Err(err)
            }
        }
    }

    /// Drop baseline and goal plan, restore history and supersede anything in flight
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        self.ledger.issue();
        state.reset_allocation();
        component_info!(ComponentId::Optimizer, "Allocation reset to historical spend");
    }
}
