//! Session state container
//!
//! One `PlannerState` per session (or per test). It owns the workflow, the
//! immutable channel set, the live allocation, the constraint set, the
//! reference baseline, the latest goal plan and the scenario book, and
//! announces every mutation on a broadcast channel.

use shared::{component_debug, Channel, ChannelId, ColumnMapping, ComponentId, ModelConfig, ModelResults, ScenarioEstimate, SpendAllocation};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

use super::constraints::{BoundsViolation, ChannelBounds, ConstraintSet};
use super::projection::{self, Projection, ProjectionComparison, WaterfallStep};
use super::scenarios::{SavedScenario, ScenarioBook};
use super::workflow::{DatasetSummary, Navigation, WorkflowStage, WorkflowStateMachine};
use crate::error::{PlannerError, PlannerResult};
use crate::optimization::types::{GoalResult, OptimizationResult};

const EVENT_CAPACITY: usize = 64;
const RESUMED_DATE_COLUMN: &str = "_date";
const RESUMED_TARGET_COLUMN: &str = "_target";

/// State container shared between the orchestrator and its callers
///
/// Never hold the lock across a Model Service await.
pub type SharedState = Arc<Mutex<PlannerState>>;

/// Change notification emitted after each mutation
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    DatasetLoaded,
    MappingChanged,
    ModelConfigured,
    ResultsLoaded,
    /// Results and everything derived from them were discarded
    ModelStateCleared,
    AllocationChanged,
    ConstraintsChanged,
    BaselineChanged,
    GoalChanged,
    ScenariosChanged,
    StageChanged(WorkflowStage),
}

/// Ways of replacing the live allocation in one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AllocationPreset {
    Historical,
    /// Every channel at `factor` times its historical spend
    Scale(f64),
    /// The reference baseline's optimal allocation
    Optimal,
    /// The latest achievable goal plan
    GoalPlan,
}

#[derive(Debug)]
pub struct PlannerState {
    workflow: WorkflowStateMachine,
    channels: Vec<Channel>,
    allocation: SpendAllocation,
    constraints: ConstraintSet,
    baseline: Option<OptimizationResult>,
    goal: Option<GoalResult>,
    scenarios: ScenarioBook,
    /// Bumped whenever the model inputs or results change
    epoch: u64,
    events: broadcast::Sender<StateChange>,
}

impl PlannerState {
    pub fn new() -> Self {
        Self::with_constraints(ConstraintSet::new())
    }

    /// Fresh session using a configured default bounds spread
    pub fn with_constraints(constraints: ConstraintSet) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            workflow: WorkflowStateMachine::new(),
            channels: Vec::new(),
            allocation: SpendAllocation::new(),
            constraints,
            baseline: None,
            goal: None,
            scenarios: ScenarioBook::new(),
            epoch: 0,
            events,
        }
    }

    /// Rebuild a session around a results artifact produced elsewhere
    ///
    /// Dataset and mapping are reconstructed from the artifact's channels so
    /// the workflow gates hold exactly as after a local training run.
    pub fn resume_from_results(results: ModelResults, constraints: ConstraintSet) -> PlannerResult<Self> {
        let media_cols: Vec<String> = results.channels().iter().map(|c| c.id.to_string()).collect();
        let mut columns = vec![RESUMED_DATE_COLUMN.to_string(), RESUMED_TARGET_COLUMN.to_string()];
        columns.extend(media_cols.iter().cloned());

        let mut state = Self::with_constraints(constraints);
        state.load_dataset(DatasetSummary::new("model results", columns, 0))?;
        state.set_mapping(ColumnMapping {
            date_col: RESUMED_DATE_COLUMN.to_string(),
            target_col: RESUMED_TARGET_COLUMN.to_string(),
            media_cols,
            control_cols: Vec::new(),
        })?;
        state.load_results(results)?;
        Ok(state)
    }

    pub fn into_shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.events.subscribe()
    }

    fn emit(&self, change: StateChange) {
        component_debug!(ComponentId::Workflow, change = ?change, "state changed");
        // no subscribers is fine
        let _ = self.events.send(change);
    }

    // Read access

    pub fn workflow(&self) -> &WorkflowStateMachine {
        &self.workflow
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn allocation(&self) -> &SpendAllocation {
        &self.allocation
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn baseline(&self) -> Option<&OptimizationResult> {
        self.baseline.as_ref()
    }

    pub fn goal(&self) -> Option<&GoalResult> {
        self.goal.as_ref()
    }

    pub fn scenarios(&self) -> &ScenarioBook {
        &self.scenarios
    }

    /// Generation of the model the session is working against
    ///
    /// A Model Service answer computed under an older epoch must not be
    /// applied: its channels may no longer exist.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn historical_allocation(&self) -> SpendAllocation {
        SpendAllocation::historical(&self.channels)
    }

    /// Allocation deltas are displayed against: the solver's view of the
    /// current spend once an optimization landed, history otherwise
    pub fn reference_allocation(&self) -> SpendAllocation {
        match &self.baseline {
            Some(baseline) => baseline.current_spend.clone(),
            None => self.historical_allocation(),
        }
    }

    /// Live projection, recomputed on every call
    pub fn projection(&self) -> Projection {
        projection::project(&self.channels, &self.allocation)
    }

    pub fn reference_projection(&self) -> Projection {
        projection::project(&self.channels, &self.reference_allocation())
    }

    pub fn comparison(&self) -> ProjectionComparison {
        projection::compare(&self.reference_projection(), &self.projection())
    }

    pub fn waterfall(&self) -> Vec<WaterfallStep> {
        projection::waterfall(&self.channels, &self.reference_allocation(), &self.allocation)
    }

    pub fn bounds_violations(&self) -> Vec<BoundsViolation> {
        self.constraints.violations(&self.allocation)
    }

    pub fn derived_progress(&self) -> (u8, u8) {
        self.workflow.derived_progress(self.baseline.is_some())
    }

    // Workflow

    pub fn navigate(&mut self, stage: WorkflowStage) -> Navigation {
        let navigation = self.workflow.navigate(stage);
        self.emit(StateChange::StageChanged(navigation.stage()));
        navigation
    }

    pub fn advance(&mut self) -> PlannerResult<WorkflowStage> {
        let stage = self.workflow.advance()?;
        self.emit(StateChange::StageChanged(stage));
        Ok(stage)
    }

    pub fn ensure(&self, stage: WorkflowStage) -> PlannerResult<()> {
        self.workflow.ensure(stage)
    }

    pub fn load_dataset(&mut self, dataset: DatasetSummary) -> PlannerResult<()> {
        let invalidated = self.workflow.load_dataset(dataset)?;
        self.epoch += 1;
        self.emit(StateChange::DatasetLoaded);
        if invalidated {
            self.clear_model_state();
        }
        Ok(())
    }

    pub fn set_mapping(&mut self, mapping: ColumnMapping) -> PlannerResult<()> {
        let changed = self.workflow.mapping() != Some(&mapping);
        let invalidated = self.workflow.set_mapping(mapping)?;
        if !changed {
            return Ok(());
        }
        self.epoch += 1;
        self.emit(StateChange::MappingChanged);
        if invalidated {
            self.clear_model_state();
        }
        Ok(())
    }

    pub fn configure_model(&mut self, config: ModelConfig) -> PlannerResult<()> {
        self.workflow.configure_model(config)?;
        self.emit(StateChange::ModelConfigured);
        Ok(())
    }

    /// Install a results artifact and reset everything derived from it
    pub fn load_results(&mut self, results: ModelResults) -> PlannerResult<()> {
        let channels = results.channels();
        self.workflow.load_results(results)?;

        self.constraints.reset_for(channels.iter().map(|c| &c.id));
        self.allocation = SpendAllocation::historical(&channels);
        self.scenarios.seed_current(&channels);
        self.channels = channels;
        self.baseline = None;
        self.goal = None;
        self.epoch += 1;

        self.emit(StateChange::ResultsLoaded);
        Ok(())
    }

    fn clear_model_state(&mut self) {
        self.epoch += 1;
        self.workflow.clear_results();
        self.channels.clear();
        self.allocation = SpendAllocation::new();
        self.baseline = None;
        self.goal = None;
        self.scenarios.clear();
        self.emit(StateChange::ModelStateCleared);
    }

    // Allocation

    fn known_channel(&self, channel: &ChannelId) -> PlannerResult<()> {
        if self.channels.iter().any(|c| &c.id == channel) {
            Ok(())
        } else {
            Err(PlannerError::validation("channel", format!("unknown channel '{channel}'")))
        }
    }

    /// Slider edit; bounds are not enforced here
    pub fn set_channel_spend(&mut self, channel: &ChannelId, spend: f64) -> PlannerResult<Projection> {
        self.ensure(WorkflowStage::Optimize)?;
        self.known_channel(channel)?;
        self.allocation.set(channel.clone(), spend);
        self.emit(StateChange::AllocationChanged);
        Ok(self.projection())
    }

    /// Replace the live allocation from a preset
    ///
    /// Returns `false` when the preset had nothing appliable (an unachievable
    /// goal plan); the allocation is left untouched in that case.
    pub fn apply_preset(&mut self, preset: AllocationPreset) -> PlannerResult<bool> {
        self.ensure(WorkflowStage::Optimize)?;
        let allocation = match preset {
            AllocationPreset::Historical => self.historical_allocation(),
            AllocationPreset::Scale(factor) => {
                if !factor.is_finite() || factor < 0.0 {
                    return Err(PlannerError::validation("factor", "scale factor must be a non-negative number"));
                }
                self.historical_allocation().scaled(factor)
            }
            AllocationPreset::Optimal => match &self.baseline {
                Some(baseline) => baseline.optimal_spend.clone(),
                None => return Err(PlannerError::validation("preset", "no optimization result to apply")),
            },
            AllocationPreset::GoalPlan => match &self.goal {
                Some(goal) => match goal.appliable_allocation() {
                    Some(allocation) => allocation.clone(),
                    None => return Ok(false),
                },
                None => return Err(PlannerError::validation("preset", "no goal plan to apply")),
            },
        };
        self.allocation = allocation;
        self.emit(StateChange::AllocationChanged);
        Ok(true)
    }

    // Constraints

    pub fn set_bounds(&mut self, channel: &ChannelId, min: f64, max: f64) -> PlannerResult<ChannelBounds> {
        self.known_channel(channel)?;
        let bounds = self.constraints.set_bounds(channel, min, max);
        self.emit(StateChange::ConstraintsChanged);
        Ok(bounds)
    }

    pub fn set_min_bound(&mut self, channel: &ChannelId, min: f64) -> PlannerResult<ChannelBounds> {
        self.known_channel(channel)?;
        let bounds = self.constraints.set_min(channel, min);
        self.emit(StateChange::ConstraintsChanged);
        Ok(bounds)
    }

    pub fn set_max_bound(&mut self, channel: &ChannelId, max: f64) -> PlannerResult<ChannelBounds> {
        self.known_channel(channel)?;
        let bounds = self.constraints.set_max(channel, max);
        self.emit(StateChange::ConstraintsChanged);
        Ok(bounds)
    }

    // Optimization reconciliation

    /// Make an authoritative optimization the reference baseline and adopt
    /// its optimal allocation as the live one
    pub fn adopt_optimization(&mut self, result: OptimizationResult) {
        self.allocation = result.optimal_spend.clone();
        self.baseline = Some(result);
        self.emit(StateChange::BaselineChanged);
        self.emit(StateChange::AllocationChanged);
    }

    pub fn record_goal(&mut self, goal: GoalResult) {
        self.goal = Some(goal);
        self.emit(StateChange::GoalChanged);
    }

    pub fn clear_baseline(&mut self) {
        if self.baseline.take().is_some() {
            self.emit(StateChange::BaselineChanged);
        }
    }

    pub fn clear_goal(&mut self) {
        if self.goal.take().is_some() {
            self.emit(StateChange::GoalChanged);
        }
    }

    /// Drop optimization answers and return to the historical allocation
    pub fn reset_allocation(&mut self) {
        self.clear_baseline();
        self.clear_goal();
        self.allocation = self.historical_allocation();
        self.emit(StateChange::AllocationChanged);
    }

    // Scenarios

    pub fn validate_scenario_name(&self, name: &str) -> PlannerResult<String> {
        self.scenarios.validate_name(name)
    }

    /// Snapshot the live allocation under `name`
    pub fn save_scenario(&mut self, name: &str, estimate: Option<&ScenarioEstimate>) -> PlannerResult<SavedScenario> {
        let allocation = self.allocation.clone();
        self.save_scenario_snapshot(name, allocation, estimate)
    }

    /// Save an allocation captured earlier, projected against the channel set
    pub fn save_scenario_snapshot(
        &mut self,
        name: &str,
        allocation: SpendAllocation,
        estimate: Option<&ScenarioEstimate>,
    ) -> PlannerResult<SavedScenario> {
        self.ensure(WorkflowStage::Scenario)?;
        let projection = projection::project(&self.channels, &allocation);
        let saved = self.scenarios.save(name, allocation, &projection, estimate)?.clone();
        self.emit(StateChange::ScenariosChanged);
        Ok(saved)
    }

    pub fn remove_scenario(&mut self, name: &str) -> PlannerResult<SavedScenario> {
        let removed = self.scenarios.remove(name)?;
        self.emit(StateChange::ScenariosChanged);
        Ok(removed)
    }
}

impl Default for PlannerState {
    fn default() -> Self {
        Self::new()
    }
}
