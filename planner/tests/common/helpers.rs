//! Test helpers and builder patterns for planner tests

use async_trait::async_trait;
use shared::{
    ColumnMapping, HealthStatus, ModelConfig, ModelResults, OptimizeRequest, OptimizeResponse, ScenarioEstimate,
    ScenarioRequest, TargetRequest, TargetResponse,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::oneshot;

use planner::{
    ConstraintSet, MockModelService, ModelService, OptimizationOrchestrator, PlannerError, PlannerResult, PlannerState,
};

use super::fixtures::TestFixtures;

/// Builder for orchestrators over a `MockModelService`
pub struct PlannerBuilder {
    service: MockModelService,
    state: PlannerState,
}

impl PlannerBuilder {
    /// Session resumed from the fixture results, so every stage is open
    pub fn new() -> Self {
        Self {
            service: MockModelService::new(),
            state: TestHelpers::resumed_state(),
        }
    }

    /// Fresh session with no artifacts at all
    pub fn untrained() -> Self {
        Self {
            service: MockModelService::new(),
            state: PlannerState::new(),
        }
    }

    pub fn with_service<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockModelService),
    {
        setup(&mut self.service);
        self
    }

    pub fn with_state<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut PlannerState),
    {
        setup(&mut self.state);
        self
    }

    pub fn build(self) -> OptimizationOrchestrator<MockModelService> {
        OptimizationOrchestrator::new(self.service, self.state.into_shared())
    }
}

impl Default for PlannerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

type Reply<T> = oneshot::Receiver<PlannerResult<T>>;

/// Model Service whose answers are released by the test, in any order
///
/// Each call takes the next queued reply channel and waits on it, so a test
/// can issue several requests and then decide which one resolves first.
/// Scenario estimates and results answer from fixtures unless a reply was
/// queued for them.
#[derive(Default)]
pub struct ScriptedService {
    optimize: Mutex<VecDeque<Reply<OptimizeResponse>>>,
    target: Mutex<VecDeque<Reply<TargetResponse>>>,
    scenario: Mutex<VecDeque<Reply<ScenarioEstimate>>>,
    results: Mutex<VecDeque<Reply<ModelResults>>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a pending optimize reply; send on the returned sender to release it
    pub fn queue_optimize(&self) -> oneshot::Sender<PlannerResult<OptimizeResponse>> {
        let (tx, rx) = oneshot::channel();
        self.optimize.lock().unwrap().push_back(rx);
        tx
    }

    pub fn queue_target(&self) -> oneshot::Sender<PlannerResult<TargetResponse>> {
        let (tx, rx) = oneshot::channel();
        self.target.lock().unwrap().push_back(rx);
        tx
    }

    pub fn queue_scenario(&self) -> oneshot::Sender<PlannerResult<ScenarioEstimate>> {
        let (tx, rx) = oneshot::channel();
        self.scenario.lock().unwrap().push_back(rx);
        tx
    }

    pub fn queue_results(&self) -> oneshot::Sender<PlannerResult<ModelResults>> {
        let (tx, rx) = oneshot::channel();
        self.results.lock().unwrap().push_back(rx);
        tx
    }

    async fn wait<T>(queue: &Mutex<VecDeque<Reply<T>>>) -> PlannerResult<T> {
        Self::wait_or(queue, || Err(PlannerError::service("no scripted reply queued"))).await
    }

    async fn wait_or<T, F>(queue: &Mutex<VecDeque<Reply<T>>>, fallback: F) -> PlannerResult<T>
    where
        F: FnOnce() -> PlannerResult<T>,
    {
        let reply = queue.lock().unwrap().pop_front();
        match reply {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(PlannerError::service("scripted reply dropped"))),
            None => fallback(),
        }
    }
}

#[async_trait]
impl ModelService for ScriptedService {
    async fn optimize(&self, _request: OptimizeRequest) -> PlannerResult<OptimizeResponse> {
        Self::wait(&self.optimize).await
    }

    async fn optimize_for_target(&self, _request: TargetRequest) -> PlannerResult<TargetResponse> {
        Self::wait(&self.target).await
    }

    async fn create_scenario(&self, _request: ScenarioRequest) -> PlannerResult<ScenarioEstimate> {
        Self::wait_or(&self.scenario, || Ok(TestFixtures::scenario_estimate())).await
    }

    async fn submit_mapping(&self, _mapping: ColumnMapping) -> PlannerResult<()> {
        Ok(())
    }

    async fn train(&self, _config: ModelConfig) -> PlannerResult<()> {
        Ok(())
    }

    async fn fetch_results(&self) -> PlannerResult<ModelResults> {
        Self::wait_or(&self.results, || Ok(TestFixtures::results())).await
    }

    async fn health_check(&self) -> PlannerResult<HealthStatus> {
        Ok(HealthStatus {
            status: "healthy".to_string(),
            version: None,
        })
    }
}

/// Common operations used by several tests
pub struct TestHelpers;

impl TestHelpers {
    pub fn resumed_state() -> PlannerState {
        PlannerState::resume_from_results(TestFixtures::results(), ConstraintSet::new()).unwrap()
    }

    /// Session taken through the full workflow the way a user would
    pub fn trained_state() -> PlannerState {
        let mut state = Self::untrained_state();
        state.load_results(TestFixtures::results()).unwrap();
        state
    }

    pub fn scripted_orchestrator() -> OptimizationOrchestrator<ScriptedService> {
        OptimizationOrchestrator::new(ScriptedService::new(), Self::resumed_state().into_shared())
    }

    /// Session with dataset, mapping and model configuration but no results yet
    pub fn untrained_state() -> PlannerState {
        let mut state = PlannerState::new();
        state.load_dataset(TestFixtures::dataset()).unwrap();
        state.set_mapping(TestFixtures::mapping()).unwrap();
        state.configure_model(ModelConfig::default()).unwrap();
        state
    }

    pub fn assert_close(actual: f64, expected: f64, relative: f64) {
        let tolerance = expected.abs().max(1.0) * relative;
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected} (±{tolerance}), got {actual}"
        );
    }
}
