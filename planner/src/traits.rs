//! Trait definitions with mockall annotations for testing
//!
//! The Model Service is the only external collaborator the planner talks to.
//! Everything else (projection, constraints, workflow) is pure and lives in
//! `core`.

use shared::{
    ColumnMapping, HealthStatus, ModelConfig, ModelResults, OptimizeRequest, OptimizeResponse, ScenarioEstimate,
    ScenarioRequest, TargetRequest, TargetResponse,
};

use crate::error::PlannerResult;

/// Model Service abstraction for dependency injection
///
/// Implementations perform no retries. A failure is reported as
/// `PlannerError::Service` carrying the service's own message.
#[mockall::automock]
#[async_trait::async_trait]
pub trait ModelService: Send + Sync {
    /// Budget-based optimization: best allocation of a fixed total budget
    async fn optimize(&self, request: OptimizeRequest) -> PlannerResult<OptimizeResponse>;

    /// Goal-based planning: budget required to reach a sales target
    ///
    /// An unreachable target is reported as `achievable: false`, not an error.
    async fn optimize_for_target(&self, request: TargetRequest) -> PlannerResult<TargetResponse>;

    /// Ask the service for its own estimate of a saved scenario
    async fn create_scenario(&self, request: ScenarioRequest) -> PlannerResult<ScenarioEstimate>;

    /// Register the dataset column mapping
    async fn submit_mapping(&self, mapping: ColumnMapping) -> PlannerResult<()>;

    /// Start model training with the given configuration
    async fn train(&self, config: ModelConfig) -> PlannerResult<()>;

    /// Fetch the results artifact of the last training run
    async fn fetch_results(&self) -> PlannerResult<ModelResults>;

    async fn health_check(&self) -> PlannerResult<HealthStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlannerError;

    #[tokio::test]
    async fn test_mock_model_service_instantiation() {
        let mut service = MockModelService::new();
        service
            .expect_health_check()
            .returning(|| Err(PlannerError::service("connection refused")));

        let err = service.health_check().await.unwrap_err();
        assert_eq!(err.to_string(), "connection refused");
    }
}
