//! HTTP implementation of the Model Service contract
//!
//! Talks JSON to the FastAPI backend. Non-success responses are turned into
//! `PlannerError::Service` carrying the backend's `detail` text (or the raw
//! body) unchanged. No retries.

use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::{
    component_debug, ColumnMapping, ComponentId, HealthStatus, ModelConfig, ModelResults, OptimizeRequest,
    OptimizeResponse, ScenarioEstimate, ScenarioRequest, TargetRequest, TargetResponse,
};
use url::Url;

use crate::error::{PlannerError, PlannerResult};
use crate::traits::ModelService;

pub struct HttpModelService {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpModelService {
    pub const OPTIMIZE: &'static str = "api/optimize";
    pub const OPTIMIZE_FOR_TARGET: &'static str = "api/optimize-for-target";
    pub const CREATE_SCENARIO: &'static str = "api/scenarios/create";
    pub const MAPPING: &'static str = "api/mapping";
    pub const MODEL_CONFIG: &'static str = "api/model/config";
    pub const MODEL_TRAIN: &'static str = "api/model/train";
    pub const MODEL_RESULTS: &'static str = "api/model/results";
    pub const HEALTH: &'static str = "api/health";

    pub fn new(base_url: &str) -> PlannerResult<Self> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> PlannerResult<Self> {
        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> PlannerResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| PlannerError::config(format!("invalid endpoint '{path}': {e}")))
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> PlannerResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        component_debug!(ComponentId::ModelService, url = %url, "POST");
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    async fn get_json<Resp: DeserializeOwned>(&self, path: &str) -> PlannerResult<Resp> {
        let url = self.endpoint(path)?;
        component_debug!(ComponentId::ModelService, url = %url, "GET");
        let response = self.client.get(url).send().await.map_err(transport_error)?;
        decode(response).await
    }
}

/// Parse the service root, making sure relative endpoints join below it
pub fn parse_base_url(base_url: &str) -> PlannerResult<Url> {
    let trimmed = base_url.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash).map_err(|e| PlannerError::config(format!("service_url '{trimmed}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(PlannerError::config(format!("service_url scheme '{other}' is not http(s)"))),
    }
}

fn transport_error(err: reqwest::Error) -> PlannerError {
    PlannerError::service(format!("Model Service unreachable: {err}"))
}

async fn decode<Resp: DeserializeOwned>(response: reqwest::Response) -> PlannerResult<Resp> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        return Err(PlannerError::service(error_message(status, &body)));
    }

    serde_json::from_str(&body)
        .map_err(|e| PlannerError::service(format!("Unexpected Model Service response: {e}")))
}

/// Human-readable message of a failed call: FastAPI `detail`, else the body
pub fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("detail").cloned())
        .map(|detail| match detail {
            serde_json::Value::String(text) => text,
            other => other.to_string(),
        });

    match detail {
        Some(detail) => detail,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => status.to_string(),
    }
}

#[async_trait::async_trait]
impl ModelService for HttpModelService {
    async fn optimize(&self, request: OptimizeRequest) -> PlannerResult<OptimizeResponse> {
        self.post_json(Self::OPTIMIZE, &request).await
    }

    async fn optimize_for_target(&self, request: TargetRequest) -> PlannerResult<TargetResponse> {
        self.post_json(Self::OPTIMIZE_FOR_TARGET, &request).await
    }

    async fn create_scenario(&self, request: ScenarioRequest) -> PlannerResult<ScenarioEstimate> {
        self.post_json(Self::CREATE_SCENARIO, &request).await
    }

    async fn submit_mapping(&self, mapping: ColumnMapping) -> PlannerResult<()> {
        let _: serde_json::Value = self.post_json(Self::MAPPING, &mapping).await?;
        Ok(())
    }

    async fn train(&self, config: ModelConfig) -> PlannerResult<()> {
        let _: serde_json::Value = self.post_json(Self::MODEL_CONFIG, &config).await?;
        let _: serde_json::Value = self.post_json(Self::MODEL_TRAIN, &serde_json::json!({})).await?;
        Ok(())
    }

    async fn fetch_results(&self) -> PlannerResult<ModelResults> {
        self.get_json(Self::MODEL_RESULTS).await
    }

    async fn health_check(&self) -> PlannerResult<HealthStatus> {
        self.get_json(Self::HEALTH).await
    }
}
