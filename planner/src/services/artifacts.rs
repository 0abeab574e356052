//! Results artifacts on disk
//!
//! Lets the local commands work from a results file saved from an earlier
//! training run instead of asking the Model Service.

use shared::{component_debug, ComponentId, ModelResults};
use std::path::Path;
use tokio::fs;

use crate::error::PlannerResult;

/// Read and validate a results artifact written as JSON
pub async fn read_results(path: &Path) -> PlannerResult<ModelResults> {
    let content = fs::read_to_string(path).await?;
    let results: ModelResults = serde_json::from_str(&content)?;
    results.validate()?;

    component_debug!(
        ComponentId::ModelService,
        path = %path.display(),
        channels = results.channels().len(),
        "Loaded results artifact"
    );
    Ok(results)
}

/// Write a results artifact so later runs can be planned offline
pub async fn write_results(path: &Path, results: &ModelResults) -> PlannerResult<()> {
    let content = serde_json::to_string_pretty(results)?;
    fs::write(path, content).await?;
    Ok(())
}
