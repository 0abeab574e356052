//! Step-gated workflow state machine
//!
//! Entry to a stage is derived from the artifacts that exist (dataset,
//! column mapping, model results), never from the remembered step counter.
//! The counter is display-only and grows only through [`WorkflowStateMachine::advance`].

use serde::{Deserialize, Serialize};
use shared::{ColumnMapping, ModelConfig, ModelResults};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{PlannerError, PlannerResult};

pub const TOTAL_STEPS: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkflowStage {
    Upload,
    Explore,
    Map,
    Configure,
    Train,
    Results,
    Optimize,
    Scenario,
}

impl WorkflowStage {
    pub const ALL: [WorkflowStage; 8] = [
        WorkflowStage::Upload,
        WorkflowStage::Explore,
        WorkflowStage::Map,
        WorkflowStage::Configure,
        WorkflowStage::Train,
        WorkflowStage::Results,
        WorkflowStage::Optimize,
        WorkflowStage::Scenario,
    ];

    /// 1-based position in the workflow
    pub fn step(self) -> u8 {
        self as u8 + 1
    }

    pub fn from_step(step: u8) -> Option<Self> {
        Self::ALL.get(usize::from(step).checked_sub(1)?).copied()
    }

    /// Following stage; `Scenario` is terminal
    pub fn next(self) -> Option<Self> {
        Self::from_step(self.step() + 1)
    }

    /// Artifact a stage needs before it can be entered
    pub fn requirement(self) -> Option<Artifact> {
        match self {
            WorkflowStage::Upload => None,
            WorkflowStage::Explore | WorkflowStage::Map => Some(Artifact::Dataset),
            WorkflowStage::Configure | WorkflowStage::Train => Some(Artifact::Mapping),
            WorkflowStage::Results | WorkflowStage::Optimize | WorkflowStage::Scenario => Some(Artifact::Results),
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowStage::Upload => "Upload",
            WorkflowStage::Explore => "Explore",
            WorkflowStage::Map => "Map",
            WorkflowStage::Configure => "Configure",
            WorkflowStage::Train => "Train",
            WorkflowStage::Results => "Results",
            WorkflowStage::Optimize => "Optimize",
            WorkflowStage::Scenario => "Scenario",
        };
        f.write_str(name)
    }
}

/// Upstream artifacts, in the order the workflow produces them
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Artifact {
    Dataset,
    Mapping,
    Results,
}

impl Artifact {
    /// Stage where the artifact is produced
    pub fn produced_at(self) -> WorkflowStage {
        match self {
            Artifact::Dataset => WorkflowStage::Upload,
            Artifact::Mapping => WorkflowStage::Map,
            Artifact::Results => WorkflowStage::Train,
        }
    }

    /// This artifact and every artifact it depends on, earliest first
    fn chain(self) -> &'static [Artifact] {
        match self {
            Artifact::Dataset => &[Artifact::Dataset],
            Artifact::Mapping => &[Artifact::Dataset, Artifact::Mapping],
            Artifact::Results => &[Artifact::Dataset, Artifact::Mapping, Artifact::Results],
        }
    }
}

/// Outcome of a navigation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Entered(WorkflowStage),
    /// Prerequisites were missing; the machine moved to `to` instead
    Redirected { requested: WorkflowStage, to: WorkflowStage },
}

impl Navigation {
    pub fn stage(&self) -> WorkflowStage {
        match *self {
            Navigation::Entered(stage) => stage,
            Navigation::Redirected { to, .. } => to,
        }
    }
}

/// What the planner knows about an uploaded dataset
///
/// File parsing happens elsewhere; only the column names matter here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: usize,
}

impl DatasetSummary {
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: usize) -> Self {
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// Check a column mapping against a dataset
pub fn validate_mapping(mapping: &ColumnMapping, dataset: &DatasetSummary) -> PlannerResult<()> {
    if mapping.date_col.trim().is_empty() {
        return Err(PlannerError::validation("date_col", "a date column is required"));
    }
    if mapping.target_col.trim().is_empty() {
        return Err(PlannerError::validation("target_col", "a target column is required"));
    }
    if mapping.media_cols.is_empty() {
        return Err(PlannerError::validation("media_cols", "at least one media column is required"));
    }
    if mapping.date_col == mapping.target_col {
        return Err(PlannerError::validation("target_col", "target column cannot be the date column"));
    }

    let all_columns = std::iter::once(&mapping.date_col)
        .chain(std::iter::once(&mapping.target_col))
        .chain(mapping.media_cols.iter())
        .chain(mapping.control_cols.iter());
    for column in all_columns {
        if !dataset.has_column(column) {
            return Err(PlannerError::validation(
                "mapping",
                format!("column '{}' is not in dataset '{}'", column, dataset.name),
            ));
        }
    }

    let mut media = BTreeSet::new();
    for column in &mapping.media_cols {
        if column == &mapping.date_col || column == &mapping.target_col {
            return Err(PlannerError::validation(
                "media_cols",
                format!("'{column}' is already mapped as the date or target column"),
            ));
        }
        if !media.insert(column) {
            return Err(PlannerError::validation("media_cols", format!("'{column}' is listed twice")));
        }
    }
    if let Some(column) = mapping.control_cols.iter().find(|c| media.contains(c)) {
        return Err(PlannerError::validation(
            "control_cols",
            format!("'{column}' is already mapped as a media column"),
        ));
    }

    Ok(())
}

pub fn validate_model_config(config: &ModelConfig) -> PlannerResult<()> {
    if config.model_type.trim().is_empty() {
        return Err(PlannerError::validation("model_type", "a model type is required"));
    }
    if config.seasonality_period == 0 {
        return Err(PlannerError::validation("seasonality_period", "must be at least 1"));
    }
    if config.mcmc_draws == 0 || config.mcmc_chains == 0 {
        return Err(PlannerError::validation("mcmc", "draws and chains must be at least 1"));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct WorkflowStateMachine {
    current_stage: WorkflowStage,
    current_step: u8,
    dataset: Option<DatasetSummary>,
    mapping: Option<ColumnMapping>,
    model_config: Option<ModelConfig>,
    results: Option<ModelResults>,
}

impl WorkflowStateMachine {
    pub fn new() -> Self {
        Self {
            current_stage: WorkflowStage::Upload,
            current_step: WorkflowStage::Upload.step(),
            dataset: None,
            mapping: None,
            model_config: None,
            results: None,
        }
    }

    pub fn current_stage(&self) -> WorkflowStage {
        self.current_stage
    }

    /// Display-only progress counter (1..=8)
    pub fn current_step(&self) -> u8 {
        self.current_step
    }

    pub fn dataset(&self) -> Option<&DatasetSummary> {
        self.dataset.as_ref()
    }

    pub fn mapping(&self) -> Option<&ColumnMapping> {
        self.mapping.as_ref()
    }

    pub fn results(&self) -> Option<&ModelResults> {
        self.results.as_ref()
    }

    /// Configured model settings, or the defaults when none were stored
    pub fn model_config(&self) -> ModelConfig {
        self.model_config.clone().unwrap_or_default()
    }

    pub fn has_dataset(&self) -> bool {
        self.dataset.is_some()
    }

    pub fn has_valid_mapping(&self) -> bool {
        match (&self.mapping, &self.dataset) {
            (Some(mapping), Some(dataset)) => validate_mapping(mapping, dataset).is_ok(),
            _ => false,
        }
    }

    pub fn has_results(&self) -> bool {
        self.results.is_some()
    }

    pub fn has_artifact(&self, artifact: Artifact) -> bool {
        match artifact {
            Artifact::Dataset => self.has_dataset(),
            Artifact::Mapping => self.has_valid_mapping(),
            Artifact::Results => self.has_results(),
        }
    }

    /// Earliest missing artifact on the path to `stage`
    pub fn missing_prerequisite(&self, stage: WorkflowStage) -> Option<Artifact> {
        stage
            .requirement()?
            .chain()
            .iter()
            .copied()
            .find(|artifact| !self.has_artifact(*artifact))
    }

    pub fn can_enter(&self, stage: WorkflowStage) -> bool {
        self.missing_prerequisite(stage).is_none()
    }

    /// Gate an action that belongs to `stage`
    pub fn ensure(&self, stage: WorkflowStage) -> PlannerResult<()> {
        match self.missing_prerequisite(stage) {
            None => Ok(()),
            Some(artifact) => Err(PlannerError::StageLocked {
                requested: stage,
                redirect: artifact.produced_at(),
            }),
        }
    }

    /// Move to `stage`, or to the stage producing its earliest unmet prerequisite
    ///
    /// Never touches the step counter.
    pub fn navigate(&mut self, stage: WorkflowStage) -> Navigation {
        match self.missing_prerequisite(stage) {
            None => {
                self.current_stage = stage;
                Navigation::Entered(stage)
            }
            Some(artifact) => {
                let to = artifact.produced_at();
                self.current_stage = to;
                Navigation::Redirected { requested: stage, to }
            }
        }
    }

    /// "Continue": enter the next stage and raise the step counter
    ///
    /// `Scenario` is terminal and re-entrant, so advancing from it stays put.
    pub fn advance(&mut self) -> PlannerResult<WorkflowStage> {
        let next = self.current_stage.next().unwrap_or(WorkflowStage::Scenario);
        self.ensure(next)?;
        self.current_stage = next;
        self.current_step = self.current_step.max(next.step());
        Ok(next)
    }

    /// Progress recomputed from artifacts alone
    pub fn derived_progress(&self, has_optimization: bool) -> (u8, u8) {
        let step = if !self.has_dataset() {
            1
        } else if self.mapping.is_none() {
            2
        } else if !self.has_valid_mapping() {
            3
        } else if !self.has_results() {
            if self.model_config.is_none() {
                4
            } else {
                5
            }
        } else if !has_optimization {
            7
        } else {
            8
        };
        (step, TOTAL_STEPS)
    }

    /// Store a dataset
    ///
    /// Returns `true` when previously derived model state was invalidated.
    /// A stored mapping survives only if it still fits the new columns.
    pub fn load_dataset(&mut self, dataset: DatasetSummary) -> PlannerResult<bool> {
        if dataset.columns.is_empty() {
            return Err(PlannerError::validation("dataset", "dataset has no columns"));
        }
        if self
            .mapping
            .as_ref()
            .is_some_and(|mapping| validate_mapping(mapping, &dataset).is_err())
        {
            self.mapping = None;
        }
        self.dataset = Some(dataset);
        Ok(self.clear_results())
    }

    /// Store a validated column mapping
    ///
    /// Returns `true` when a changed mapping invalidated model state.
    pub fn set_mapping(&mut self, mapping: ColumnMapping) -> PlannerResult<bool> {
        let dataset = self.dataset.as_ref().ok_or(PlannerError::StageLocked {
            requested: WorkflowStage::Map,
            redirect: WorkflowStage::Upload,
        })?;
        validate_mapping(&mapping, dataset)?;

        if self.mapping.as_ref() == Some(&mapping) {
            return Ok(false);
        }
        self.mapping = Some(mapping);
        Ok(self.clear_results())
    }

    pub fn configure_model(&mut self, config: ModelConfig) -> PlannerResult<()> {
        self.ensure(WorkflowStage::Configure)?;
        validate_model_config(&config)?;
        self.model_config = Some(config);
        Ok(())
    }

    /// Record the artifact of a finished training run
    pub fn load_results(&mut self, results: ModelResults) -> PlannerResult<()> {
        self.ensure(WorkflowStage::Train)?;
        results.validate()?;
        self.results = Some(results);
        Ok(())
    }

    /// Drop model results; returns whether there were any
    pub fn clear_results(&mut self) -> bool {
        self.results.take().is_some()
    }
}

impl Default for WorkflowStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
