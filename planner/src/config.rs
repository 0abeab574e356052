//! Planner configuration
//!
//! Values come from defaults, then the environment (a `.env` file is loaded
//! first when present), then explicit overrides such as CLI flags:
//! - `MMM_SERVICE_URL`: Model Service root URL
//! - `MMM_LOG_LEVEL`: tracing level for the planner crates
//! - `MMM_DEFAULT_MIN_PCT` / `MMM_DEFAULT_MAX_PCT`: default per-channel
//!   bounds, as fractions of the total budget
//! - `MMM_MAX_BUDGET_MULTIPLIER`: default cap for goal-based planning

use serde::{Deserialize, Serialize};

use crate::core::constraints::{ChannelBounds, ConstraintSet, DEFAULT_MIN_GAP};
use crate::error::{PlannerError, PlannerResult};
use crate::services::model_service::parse_base_url;

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8000";
pub const DEFAULT_MAX_BUDGET_MULTIPLIER: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub service_url: String,
    pub log_level: String,
    pub default_bounds: ChannelBounds,
    pub min_gap: f64,
    pub max_budget_multiplier: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            log_level: "info".to_string(),
            default_bounds: ChannelBounds::default(),
            min_gap: DEFAULT_MIN_GAP,
            max_budget_multiplier: DEFAULT_MAX_BUDGET_MULTIPLIER,
        }
    }
}

impl PlannerConfig {
    pub fn builder() -> PlannerConfigBuilder {
        PlannerConfigBuilder::new()
    }

    /// Load from the process environment after reading `.env`
    pub fn from_env() -> PlannerResult<Self> {
        // a missing .env file is fine
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> PlannerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("MMM_SERVICE_URL") {
            config.service_url = url;
        }
        if let Some(level) = lookup("MMM_LOG_LEVEL") {
            config.log_level = level;
        }
        if let Some(min) = lookup("MMM_DEFAULT_MIN_PCT") {
            config.default_bounds.min_fraction = parse_number("MMM_DEFAULT_MIN_PCT", &min)?;
        }
        if let Some(max) = lookup("MMM_DEFAULT_MAX_PCT") {
            config.default_bounds.max_fraction = parse_number("MMM_DEFAULT_MAX_PCT", &max)?;
        }
        if let Some(multiplier) = lookup("MMM_MAX_BUDGET_MULTIPLIER") {
            config.max_budget_multiplier = parse_number("MMM_MAX_BUDGET_MULTIPLIER", &multiplier)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PlannerResult<()> {
        parse_base_url(&self.service_url)?;

        let ChannelBounds {
            min_fraction,
            max_fraction,
        } = self.default_bounds;
        if !(0.0..=1.0).contains(&min_fraction) || !(0.0..=1.0).contains(&max_fraction) {
            return Err(PlannerError::config("default bounds must lie within [0, 1]"));
        }
        if max_fraction - min_fraction < self.min_gap {
            return Err(PlannerError::config(format!(
                "default bounds [{min_fraction}, {max_fraction}] are narrower than the minimum gap {}",
                self.min_gap
            )));
        }
        if !self.max_budget_multiplier.is_finite() || self.max_budget_multiplier <= 0.0 {
            return Err(PlannerError::config("max_budget_multiplier must be greater than 0"));
        }
        Ok(())
    }

    /// Constraint set seeded with this configuration's default spread
    pub fn constraint_set(&self) -> ConstraintSet {
        ConstraintSet::with_defaults(self.default_bounds, self.min_gap)
    }
}

fn parse_number(key: &str, raw: &str) -> PlannerResult<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| PlannerError::config(format!("{key}: '{raw}' is not a number")))
}

pub struct PlannerConfigBuilder {
    config: PlannerConfig,
}

impl PlannerConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PlannerConfig::default(),
        }
    }

    /// Start from an existing configuration, e.g. one loaded from the environment
    pub fn from_config(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn service_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.service_url = url.into();
        self
    }

    /// Set log level (trace, debug, info, warn, error)
    pub fn log_level<S: Into<String>>(mut self, level: S) -> Self {
        self.config.log_level = level.into();
        self
    }

    pub fn default_bounds(mut self, min_fraction: f64, max_fraction: f64) -> Self {
        self.config.default_bounds = ChannelBounds {
            min_fraction,
            max_fraction,
        };
        self
    }

    pub fn min_gap(mut self, gap: f64) -> Self {
        self.config.min_gap = gap;
        self
    }

    pub fn max_budget_multiplier(mut self, multiplier: f64) -> Self {
        self.config.max_budget_multiplier = multiplier;
        self
    }

    pub fn build(self) -> PlannerResult<PlannerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for PlannerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
