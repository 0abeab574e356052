//! Core types used throughout the planner

use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{SharedError, SharedResult};

/// Component identifier used to tag log output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentId {
    Workflow,
    Projection,
    Optimizer,
    Scenarios,
    ModelService,
    Cli,
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentId::Workflow => write!(f, "workflow"),
            ComponentId::Projection => write!(f, "projection"),
            ComponentId::Optimizer => write!(f, "optimizer"),
            ComponentId::Scenarios => write!(f, "scenarios"),
            ComponentId::ModelService => write!(f, "model_service"),
            ComponentId::Cli => write!(f, "cli"),
        }
    }
}

/// Media channel identifier, unique within a model run
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Parse a user-supplied channel name, rejecting blank input
    pub fn parse(input: &str) -> SharedResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SharedError::InvalidChannel {
                input: input.to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ChannelId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Posterior summary of a channel elasticity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Elasticity {
    pub mean: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

impl Elasticity {
    /// Point estimate with a degenerate interval
    pub fn point(mean: f64) -> Self {
        Self {
            mean,
            ci_lower: mean,
            ci_upper: mean,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.ci_lower <= self.mean && self.mean <= self.ci_upper
    }

    pub fn validate(&self, channel: &ChannelId) -> SharedResult<()> {
        if self.is_consistent() {
            Ok(())
        } else {
            Err(SharedError::InconsistentElasticity {
                channel: channel.to_string(),
                mean: self.mean,
                ci_lower: self.ci_lower,
                ci_upper: self.ci_upper,
            })
        }
    }
}

/// A media channel as reported by a trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub historical_spend: f64,
    pub historical_contribution: f64,
    /// `None` when the model did not report an elasticity for the channel
    pub elasticity: Option<Elasticity>,
}

impl Channel {
    pub fn new(id: impl Into<ChannelId>, historical_spend: f64, historical_contribution: f64, elasticity: Option<Elasticity>) -> Self {
        Self {
            id: id.into(),
            historical_spend: sanitize_amount(historical_spend),
            historical_contribution: sanitize_amount(historical_contribution),
            elasticity,
        }
    }

    /// Mean elasticity, if the model reported a finite one
    pub fn elasticity_mean(&self) -> Option<f64> {
        self.elasticity.map(|e| e.mean).filter(|m| m.is_finite())
    }

    /// Historical return on spend for the channel
    pub fn historical_roi(&self) -> f64 {
        if self.historical_spend > 0.0 {
            self.historical_contribution / self.historical_spend
        } else {
            0.0
        }
    }
}

/// Clamp a monetary amount to a finite, non-negative value
pub fn sanitize_amount(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Spend per channel
///
/// Keys are kept ordered so every aggregation over an allocation visits
/// channels in the same order and produces identical floating point sums.
///
/// Deserialized maps go through the same sanitizing path as `set`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<ChannelId, f64>", into = "BTreeMap<ChannelId, f64>")]
pub struct SpendAllocation(BTreeMap<ChannelId, f64>);

impl SpendAllocation {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Allocation that leaves every channel at its historical spend
    pub fn historical(channels: &[Channel]) -> Self {
        channels
            .iter()
            .map(|c| (c.id.clone(), c.historical_spend))
            .collect()
    }

    /// Set the spend for a channel; negative or non-finite values become 0
    pub fn set(&mut self, channel: impl Into<ChannelId>, spend: f64) {
        self.0.insert(channel.into(), sanitize_amount(spend));
    }

    pub fn with(mut self, channel: impl Into<ChannelId>, spend: f64) -> Self {
        self.set(channel, spend);
        self
    }

    pub fn get(&self, channel: &ChannelId) -> Option<f64> {
        self.0.get(channel).copied()
    }

    pub fn remove(&mut self, channel: &ChannelId) -> Option<f64> {
        self.0.remove(channel)
    }

    pub fn contains(&self, channel: &ChannelId) -> bool {
        self.0.contains_key(channel)
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChannelId> {
        self.0.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, ChannelId, f64> {
        self.0.iter()
    }

    /// Every channel multiplied by `factor` (preset buttons such as -10% / +10%)
    pub fn scaled(&self, factor: f64) -> Self {
        self.0
            .iter()
            .map(|(channel, spend)| (channel.clone(), spend * factor))
            .collect()
    }

    /// Share of the allocation total held by a channel
    pub fn share(&self, channel: &ChannelId) -> f64 {
        let total = self.total();
        if total > 0.0 {
            self.get(channel).unwrap_or(0.0) / total
        } else {
            0.0
        }
    }
}

impl FromIterator<(ChannelId, f64)> for SpendAllocation {
    fn from_iter<I: IntoIterator<Item = (ChannelId, f64)>>(iter: I) -> Self {
        let mut allocation = SpendAllocation::new();
        for (channel, spend) in iter {
            allocation.set(channel, spend);
        }
        allocation
    }
}

impl From<BTreeMap<ChannelId, f64>> for SpendAllocation {
    fn from(map: BTreeMap<ChannelId, f64>) -> Self {
        map.into_iter().collect()
    }
}

impl From<SpendAllocation> for BTreeMap<ChannelId, f64> {
    fn from(allocation: SpendAllocation) -> Self {
        allocation.0
    }
}

impl<'a> IntoIterator for &'a SpendAllocation {
    type Item = (&'a ChannelId, &'a f64);
    type IntoIter = btree_map::Iter<'a, ChannelId, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
