//! Per-channel allocation bounds sent to the external optimizer
//!
//! Bounds are fractions of the total budget. They are advisory: manual
//! spend edits may violate them, only the optimizer call path uses them.

use serde::{Deserialize, Serialize};
use shared::{ChannelId, SpendAllocation};
use std::collections::BTreeMap;

/// Minimum gap kept between a channel's lower and upper bound
pub const DEFAULT_MIN_GAP: f64 = 0.05;
pub const DEFAULT_MIN_FRACTION: f64 = 0.05;
pub const DEFAULT_MAX_FRACTION: f64 = 0.80;

/// Closed interval `[min_fraction, max_fraction]` within `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelBounds {
    pub min_fraction: f64,
    pub max_fraction: f64,
}

impl ChannelBounds {
    pub fn contains(&self, fraction: f64) -> bool {
        fraction >= self.min_fraction && fraction <= self.max_fraction
    }

    /// Repair an arbitrary pair into a valid interval with at least `gap` width
    fn normalized(min: f64, max: f64, gap: f64) -> Self {
        let min = clamp_unit(min, 0.0).min(1.0 - gap);
        let max = clamp_unit(max, 1.0).max(min + gap);
        Self {
            min_fraction: min,
            max_fraction: max,
        }
    }
}

impl Default for ChannelBounds {
    fn default() -> Self {
        Self {
            min_fraction: DEFAULT_MIN_FRACTION,
            max_fraction: DEFAULT_MAX_FRACTION,
        }
    }
}

/// A channel whose share of an allocation falls outside its bounds
#[derive(Debug, Clone, PartialEq)]
pub struct BoundsViolation {
    pub channel: ChannelId,
    pub share: f64,
    pub bounds: ChannelBounds,
}

/// Bounds for every channel of a session
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSet {
    bounds: BTreeMap<ChannelId, ChannelBounds>,
    default: ChannelBounds,
    min_gap: f64,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::with_defaults(ChannelBounds::default(), DEFAULT_MIN_GAP)
    }

    /// Constraint set using a configured default spread
    pub fn with_defaults(default: ChannelBounds, min_gap: f64) -> Self {
        let min_gap = if min_gap.is_finite() && min_gap > 0.0 && min_gap < 1.0 {
            min_gap
        } else {
            DEFAULT_MIN_GAP
        };
        Self {
            bounds: BTreeMap::new(),
            default: ChannelBounds::normalized(default.min_fraction, default.max_fraction, min_gap),
            min_gap,
        }
    }

    pub fn min_gap(&self) -> f64 {
        self.min_gap
    }

    pub fn default_bounds(&self) -> ChannelBounds {
        self.default
    }

    /// Seed every channel with the default bounds, dropping stale channels
    pub fn reset_for<'a>(&mut self, channels: impl IntoIterator<Item = &'a ChannelId>) {
        self.bounds = channels
            .into_iter()
            .map(|channel| (channel.clone(), self.default))
            .collect();
    }

    /// Replace both bounds, repairing the pair if it is degenerate
    pub fn set_bounds(&mut self, channel: &ChannelId, min: f64, max: f64) -> ChannelBounds {
        let bounds = ChannelBounds::normalized(min, max, self.min_gap);
        self.bounds.insert(channel.clone(), bounds);
        bounds
    }

    /// Edit the lower bound; it is clamped to `[0, max - gap]`
    pub fn set_min(&mut self, channel: &ChannelId, min: f64) -> ChannelBounds {
        let mut bounds = self.validate(channel);
        bounds.min_fraction = clamp_unit(min, 0.0).min(bounds.max_fraction - self.min_gap).max(0.0);
        self.bounds.insert(channel.clone(), bounds);
        bounds
    }

    /// Edit the upper bound; it is clamped to `[min + gap, 1]`
    pub fn set_max(&mut self, channel: &ChannelId, max: f64) -> ChannelBounds {
        let mut bounds = self.validate(channel);
        bounds.max_fraction = clamp_unit(max, 1.0).max(bounds.min_fraction + self.min_gap).min(1.0);
        self.bounds.insert(channel.clone(), bounds);
        bounds
    }

    /// Current bounds of a channel, falling back to the default spread
    pub fn validate(&self, channel: &ChannelId) -> ChannelBounds {
        self.bounds.get(channel).copied().unwrap_or(self.default)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChannelId, &ChannelBounds)> {
        self.bounds.iter()
    }

    /// Channels whose share of `allocation` lies outside their bounds
    pub fn violations(&self, allocation: &SpendAllocation) -> Vec<BoundsViolation> {
        if allocation.total() <= 0.0 {
            return Vec::new();
        }
        allocation
            .channels()
            .filter_map(|channel| {
                let bounds = self.validate(channel);
                let share = allocation.share(channel);
                (!bounds.contains(share)).then(|| BoundsViolation {
                    channel: channel.clone(),
                    share,
                    bounds,
                })
            })
            .collect()
    }

    /// `channel -> [min, max]` request payload
    pub fn to_wire(&self) -> BTreeMap<ChannelId, (f64, f64)> {
        self.bounds
            .iter()
            .map(|(channel, b)| (channel.clone(), (b.min_fraction, b.max_fraction)))
            .collect()
    }
}

impl Default for ConstraintSet {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_unit(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}
