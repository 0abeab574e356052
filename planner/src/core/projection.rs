//! Budget projection engine
//!
//! Aggregates the response model over a channel set for an arbitrary
//! candidate allocation. Everything here is a pure function of its inputs:
//! nothing is cached, so a projection always reflects exactly the allocation
//! it was computed from.

use serde::{Deserialize, Serialize};
use shared::{sanitize_amount, Channel, ChannelId, SpendAllocation};

use super::response;

/// Per-channel view of a candidate allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDelta {
    pub channel: ChannelId,
    pub historical_spend: f64,
    pub candidate_spend: f64,
    /// Percent change against historical spend, 0 when there is no history
    pub delta_pct: f64,
    pub projected_contribution: f64,
    pub channel_roi: f64,
}

/// Derived totals for a candidate allocation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Projection {
    pub total_spend: f64,
    pub total_sales: f64,
    pub roi: f64,
    pub per_channel: Vec<ChannelDelta>,
}

impl Projection {
    pub fn channel(&self, id: &ChannelId) -> Option<&ChannelDelta> {
        self.per_channel.iter().find(|delta| &delta.channel == id)
    }
}

/// Percent changes of a candidate projection against a reference one
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectionComparison {
    pub spend_change_pct: f64,
    pub sales_change_pct: f64,
    pub roi_change_pct: f64,
}

/// Signed spend change of one channel between two allocations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallStep {
    pub channel: ChannelId,
    pub reference_spend: f64,
    pub candidate_spend: f64,
    pub delta: f64,
}

/// Project `allocation` over `channels`
///
/// A channel missing from the allocation stays at its historical spend; an
/// explicit 0 is honored. Allocation keys for unknown channels are ignored.
pub fn project(channels: &[Channel], allocation: &SpendAllocation) -> Projection {
    let per_channel: Vec<ChannelDelta> = channels
        .iter()
        .map(|channel| {
            let candidate_spend = candidate_spend(channel, allocation);
            let projected_contribution = response::project_channel(channel, candidate_spend);
            ChannelDelta {
                channel: channel.id.clone(),
                historical_spend: channel.historical_spend,
                candidate_spend,
                delta_pct: percent_change(channel.historical_spend, candidate_spend),
                projected_contribution,
                channel_roi: ratio(projected_contribution, candidate_spend),
            }
        })
        .collect();

    let total_spend = sanitize_amount(per_channel.iter().map(|d| d.candidate_spend).sum());
    let total_sales = sanitize_amount(per_channel.iter().map(|d| d.projected_contribution).sum());

    Projection {
        total_spend,
        total_sales,
        roi: ratio(total_sales, total_spend),
        per_channel,
    }
}

/// Candidate spend of a channel, defaulting to its history
pub fn candidate_spend(channel: &Channel, allocation: &SpendAllocation) -> f64 {
    allocation
        .get(&channel.id)
        .map(sanitize_amount)
        .unwrap_or(channel.historical_spend)
}

pub fn compare(reference: &Projection, candidate: &Projection) -> ProjectionComparison {
    ProjectionComparison {
        spend_change_pct: percent_change(reference.total_spend, candidate.total_spend),
        sales_change_pct: percent_change(reference.total_sales, candidate.total_sales),
        roi_change_pct: percent_change(reference.roi, candidate.roi),
    }
}

/// Per-channel reallocation between a reference and a candidate allocation
///
/// Channels absent from either side are read at historical spend.
pub fn waterfall(channels: &[Channel], reference: &SpendAllocation, candidate: &SpendAllocation) -> Vec<WaterfallStep> {
    channels
        .iter()
        .map(|channel| {
            let reference_spend = candidate_spend(channel, reference);
            let candidate_spend = candidate_spend(channel, candidate);
            WaterfallStep {
                channel: channel.id.clone(),
                reference_spend,
                candidate_spend,
                delta: candidate_spend - reference_spend,
            }
        })
        .collect()
}

fn percent_change(reference: f64, candidate: f64) -> f64 {
    if reference > 0.0 && reference.is_finite() {
        let pct = (candidate - reference) / reference * 100.0;
        if pct.is_finite() {
            pct
        } else {
            0.0
        }
    } else {
        0.0
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        sanitize_amount(numerator / denominator)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Elasticity;

    fn channels() -> Vec<Channel> {
        vec![
            Channel::new("TV", 1_000_000.0, 400_000.0, Some(Elasticity::point(0.2))),
            Channel::new("Search", 250_000.0, 300_000.0, Some(Elasticity::point(0.35))),
            Channel::new("Podcast", 0.0, 10_000.0, None),
        ]
    }

    #[test]
    fn test_historical_projection_reproduces_history() {
        let channels = channels();
        let projection = project(&channels, &SpendAllocation::new());

        assert_eq!(projection.total_spend, 1_250_000.0);
        assert!((projection.total_sales - 710_000.0).abs() < 1e-6);
        assert!(projection.per_channel.iter().all(|d| d.delta_pct == 0.0));
    }

    #[test]
    fn test_missing_entry_differs_from_explicit_zero() {
        let channels = channels();
        let unspecified = project(&channels, &SpendAllocation::new().with("Search", 250_000.0));
        let zeroed = project(&channels, &SpendAllocation::new().with("Search", 250_000.0).with("TV", 0.0));

        let tv = ChannelId::from("TV");
        assert_eq!(unspecified.channel(&tv).unwrap().candidate_spend, 1_000_000.0);
        assert_eq!(zeroed.channel(&tv).unwrap().candidate_spend, 0.0);
        assert_eq!(zeroed.channel(&tv).unwrap().projected_contribution, 0.0);
        assert_eq!(zeroed.channel(&tv).unwrap().delta_pct, -100.0);
    }

    #[test]
    fn test_projection_is_bit_identical() {
        let channels = channels();
        let allocation = SpendAllocation::new()
            .with("TV", 1_210_000.0)
            .with("Search", 333_333.33)
            .with("Podcast", 5_000.0);

        let first = project(&channels, &allocation);
        let second = project(&channels, &allocation);
        assert_eq!(first, second);
        assert_eq!(first.total_sales.to_bits(), second.total_sales.to_bits());
        assert_eq!(first.roi.to_bits(), second.roi.to_bits());
    }

    #[test]
    fn test_tv_delta_and_contribution() {
        let channels = channels();
        let projection = project(&channels, &SpendAllocation::new().with("TV", 1_210_000.0));
        let tv = projection.channel(&ChannelId::from("TV")).unwrap();

        assert!((tv.delta_pct - 21.0).abs() < 1e-9);
        assert!((tv.projected_contribution - 415_520.0).abs() / 415_520.0 < 1e-4);
    }

    #[test]
    fn test_empty_channel_set_is_neutral() {
        let projection = project(&[], &SpendAllocation::new().with("TV", 100.0));
        assert_eq!(projection, Projection::default());
    }

    #[test]
    fn test_zero_history_channel_has_no_delta() {
        let channels = channels();
        let projection = project(&channels, &SpendAllocation::new().with("Podcast", 5_000.0));
        let podcast = projection.channel(&ChannelId::from("Podcast")).unwrap();

        assert_eq!(podcast.delta_pct, 0.0);
        assert_eq!(podcast.projected_contribution, 10_000.0);
        assert_eq!(podcast.channel_roi, 2.0);
    }

    #[test]
    fn test_compare_and_waterfall() {
        let channels = channels();
        let reference = SpendAllocation::historical(&channels);
        let candidate = reference.clone().with("TV", 800_000.0).with("Search", 450_000.0);

        let comparison = compare(&project(&channels, &reference), &project(&channels, &candidate));
        assert_eq!(comparison.spend_change_pct, 0.0);
        assert!(comparison.sales_change_pct > 0.0);

        let steps = waterfall(&channels, &reference, &candidate);
        let deltas: Vec<f64> = steps.iter().map(|s| s.delta).collect();
        assert_eq!(deltas, vec![-200_000.0, 200_000.0, 0.0]);

        assert_eq!(compare(&Projection::default(), &Projection::default()), ProjectionComparison::default());
    }
}
