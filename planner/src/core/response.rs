//! Constant-elasticity response model
//!
//! `contribution = c0 * (s / s0)^e`, calibrated so a channel at its
//! historical spend returns exactly its historical contribution. Elasticity
//! below 1 gives diminishing returns.

use serde::{Deserialize, Serialize};
use shared::{sanitize_amount, Channel};

/// Elasticity used when the model reported none for a channel
pub const FALLBACK_ELASTICITY: f64 = 0.1;

/// Smallest upper spend bound for sampled response curves
const MIN_CURVE_SPAN: f64 = 1_000.0;

/// Projected contribution at `candidate_spend`
///
/// Total over every input: a zero baseline keeps the contribution unchanged,
/// a non-finite elasticity falls back to [`FALLBACK_ELASTICITY`], and any
/// non-finite result becomes 0.
pub fn project(
    baseline_spend: f64,
    baseline_contribution: f64,
    elasticity: Option<f64>,
    candidate_spend: f64,
) -> f64 {
    let s0 = sanitize_amount(baseline_spend);
    let c0 = sanitize_amount(baseline_contribution);
    let s = sanitize_amount(candidate_spend);
    let e = effective_elasticity(elasticity);

    if s0 == 0.0 {
        return c0;
    }

    sanitize_amount(c0 * (s / s0).powf(e))
}

pub fn effective_elasticity(elasticity: Option<f64>) -> f64 {
    elasticity.filter(|e| e.is_finite()).unwrap_or(FALLBACK_ELASTICITY)
}

/// Project a channel at a candidate spend
pub fn project_channel(channel: &Channel, candidate_spend: f64) -> f64 {
    project(
        channel.historical_spend,
        channel.historical_contribution,
        channel.elasticity_mean(),
        candidate_spend,
    )
}

/// Return on the next unit of spend, `e * contribution / spend`
///
/// 0 when `spend` is not positive.
pub fn marginal_return(channel: &Channel, spend: f64) -> f64 {
    let spend = sanitize_amount(spend);
    if spend == 0.0 {
        return 0.0;
    }
    let e = effective_elasticity(channel.elasticity_mean());
    sanitize_amount(e * project_channel(channel, spend) / spend)
}

/// One sample of a channel response curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub spend: f64,
    pub contribution: f64,
    pub marginal_return: f64,
    /// Sample closest to the historical spend
    pub is_current: bool,
}

/// Sample `points` evenly spaced spends from 0 to `max_multiplier` times
/// the historical spend
pub fn response_curve(channel: &Channel, max_multiplier: f64, points: usize) -> Vec<CurvePoint> {
    let points = points.max(2);
    let multiplier = if max_multiplier.is_finite() && max_multiplier > 0.0 {
        max_multiplier
    } else {
        1.0
    };
    let upper = (channel.historical_spend * multiplier).max(MIN_CURVE_SPAN);
    let step = upper / (points - 1) as f64;

    let mut curve: Vec<CurvePoint> = (0..points)
        .map(|i| {
            let spend = step * i as f64;
            CurvePoint {
                spend,
                contribution: project_channel(channel, spend),
                marginal_return: marginal_return(channel, spend),
                is_current: false,
            }
        })
        .collect();

    let closest = curve
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            let da = (a.spend - channel.historical_spend).abs();
            let db = (b.spend - channel.historical_spend).abs();
            da.total_cmp(&db)
        })
        .map(|(i, _)| i);
    if let Some(i) = closest {
        curve[i].is_current = true;
    }

    curve
}
