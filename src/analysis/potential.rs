//! Node-level arbitrage potential: price statistics plus a canonical
//! perfect-foresight profit score.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::PricedInterval;

/// Battery-agnostic summary of one node's arbitrage opportunity.
///
/// `oracle_profit` is the profit a canonical battery would earn under
/// perfect foresight over the whole series: 1 MW power, 1 MWh energy, 100%
/// efficiency both ways, no degradation, SOC bounds [0, 1], initial SOC 0.5,
/// dispatch choices {-1, 0, +1} MW each interval. It is intended only for
/// comparing nodes, not for sizing a real battery.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArbitragePotential {
    pub location: String,
    pub market: String,

    pub start_utc: Option<DateTime<Utc>>,
    pub end_utc: Option<DateTime<Utc>>,

    pub count: usize,

    pub min_lmp: f64,
    pub max_lmp: f64,
    pub mean_lmp: f64,
    pub p05_lmp: f64,
    pub p95_lmp: f64,

    pub spread_p95_p05: f64,

    pub oracle_profit: f64,
}

/// Computes the potential for one node's interval series.
pub fn compute_potential(intervals: &[PricedInterval]) -> ArbitragePotential {
    if intervals.is_empty() {
        return ArbitragePotential::default();
    }

    let mut sum = 0.0;
    let mut min_lmp = f64::INFINITY;
    let mut max_lmp = f64::NEG_INFINITY;
    let mut values = Vec::with_capacity(intervals.len());
    for it in intervals {
        let v = it.lmp;
        values.push(v);
        sum += v;
        min_lmp = min_lmp.min(v);
        max_lmp = max_lmp.max(v);
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let p05_lmp = percentile_sorted(&values, 0.05);
    let p95_lmp = percentile_sorted(&values, 0.95);

    ArbitragePotential {
        location: intervals[0].location.clone(),
        market: intervals[0].market.clone(),
        start_utc: intervals[0].start_utc,
        end_utc: intervals[intervals.len() - 1].end_utc,
        count: intervals.len(),
        min_lmp,
        max_lmp,
        mean_lmp: sum / intervals.len() as f64,
        p05_lmp,
        p95_lmp,
        spread_p95_p05: p95_lmp - p05_lmp,
        oracle_profit: oracle_profit_canonical(intervals),
    }
}

/// Percentile by linear interpolation between order statistics at
/// `q * (n - 1)`.
fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if q <= 0.0 {
        return sorted[0];
    }
    if q >= 1.0 {
        return sorted[sorted.len() - 1];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = pos - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

/// Perfect-foresight profit for the canonical battery via a dense DP.
///
/// With 1 MW and 1 MWh, a full-power interval moves exactly `dt` MWh, so the
/// SOC discretizes into steps of `dt` and the only transitions are idle,
/// charge one step, or discharge one step. Unlike the backtest Oracle, this
/// runs over the whole series rather than per day, yielding an upper bound.
///
/// The score is the value of ending back at the initial SOC. A round trip
/// nets zero energy, so a constant price earns nothing and shifting every
/// price by a constant leaves the score unchanged; selling off the starting
/// inventory would credit the node for the price level instead of its
/// volatility.
fn oracle_profit_canonical(intervals: &[PricedInterval]) -> f64 {
    if intervals.is_empty() {
        return 0.0;
    }
    let dt = intervals[0].duration_hours();
    if dt <= 0.0 {
        return 0.0;
    }
    let steps = (1.0 / dt).round().max(1.0) as usize;
    let n_states = steps + 1;

    let mut dp = vec![f64::NEG_INFINITY; n_states];
    let mut next = vec![f64::NEG_INFINITY; n_states];
    let init = ((0.5 * steps as f64).round() as usize).min(steps);
    dp[init] = 0.0;

    for it in intervals {
        next.fill(f64::NEG_INFINITY);
        let price = it.lmp;

        for soc_idx in 0..n_states {
            if !dp[soc_idx].is_finite() {
                continue;
            }

            // Idle
            if dp[soc_idx] > next[soc_idx] {
                next[soc_idx] = dp[soc_idx];
            }

            // Charge: buy dt MWh, SOC rises one step.
            if soc_idx < steps {
                let v = dp[soc_idx] - price * dt;
                if v > next[soc_idx + 1] {
                    next[soc_idx + 1] = v;
                }
            }

            // Discharge: sell dt MWh, SOC falls one step.
            if soc_idx > 0 {
                let v = dp[soc_idx] + price * dt;
                if v > next[soc_idx - 1] {
                    next[soc_idx - 1] = v;
                }
            }
        }

        std::mem::swap(&mut dp, &mut next);
    }

    let best = dp[init];
    if best.is_finite() { best } else { 0.0 }
}
