//! Ranking nodes by canonical oracle profit.

use std::collections::HashMap;

use crate::model::PricedInterval;

use super::potential::{compute_potential, ArbitragePotential};

/// Computes the potential for every location and sorts descending by
/// `oracle_profit`.
pub fn rank_by_oracle_profit(
    by_location: &HashMap<String, Vec<PricedInterval>>,
) -> Vec<ArbitragePotential> {
    let mut out: Vec<ArbitragePotential> = by_location
        .values()
        .map(|intervals| compute_potential(intervals))
        .collect();
    out.sort_by(|a, b| {
        b.oracle_profit
            .partial_cmp(&a.oracle_profit)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    out
}
