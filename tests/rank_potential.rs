//! Ranking behavior across nodes.

mod common;

use std::collections::HashMap;

use bess_backtest::analysis::{compute_potential, rank_by_oracle_profit};
use bess_backtest::model::PricedInterval;

fn node(location: &str, lmps: &[f64]) -> Vec<PricedInterval> {
    common::hourly_series("2024-03-01T00:00:00-05:00", lmps)
        .into_iter()
        .map(|mut it| {
            it.location = location.to_string();
            it
        })
        .collect()
}

#[test]
fn offset_series_scores_identically() {
    let base: Vec<f64> = vec![12.0, 45.0, 23.0, 67.0, 18.0, 55.0, 30.0, 41.0];
    let offset: Vec<f64> = base.iter().map(|p| p + 250.0).collect();

    let p_a = compute_potential(&node("A", &base));
    let p_b = compute_potential(&node("B", &offset));

    assert!((p_a.oracle_profit - p_b.oracle_profit).abs() < 1e-9);
    assert!((p_a.spread_p95_p05 - p_b.spread_p95_p05).abs() < 1e-9);
    assert!((p_b.mean_lmp - p_a.mean_lmp - 250.0).abs() < 1e-9);
}

#[test]
fn ranking_orders_by_oracle_profit_descending() {
    let mut by_location = HashMap::new();
    by_location.insert("FLAT".to_string(), node("FLAT", &[30.0; 8]));
    by_location.insert(
        "MILD".to_string(),
        node("MILD", &[25.0, 35.0, 25.0, 35.0, 25.0, 35.0, 25.0, 35.0]),
    );
    by_location.insert(
        "WILD".to_string(),
        node("WILD", &[5.0, 95.0, 0.0, 120.0, -10.0, 90.0, 10.0, 100.0]),
    );

    let ranked = rank_by_oracle_profit(&by_location);
    let order: Vec<&str> = ranked.iter().map(|p| p.location.as_str()).collect();
    assert_eq!(order, vec!["WILD", "MILD", "FLAT"]);
    for pair in ranked.windows(2) {
        assert!(pair[0].oracle_profit >= pair[1].oracle_profit);
    }
}

#[test]
fn potential_carries_node_metadata() {
    let intervals = node("MOSSLD_2_PSP1", &[10.0, 20.0, 30.0, 40.0]);
    let p = compute_potential(&intervals);
    assert_eq!(p.location, "MOSSLD_2_PSP1");
    assert_eq!(p.market, "CAISO");
    assert_eq!(p.count, 4);
    assert_eq!(p.min_lmp, 10.0);
    assert_eq!(p.max_lmp, 40.0);
}
