//! Shared builders for integration tests.

use bess_backtest::model::{BatteryParams, PricedInterval};
use chrono::DateTime;

/// Battery with symmetric efficiency, full SOC range, and no degradation.
pub fn battery(energy_capacity_mwh: f64, power_capacity_mw: f64, efficiency: f64) -> BatteryParams {
    BatteryParams {
        energy_capacity_mwh,
        power_capacity_mw,
        charge_efficiency: efficiency,
        discharge_efficiency: efficiency,
        min_soc: 0.0,
        max_soc: 1.0,
        degradation_cost_per_mwh: 0.0,
    }
}

/// One interval starting at the given RFC3339 local timestamp.
pub fn interval_at(start_local: &str, hours: i64, lmp: f64) -> PricedInterval {
    let start = DateTime::parse_from_rfc3339(start_local).expect("test timestamp should parse");
    PricedInterval {
        start_local: start,
        end_local: start + chrono::Duration::hours(hours),
        start_utc: None,
        end_utc: None,
        market: "CAISO".to_string(),
        location: "NODE_A".to_string(),
        location_type: String::new(),
        lmp,
        energy: 0.0,
        congestion: 0.0,
        loss: 0.0,
    }
}

/// Consecutive one-hour intervals starting at the given local timestamp.
pub fn hourly_series(start_local: &str, lmps: &[f64]) -> Vec<PricedInterval> {
    let start = DateTime::parse_from_rfc3339(start_local).expect("test timestamp should parse");
    lmps.iter()
        .enumerate()
        .map(|(i, &lmp)| {
            let s = start + chrono::Duration::hours(i as i64);
            PricedInterval {
                start_local: s,
                end_local: s + chrono::Duration::hours(1),
                start_utc: None,
                end_utc: None,
                market: "CAISO".to_string(),
                location: "NODE_A".to_string(),
                location_type: String::new(),
                lmp,
                energy: 0.0,
                congestion: 0.0,
                loss: 0.0,
            }
        })
        .collect()
}
