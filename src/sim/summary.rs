//! Post-hoc aggregation: run totals and per-day charge/discharge windows.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;

use super::types::{LedgerRow, RunResult};

/// A local-time range.
#[derive(Debug, Clone, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// Span of one day's charging, first to last charging interval, with the
/// energy-weighted average purchase price.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeWindow {
    #[serde(flatten)]
    pub window: TimeWindow,
    /// Energy-weighted mean LMP over the charged energy.
    pub average_cost_per_mwh: f64,
    pub energy_mwh: f64,
}

/// Span of one day's discharging with the energy-weighted average sale price.
#[derive(Debug, Clone, Serialize)]
pub struct DischargeWindow {
    #[serde(flatten)]
    pub window: TimeWindow,
    /// Energy-weighted mean LMP over the discharged energy.
    pub average_price_per_mwh: f64,
    pub energy_mwh: f64,
}

/// Aggregated backtest results.
///
/// Computed post-hoc from the ledger so step data and reported metrics
/// cannot disagree.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestSummary {
    pub total_pnl: f64,
    pub final_soc: f64,
    pub total_intervals: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backtest_window: Option<TimeWindow>,
    pub energy_charged_mwh: f64,
    pub energy_discharged_mwh: f64,
    /// Per-day charge windows in ascending day order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub charge_windows: Vec<ChargeWindow>,
    /// Per-day discharge windows in ascending day order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub discharge_windows: Vec<DischargeWindow>,
}

/// Accumulator for one day's windows; `lmp_energy` carries the sum of
/// lmp * energy for the weighted mean.
#[derive(Debug, Clone)]
struct WindowAccum {
    window: TimeWindow,
    lmp_energy: f64,
    energy_mwh: f64,
}

impl WindowAccum {
    fn start(row: &LedgerRow, energy_mwh: f64) -> Self {
        Self {
            window: TimeWindow {
                start: row.interval_start_local,
                end: row.interval_end_local,
            },
            lmp_energy: row.lmp * energy_mwh,
            energy_mwh,
        }
    }

    fn extend(&mut self, row: &LedgerRow, energy_mwh: f64) {
        self.window.end = row.interval_end_local;
        self.lmp_energy += row.lmp * energy_mwh;
        self.energy_mwh += energy_mwh;
    }

    fn average(&self) -> f64 {
        if self.energy_mwh > 0.0 {
            self.lmp_energy / self.energy_mwh
        } else {
            0.0
        }
    }
}

impl BacktestSummary {
    /// Computes the summary from a completed run.
    ///
    /// Rows that moved energy are grouped into one window per local calendar
    /// day and direction, spanning the first to the last such interval of the
    /// day; intermediate idle intervals are not represented separately.
    pub fn from_result(result: &RunResult) -> Self {
        if result.ledger.is_empty() {
            return Self {
                total_pnl: result.total_pnl,
                final_soc: result.final_soc,
                total_intervals: 0,
                backtest_window: None,
                energy_charged_mwh: 0.0,
                energy_discharged_mwh: 0.0,
                charge_windows: Vec::new(),
                discharge_windows: Vec::new(),
            };
        }

        let mut charge_total = 0.0;
        let mut discharge_total = 0.0;
        let mut charge_days: BTreeMap<NaiveDate, WindowAccum> = BTreeMap::new();
        let mut discharge_days: BTreeMap<NaiveDate, WindowAccum> = BTreeMap::new();

        for row in &result.ledger {
            let day = row.interval_start_local.date_naive();

            if row.energy_from_grid_mwh > 0.0 {
                charge_total += row.energy_from_grid_mwh;
                charge_days
                    .entry(day)
                    .and_modify(|w| w.extend(row, row.energy_from_grid_mwh))
                    .or_insert_with(|| WindowAccum::start(row, row.energy_from_grid_mwh));
            }

            if row.energy_to_grid_mwh > 0.0 {
                discharge_total += row.energy_to_grid_mwh;
                discharge_days
                    .entry(day)
                    .and_modify(|w| w.extend(row, row.energy_to_grid_mwh))
                    .or_insert_with(|| WindowAccum::start(row, row.energy_to_grid_mwh));
            }
        }

        let charge_windows = charge_days
            .into_values()
            .map(|w| ChargeWindow {
                average_cost_per_mwh: w.average(),
                energy_mwh: w.energy_mwh,
                window: w.window,
            })
            .collect();
        let discharge_windows = discharge_days
            .into_values()
            .map(|w| DischargeWindow {
                average_price_per_mwh: w.average(),
                energy_mwh: w.energy_mwh,
                window: w.window,
            })
            .collect();

        let first = &result.ledger[0];
        let last = &result.ledger[result.ledger.len() - 1];

        Self {
            total_pnl: result.total_pnl,
            final_soc: result.final_soc,
            total_intervals: result.ledger.len(),
            backtest_window: Some(TimeWindow {
                start: first.interval_start_local,
                end: last.interval_end_local,
            }),
            energy_charged_mwh: charge_total,
            energy_discharged_mwh: discharge_total,
            charge_windows,
            discharge_windows,
        }
    }
}
