//! Run outputs: the per-interval ledger and the aggregate result.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::model::Action;

/// One row of per-interval output. The primary artifact for "what happened"
/// in a backtest; row order equals input interval order.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerRow {
    pub index: usize,

    pub interval_start_local: DateTime<FixedOffset>,
    pub interval_end_local: DateTime<FixedOffset>,
    pub interval_start_utc: Option<DateTime<Utc>>,
    pub interval_end_utc: Option<DateTime<Utc>>,

    pub location: String,
    pub market: String,

    pub lmp: f64,

    pub action: Action,

    pub requested_power_mw: f64,
    /// Realized power after power-capacity and SOC clipping.
    pub power_mw: f64,

    pub energy_from_grid_mwh: f64,
    pub energy_to_grid_mwh: f64,
    pub throughput_mwh: f64,

    pub soc_start: f64,
    pub soc_end: f64,

    pub pnl: f64,
    /// Running prefix sum of `pnl`.
    pub cum_pnl: f64,
}

/// Complete result of one backtest run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub ledger: Vec<LedgerRow>,
    pub total_pnl: f64,
    pub final_soc: f64,
}
