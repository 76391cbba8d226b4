//! Simulation engine, ledger types, and post-run aggregation.

pub mod engine;
pub mod summary;
pub mod types;

pub use engine::run;
pub use summary::{BacktestSummary, ChargeWindow, DischargeWindow, TimeWindow};
pub use types::{LedgerRow, RunResult};

use crate::error::CoreError;
use crate::model::{Battery, BatteryParams, PricedInterval};
use crate::strategy::{Strategy, StrategySpec};

/// Summary plus the full ledger for one backtest.
#[derive(Debug, Clone)]
pub struct BacktestOutcome {
    pub summary: BacktestSummary,
    pub result: RunResult,
}

/// Runs one backtest end to end: validate the battery, build the strategy,
/// drive the engine, and summarize.
///
/// # Arguments
///
/// * `intervals` - Chronologically ordered intervals for one node
/// * `params` - Battery parameters
/// * `initial_soc` - Starting SOC, within `[min_soc, max_soc]`
/// * `spec` - Strategy to run
///
/// # Errors
///
/// Propagates validation errors (bad battery, bad strategy parameters,
/// empty input) and run-time failures; no partial results are returned.
pub fn run_backtest(
    intervals: &[PricedInterval],
    params: BatteryParams,
    initial_soc: f64,
    spec: &StrategySpec,
) -> Result<BacktestOutcome, CoreError> {
    let mut battery = Battery::new(params, initial_soc)?;
    let strategy = Strategy::from_spec(spec, intervals, &battery)?;
    let result = engine::run(intervals, &mut battery, &strategy)?;
    let summary = BacktestSummary::from_result(&result);
    Ok(BacktestOutcome { summary, result })
}
