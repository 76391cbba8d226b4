//! Backtest engine: drives the per-interval loop and emits the ledger.

use crate::error::CoreError;
use crate::model::{Action, Battery, PricedInterval};
use crate::strategy::{BatteryView, DecideContext, Strategy};

use super::types::{LedgerRow, RunResult};

/// Executes a backtest over a single-node interval series.
///
/// The loop is strictly sequential: the battery is a serial state machine,
/// so intervals are never processed out of order or in parallel. For each
/// interval the strategy is asked for a dispatch, the battery applies it
/// under its physical constraints, and a ledger row records the outcome with
/// the running cumulative PnL.
///
/// # Errors
///
/// Fails fast, returning no partial ledger, when:
/// - the interval sequence is empty
/// - an interval's derived duration is zero or negative
/// - the strategy returns a non-finite power
pub fn run(
    intervals: &[PricedInterval],
    battery: &mut Battery,
    strategy: &Strategy,
) -> Result<RunResult, CoreError> {
    if intervals.is_empty() {
        return Err(CoreError::NoIntervals);
    }

    let mut ledger = Vec::with_capacity(intervals.len());
    let mut cum = 0.0;

    for (index, it) in intervals.iter().enumerate() {
        let dt = it.duration_hours();
        if dt <= 0.0 {
            return Err(CoreError::at_interval(index, CoreError::NonPositiveDuration));
        }

        let req = strategy.decide(&DecideContext {
            index,
            interval: it,
            battery: BatteryView::of(battery),
        });
        if !req.power_mw.is_finite() {
            return Err(CoreError::NonFinitePower {
                index,
                power: req.power_mw,
            });
        }

        let res = battery
            .apply_dispatch(it.lmp, req, dt)
            .map_err(|e| CoreError::at_interval(index, e))?;
        cum += res.pnl;

        ledger.push(LedgerRow {
            index,

            interval_start_local: it.start_local,
            interval_end_local: it.end_local,
            interval_start_utc: it.start_utc,
            interval_end_utc: it.end_utc,

            location: it.location.clone(),
            market: it.market.clone(),

            lmp: it.lmp,

            action: Action::from_power_mw(res.power_mw),

            requested_power_mw: req.power_mw,
            power_mw: res.power_mw,

            energy_from_grid_mwh: res.energy_from_grid_mwh,
            energy_to_grid_mwh: res.energy_to_grid_mwh,
            throughput_mwh: res.throughput_mwh,

            soc_start: res.soc_start,
            soc_end: res.soc_end,

            pnl: res.pnl,
            cum_pnl: cum,
        });
    }

    Ok(RunResult {
        ledger,
        total_pnl: cum,
        final_soc: battery.state.soc,
    })
}
