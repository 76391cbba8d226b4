//! Battery parameters, state, and single-interval dispatch physics.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Physical and economic parameters of the battery, immutable over a run.
///
/// Units:
/// - `energy_capacity_mwh`: MWh
/// - `power_capacity_mw`: MW (one limit for both directions)
/// - efficiencies: fraction in (0, 1]
/// - SOC bounds: fraction of capacity in [0, 1]
/// - `degradation_cost_per_mwh`: $/MWh of grid-side throughput
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BatteryParams {
    pub energy_capacity_mwh: f64,
    pub power_capacity_mw: f64,
    pub charge_efficiency: f64,
    pub discharge_efficiency: f64,
    pub min_soc: f64,
    pub max_soc: f64,
    #[serde(default)]
    pub degradation_cost_per_mwh: f64,
}

/// Mutable battery state. Everything else derives from the SOC.
#[derive(Debug, Clone, Copy)]
pub struct BatteryState {
    /// State of charge as a fraction of energy capacity.
    pub soc: f64,
}

/// Convenience wrapper bundling params and state for one run.
///
/// A battery is owned exclusively by a single run; concurrent runs each get
/// their own instance.
#[derive(Debug, Clone)]
pub struct Battery {
    pub params: BatteryParams,
    pub state: BatteryState,
}

/// Requested power setpoint for one interval.
///
/// Convention: positive MW discharges to the grid, negative charges from it,
/// zero idles.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Dispatch {
    pub power_mw: f64,
}

/// What happened in one interval.
#[derive(Debug, Clone, Copy)]
pub struct IntervalResult {
    /// Realized power (may be clipped below the request).
    pub power_mw: f64,
    /// Grid-side energy pulled while charging.
    pub energy_from_grid_mwh: f64,
    /// Grid-side energy delivered while discharging.
    pub energy_to_grid_mwh: f64,
    /// `energy_from_grid_mwh + energy_to_grid_mwh`; at most one is nonzero.
    pub throughput_mwh: f64,
    pub soc_start: f64,
    pub soc_end: f64,
    /// $ for this interval, including the degradation charge.
    pub pnl: f64,
}

/// Outcome of the pure single-interval physics.
///
/// Shared by the live battery and the dispatch planner so that a planned
/// trajectory and its engine replay cannot diverge.
#[derive(Debug, Clone, Copy)]
pub struct StepOutcome {
    pub next_soc: f64,
    pub power_mw: f64,
    pub energy_from_grid_mwh: f64,
    pub energy_to_grid_mwh: f64,
    pub pnl: f64,
}

impl BatteryParams {
    /// Validates the parameter set.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidBattery` naming the offending field.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.energy_capacity_mwh <= 0.0 {
            return Err(CoreError::InvalidBattery(
                "energy_capacity_mwh must be > 0".to_string(),
            ));
        }
        if self.power_capacity_mw <= 0.0 {
            return Err(CoreError::InvalidBattery(
                "power_capacity_mw must be > 0".to_string(),
            ));
        }
        if self.charge_efficiency <= 0.0 || self.charge_efficiency > 1.0 {
            return Err(CoreError::InvalidBattery(
                "charge_efficiency must be in (0, 1]".to_string(),
            ));
        }
        if self.discharge_efficiency <= 0.0 || self.discharge_efficiency > 1.0 {
            return Err(CoreError::InvalidBattery(
                "discharge_efficiency must be in (0, 1]".to_string(),
            ));
        }
        if self.min_soc < 0.0
            || self.min_soc > 1.0
            || self.max_soc < 0.0
            || self.max_soc > 1.0
            || self.min_soc > self.max_soc
        {
            return Err(CoreError::InvalidBattery(
                "min_soc/max_soc must satisfy 0 <= min_soc <= max_soc <= 1".to_string(),
            ));
        }
        if self.degradation_cost_per_mwh < 0.0 {
            return Err(CoreError::InvalidBattery(
                "degradation_cost_per_mwh must be >= 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Interval PnL from the grid-side energies.
    ///
    /// Charging buys at the LMP, discharging sells at it; degradation is
    /// charged per MWh of total throughput. A negative LMP therefore makes
    /// charging profitable.
    pub fn interval_pnl(&self, lmp: f64, energy_from_grid_mwh: f64, energy_to_grid_mwh: f64) -> f64 {
        let revenue = lmp * energy_to_grid_mwh;
        let cost = lmp * energy_from_grid_mwh;
        let degradation =
            self.degradation_cost_per_mwh * (energy_from_grid_mwh + energy_to_grid_mwh);
        revenue - cost - degradation
    }

    /// Applies one dispatch from `soc` without mutating anything.
    ///
    /// The request is clipped by the power capacity first, then by the SOC
    /// headroom for the interval; the surviving grid-side energy moves
    /// through the directional efficiency and the resulting SOC is snapped
    /// back into `[min_soc, max_soc]` to absorb float drift.
    pub fn simulate_interval(
        &self,
        soc: f64,
        desired_power_mw: f64,
        lmp: f64,
        duration_hours: f64,
    ) -> StepOutcome {
        let mut power = desired_power_mw.clamp(-self.power_capacity_mw, self.power_capacity_mw);

        let mut energy_from_grid = 0.0;
        let mut energy_to_grid = 0.0;
        let mut next_soc = soc;

        if power < 0.0 {
            // Charging: |power| is MW drawn from the grid.
            let mut req_from_grid = power.abs() * duration_hours;
            let storable_mwh = ((self.max_soc - soc) * self.energy_capacity_mwh).max(0.0);
            let limit_by_soc = storable_mwh / self.charge_efficiency;
            let limit_by_power = self.power_capacity_mw * duration_hours;
            let max_from_grid = limit_by_soc.min(limit_by_power);
            if req_from_grid > max_from_grid {
                req_from_grid = max_from_grid;
                power = -req_from_grid / duration_hours;
            }
            let stored_mwh = req_from_grid * self.charge_efficiency;
            next_soc = (soc * self.energy_capacity_mwh + stored_mwh) / self.energy_capacity_mwh;
            energy_from_grid = req_from_grid;
        } else if power > 0.0 {
            // Discharging: power is MW delivered to the grid.
            let mut req_to_grid = power * duration_hours;
            let withdrawable_mwh = ((soc - self.min_soc) * self.energy_capacity_mwh).max(0.0);
            let limit_by_soc = withdrawable_mwh * self.discharge_efficiency;
            let limit_by_power = self.power_capacity_mw * duration_hours;
            let max_to_grid = limit_by_soc.min(limit_by_power);
            if req_to_grid > max_to_grid {
                req_to_grid = max_to_grid;
                power = req_to_grid / duration_hours;
            }
            let withdrawn_mwh = req_to_grid / self.discharge_efficiency;
            next_soc = (soc * self.energy_capacity_mwh - withdrawn_mwh) / self.energy_capacity_mwh;
            energy_to_grid = req_to_grid;
        }

        next_soc = next_soc.clamp(self.min_soc, self.max_soc);

        StepOutcome {
            next_soc,
            power_mw: power,
            energy_from_grid_mwh: energy_from_grid,
            energy_to_grid_mwh: energy_to_grid,
            pnl: self.interval_pnl(lmp, energy_from_grid, energy_to_grid),
        }
    }
}

impl Battery {
    /// Creates a battery with validated parameters and initial SOC.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidBattery` if any parameter is out of range
    /// or the initial SOC falls outside `[min_soc, max_soc]`.
    pub fn new(params: BatteryParams, initial_soc: f64) -> Result<Self, CoreError> {
        params.validate()?;
        if initial_soc < params.min_soc || initial_soc > params.max_soc {
            return Err(CoreError::InvalidBattery(
                "initial SOC must be within [min_soc, max_soc]".to_string(),
            ));
        }
        Ok(Self {
            params,
            state: BatteryState { soc: initial_soc },
        })
    }

    /// Current state of charge.
    pub fn soc(&self) -> f64 {
        self.state.soc
    }

    /// Enforces the power limit without applying SOC constraints.
    pub fn clip_dispatch(&self, d: Dispatch) -> Dispatch {
        Dispatch {
            power_mw: d
                .power_mw
                .clamp(-self.params.power_capacity_mw, self.params.power_capacity_mw),
        }
    }

    /// Applies a dispatch for a single interval, enforcing power capacity
    /// and SOC bounds by clipping the requested power.
    ///
    /// # Arguments
    ///
    /// * `lmp` - $/MWh for the interval
    /// * `d` - Requested power setpoint
    /// * `duration_hours` - Interval length in hours (must be > 0)
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NonPositiveDuration` when `duration_hours <= 0`.
    pub fn apply_dispatch(
        &mut self,
        lmp: f64,
        d: Dispatch,
        duration_hours: f64,
    ) -> Result<IntervalResult, CoreError> {
        if duration_hours <= 0.0 {
            return Err(CoreError::NonPositiveDuration);
        }

        let soc_start = self.state.soc;
        let out = self
            .params
            .simulate_interval(soc_start, d.power_mw, lmp, duration_hours);
        self.state.soc = out.next_soc;

        Ok(IntervalResult {
            power_mw: out.power_mw,
            energy_from_grid_mwh: out.energy_from_grid_mwh,
            energy_to_grid_mwh: out.energy_to_grid_mwh,
            throughput_mwh: out.energy_from_grid_mwh + out.energy_to_grid_mwh,
            soc_start,
            soc_end: out.next_soc,
            pnl: out.pnl,
        })
    }
}
