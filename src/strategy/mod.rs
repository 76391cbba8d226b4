//! Dispatch strategies: decision contract, typed construction specs, and the
//! strategy variants themselves.

pub mod oracle;
pub mod schedule;

pub use oracle::{OracleParams, OracleStrategy};
pub use schedule::{ScheduleParams, ScheduleStrategy};

use crate::error::CoreError;
use crate::model::{Battery, BatteryParams, Dispatch, PricedInterval};

/// Read-only snapshot of the battery handed to a strategy each interval.
#[derive(Debug, Clone, Copy)]
pub struct BatteryView {
    /// Current state of charge.
    pub soc: f64,
    /// The run's battery parameters.
    pub params: BatteryParams,
}

impl BatteryView {
    /// Captures the view for the current interval.
    pub fn of(battery: &Battery) -> Self {
        Self {
            soc: battery.state.soc,
            params: battery.params,
        }
    }
}

/// Everything a strategy may consult when deciding one interval.
#[derive(Debug, Clone, Copy)]
pub struct DecideContext<'a> {
    /// Position of the interval in the run, starting at 0.
    pub index: usize,
    pub interval: &'a PricedInterval,
    pub battery: BatteryView,
}

/// Typed construction parameters, one variant per strategy.
#[derive(Debug, Clone)]
pub enum StrategySpec {
    Schedule(ScheduleParams),
    Oracle(OracleParams),
}

/// A dispatch policy.
///
/// `Schedule` is stateless clock rules; `Oracle` consumes the full interval
/// sequence up-front and replays a plan by index. Modeled as a tagged
/// variant rather than a trait object so construction stays a plain match.
#[derive(Debug, Clone)]
pub enum Strategy {
    Schedule(ScheduleStrategy),
    Oracle(OracleStrategy),
}

impl Strategy {
    /// Builds a strategy from its spec.
    ///
    /// The Oracle plans against the whole interval sequence starting from the
    /// battery's current SOC; schedule power defaults to the battery's power
    /// capacity.
    ///
    /// # Errors
    ///
    /// Propagates validation errors from the underlying constructor.
    pub fn from_spec(
        spec: &StrategySpec,
        intervals: &[PricedInterval],
        battery: &Battery,
    ) -> Result<Self, CoreError> {
        match spec {
            StrategySpec::Schedule(params) => Ok(Self::Schedule(ScheduleStrategy::new(
                params,
                battery.params.power_capacity_mw,
            )?)),
            StrategySpec::Oracle(params) => Ok(Self::Oracle(OracleStrategy::new(
                intervals,
                battery.params,
                battery.state.soc,
                *params,
            )?)),
        }
    }

    /// Stable strategy name as used at the configuration boundary.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Schedule(_) => "schedule",
            Self::Oracle(_) => "oracle",
        }
    }

    /// Requested power for one interval.
    pub fn decide(&self, ctx: &DecideContext<'_>) -> Dispatch {
        match self {
            Self::Schedule(s) => s.decide(ctx),
            Self::Oracle(o) => o.decide(ctx),
        }
    }
}
