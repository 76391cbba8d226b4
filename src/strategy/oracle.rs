//! Perfect-foresight dispatch planner.
//!
//! Computes a dispatch plan up-front by dynamic programming on a discretized
//! SOC grid, using the exact same interval physics as the live battery, then
//! replays the plan by index during the run. Each calendar day (by
//! `interval_start_local`) is optimized independently so the planner cannot
//! hoard energy across days; day N+1 starts from the SOC day N's plan
//! actually ends at, so the planned and replayed trajectories agree.

use crate::error::CoreError;
use crate::model::{BatteryParams, Dispatch, PricedInterval};

use super::DecideContext;

/// Discretization knobs for the planner. Higher is more accurate and slower.
#[derive(Debug, Clone, Copy)]
pub struct OracleParams {
    /// SOC discretization between `[min_soc, max_soc]`; 0 means the default
    /// of 200, and values below 2 are raised to 2.
    pub soc_steps: usize,
    /// Action discretization between `[-power_capacity, +power_capacity]`;
    /// 0 means the default of 10.
    pub power_steps: usize,
}

impl Default for OracleParams {
    fn default() -> Self {
        Self {
            soc_steps: 200,
            power_steps: 10,
        }
    }
}

/// Plan produced before the run and replayed by interval index.
#[derive(Debug, Clone)]
pub struct OracleStrategy {
    plan: Vec<Dispatch>,
    planned_pnl: f64,
}

impl OracleStrategy {
    /// Plans dispatch over the full interval sequence.
    ///
    /// # Arguments
    ///
    /// * `intervals` - Chronologically ordered intervals for one node
    /// * `params` - Battery parameters the plan must respect
    /// * `initial_soc` - SOC at the start of the first day
    /// * `cfg` - Grid resolution
    ///
    /// # Errors
    ///
    /// Fails on an empty sequence, a non-positive interval duration, or a
    /// plan that does not cover the sequence 1:1.
    pub fn new(
        intervals: &[PricedInterval],
        params: BatteryParams,
        initial_soc: f64,
        cfg: OracleParams,
    ) -> Result<Self, CoreError> {
        if intervals.is_empty() {
            return Err(CoreError::NoIntervals);
        }
        let soc_steps = (if cfg.soc_steps == 0 { 200 } else { cfg.soc_steps }).max(2);
        let power_steps = if cfg.power_steps == 0 {
            10
        } else {
            cfg.power_steps
        };

        let mut plan = Vec::with_capacity(intervals.len());
        let mut planned_pnl = 0.0;
        let mut soc = initial_soc;

        for (offset, day) in day_slices(intervals) {
            let (day_plan, day_pnl) = plan_day(day, &params, soc, soc_steps, power_steps, offset)?;
            // Replay the day's plan through the shared physics to find the
            // SOC the next day actually starts from.
            for (it, d) in day.iter().zip(&day_plan) {
                soc = params
                    .simulate_interval(soc, d.power_mw, it.lmp, it.duration_hours())
                    .next_soc;
            }
            planned_pnl += day_pnl;
            plan.extend(day_plan);
        }

        if plan.len() != intervals.len() {
            return Err(CoreError::PlanLengthMismatch {
                plan: plan.len(),
                intervals: intervals.len(),
            });
        }

        Ok(Self { plan, planned_pnl })
    }

    /// Replays the planned dispatch for this interval; idle past the plan.
    pub fn decide(&self, ctx: &DecideContext<'_>) -> Dispatch {
        self.plan.get(ctx.index).copied().unwrap_or_default()
    }

    /// The full plan, indexed 1:1 with the planned intervals.
    pub fn plan(&self) -> &[Dispatch] {
        &self.plan
    }

    /// Total PnL the value tables assign to the plan.
    pub fn planned_pnl(&self) -> f64 {
        self.planned_pnl
    }
}

/// Linear SOC grid over `[min_soc, max_soc]` with `steps + 1` states.
#[derive(Debug, Clone, Copy)]
struct SocGrid {
    min_soc: f64,
    max_soc: f64,
    steps: usize,
}

impl SocGrid {
    fn n_states(&self) -> usize {
        self.steps + 1
    }

    /// Nearest state index, clamped at the endpoints.
    fn index_of(&self, soc: f64) -> usize {
        if soc <= self.min_soc {
            return 0;
        }
        if soc >= self.max_soc {
            return self.steps;
        }
        let f = (soc - self.min_soc) / (self.max_soc - self.min_soc);
        (f * self.steps as f64).round() as usize
    }

    fn soc_at(&self, idx: usize) -> f64 {
        if idx == 0 {
            return self.min_soc;
        }
        if idx >= self.steps {
            return self.max_soc;
        }
        let f = idx as f64 / self.steps as f64;
        self.min_soc + f * (self.max_soc - self.min_soc)
    }
}

/// Splits a chronologically ordered sequence into per-day slices, keyed by
/// the local calendar date of each interval's start, and tags each slice
/// with its offset into the full sequence.
fn day_slices(intervals: &[PricedInterval]) -> Vec<(usize, &[PricedInterval])> {
    let mut slices = Vec::new();
    let mut start = 0;
    for i in 1..intervals.len() {
        if intervals[i].local_date() != intervals[start].local_date() {
            slices.push((start, &intervals[start..i]));
            start = i;
        }
    }
    slices.push((start, &intervals[start..]));
    slices
}

/// Optimizes one day on the SOC x action grid.
///
/// Forward value iteration: `dp[s]` is the best cumulative PnL reaching
/// state `s` after the processed prefix. Each transition is scored with the
/// shared interval physics and recorded with a backpointer to the state it
/// came from; the plan is the argmax path walked back from the best final
/// state, so its value equals the reported optimum.
fn plan_day(
    intervals: &[PricedInterval],
    params: &BatteryParams,
    initial_soc: f64,
    soc_steps: usize,
    power_steps: usize,
    base_index: usize,
) -> Result<(Vec<Dispatch>, f64), CoreError> {
    let grid = SocGrid {
        min_soc: params.min_soc,
        max_soc: params.max_soc,
        steps: soc_steps,
    };
    let n_states = grid.n_states();

    let mut dp = vec![f64::NEG_INFINITY; n_states];
    let mut next = vec![f64::NEG_INFINITY; n_states];
    let init_idx = grid.index_of(initial_soc);
    dp[init_idx] = 0.0;

    // back[t][ns] = (previous state, realized power) on the best path
    // reaching ns after interval t.
    let mut back: Vec<Vec<Option<(usize, f64)>>> = Vec::with_capacity(intervals.len());

    // Evenly spaced signed actions from -Pmax to +Pmax, always including 0.
    let step = params.power_capacity_mw / power_steps as f64;
    let actions: Vec<f64> = (-(power_steps as i64)..=power_steps as i64)
        .map(|k| k as f64 * step)
        .collect();

    for (t, it) in intervals.iter().enumerate() {
        let dt = it.duration_hours();
        if dt <= 0.0 {
            return Err(CoreError::at_interval(
                base_index + t,
                CoreError::NonPositiveDuration,
            ));
        }

        next.fill(f64::NEG_INFINITY);
        let mut back_t: Vec<Option<(usize, f64)>> = vec![None; n_states];

        for s in 0..n_states {
            if !dp[s].is_finite() {
                continue;
            }
            let soc = grid.soc_at(s);
            for &action in &actions {
                let out = params.simulate_interval(soc, action, it.lmp, dt);
                let ns = grid.index_of(out.next_soc);
                let v = dp[s] + out.pnl;
                if v > next[ns] {
                    next[ns] = v;
                    back_t[ns] = Some((s, out.power_mw));
                }
            }
        }

        std::mem::swap(&mut dp, &mut next);
        back.push(back_t);
    }

    // Best final state is the day's optimum.
    let (mut cur, best) = dp
        .iter()
        .enumerate()
        .fold((init_idx, f64::NEG_INFINITY), |acc, (i, &v)| {
            if v > acc.1 { (i, v) } else { acc }
        });

    let mut plan = vec![Dispatch::default(); intervals.len()];
    for t in (0..intervals.len()).rev() {
        match back[t][cur] {
            Some((prev, power_mw)) => {
                plan[t] = Dispatch { power_mw };
                cur = prev;
            }
            // Unreachable state; guarded in the forward pass and not
            // expected here. Hold state and idle.
            None => plan[t] = Dispatch::default(),
        }
    }

    Ok((plan, best))
}
