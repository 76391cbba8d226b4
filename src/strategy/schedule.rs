//! Daily clock-window strategy: charge and discharge at fixed local times.

use chrono::Timelike;

use crate::error::CoreError;
use crate::model::Dispatch;

use super::DecideContext;

/// Parameters for the schedule strategy.
///
/// Windows are half-open `[start, end)` in `"HH:MM"`, interpreted in the
/// dataset's `interval_start_local` timezone. Both ends may wrap across
/// midnight. Unset `charge_end` and `discharge_end` default to
/// `discharge_start` (making the discharge window empty unless supplied).
#[derive(Debug, Clone, Default)]
pub struct ScheduleParams {
    pub charge_start: String,
    pub charge_end: Option<String>,
    pub discharge_start: String,
    pub discharge_end: Option<String>,
    /// Magnitude; applied as a charge (negative) setpoint.
    pub charge_power_mw: Option<f64>,
    /// Magnitude; applied as a discharge (positive) setpoint.
    pub discharge_power_mw: Option<f64>,
}

/// Stateless clock-window policy.
///
/// Charge during the charge window, discharge during the discharge window,
/// otherwise idle. When the two windows overlap at a minute, charging wins
/// because its window is tested first.
#[derive(Debug, Clone)]
pub struct ScheduleStrategy {
    charge_start_min: u32,
    charge_end_min: u32,
    discharge_start_min: u32,
    discharge_end_min: u32,
    charge_power_mw: f64,
    discharge_power_mw: f64,
}

impl ScheduleStrategy {
    /// Parses and validates the window times and powers.
    ///
    /// # Arguments
    ///
    /// * `params` - Window times and power magnitudes
    /// * `default_power_mw` - Fallback magnitude (the battery's power capacity)
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTime` for malformed `"HH:MM"` strings and
    /// `CoreError::Config` for non-finite powers.
    pub fn new(params: &ScheduleParams, default_power_mw: f64) -> Result<Self, CoreError> {
        let charge_start_min = parse_hhmm(&params.charge_start)?;
        let discharge_start_min = parse_hhmm(&params.discharge_start)?;
        let charge_end_min = match params.charge_end.as_deref() {
            Some(s) if !s.trim().is_empty() => parse_hhmm(s)?,
            _ => discharge_start_min,
        };
        let discharge_end_min = match params.discharge_end.as_deref() {
            Some(s) if !s.trim().is_empty() => parse_hhmm(s)?,
            _ => discharge_start_min,
        };

        let charge_power_mw = params.charge_power_mw.unwrap_or(default_power_mw);
        let discharge_power_mw = params.discharge_power_mw.unwrap_or(default_power_mw);
        if !charge_power_mw.is_finite() {
            return Err(CoreError::config("charge_power_mw", "must be finite"));
        }
        if !discharge_power_mw.is_finite() {
            return Err(CoreError::config("discharge_power_mw", "must be finite"));
        }

        Ok(Self {
            charge_start_min,
            charge_end_min,
            discharge_start_min,
            discharge_end_min,
            charge_power_mw,
            discharge_power_mw,
        })
    }

    /// Requested power for the interval, from its local start time.
    pub fn decide(&self, ctx: &DecideContext<'_>) -> Dispatch {
        let start = &ctx.interval.start_local;
        let minute_of_day = start.hour() * 60 + start.minute();

        if in_window(minute_of_day, self.charge_start_min, self.charge_end_min) {
            return Dispatch {
                power_mw: -self.charge_power_mw.abs(),
            };
        }
        if in_window(
            minute_of_day,
            self.discharge_start_min,
            self.discharge_end_min,
        ) {
            return Dispatch {
                power_mw: self.discharge_power_mw.abs(),
            };
        }
        Dispatch { power_mw: 0.0 }
    }
}

/// Parses `"HH:MM"` into minutes since midnight.
fn parse_hhmm(s: &str) -> Result<u32, CoreError> {
    let trimmed = s.trim();
    let (h, m) = trimmed
        .split_once(':')
        .ok_or_else(|| CoreError::InvalidTime(s.to_string()))?;
    let hours: u32 = h
        .parse()
        .map_err(|_| CoreError::InvalidTime(s.to_string()))?;
    let minutes: u32 = m
        .parse()
        .map_err(|_| CoreError::InvalidTime(s.to_string()))?;
    if hours > 23 || minutes > 59 {
        return Err(CoreError::InvalidTime(s.to_string()));
    }
    Ok(hours * 60 + minutes)
}

/// Whether `t_min` lies in the half-open window `[start, end)` on a 24h clock.
///
/// `start == end` is an empty window. `start > end` wraps across midnight.
fn in_window(t_min: u32, start: u32, end: u32) -> bool {
    if start == end {
        return false;
    }
    if start < end {
        return t_min >= start && t_min < end;
    }
    // wrap
    t_min >= start || t_min < end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Battery, BatteryParams, PricedInterval};
    use crate::strategy::{BatteryView, DecideContext};
    use chrono::DateTime;

    fn params() -> ScheduleParams {
        ScheduleParams {
            charge_start: "22:00".to_string(),
            charge_end: Some("02:00".to_string()),
            discharge_start: "10:00".to_string(),
            discharge_end: Some("14:00".to_string()),
            charge_power_mw: Some(5.0),
            discharge_power_mw: Some(5.0),
        }
    }

    fn interval_at(local: &str) -> PricedInterval {
        let start = DateTime::parse_from_rfc3339(local).expect("timestamp parses");
        PricedInterval {
            start_local: start,
            end_local: start + chrono::Duration::hours(1),
            start_utc: None,
            end_utc: None,
            market: String::new(),
            location: String::new(),
            location_type: String::new(),
            lmp: 0.0,
            energy: 0.0,
            congestion: 0.0,
            loss: 0.0,
        }
    }

    fn decide_at(strategy: &ScheduleStrategy, local: &str) -> f64 {
        let battery = Battery::new(
            BatteryParams {
                energy_capacity_mwh: 10.0,
                power_capacity_mw: 5.0,
                charge_efficiency: 1.0,
                discharge_efficiency: 1.0,
                min_soc: 0.0,
                max_soc: 1.0,
                degradation_cost_per_mwh: 0.0,
            },
            0.5,
        )
        .expect("valid battery");
        let interval = interval_at(local);
        let ctx = DecideContext {
            index: 0,
            interval: &interval,
            battery: BatteryView::of(&battery),
        };
        strategy.decide(&ctx).power_mw
    }

    #[test]
    fn parses_hhmm() {
        assert_eq!(parse_hhmm("00:00").ok(), Some(0));
        assert_eq!(parse_hhmm("23:59").ok(), Some(23 * 60 + 59));
        assert_eq!(parse_hhmm(" 07:30 ").ok(), Some(7 * 60 + 30));
        assert!(parse_hhmm("24:00").is_err());
        assert!(parse_hhmm("12:60").is_err());
        assert!(parse_hhmm("noon").is_err());
        assert!(parse_hhmm("12").is_err());
    }

    #[test]
    fn wrap_around_window_matches_both_sides_of_midnight() {
        let s = ScheduleStrategy::new(&params(), 5.0).expect("valid schedule");
        assert_eq!(decide_at(&s, "2024-03-01T22:30:00-05:00"), -5.0);
        assert_eq!(decide_at(&s, "2024-03-01T01:30:00-05:00"), -5.0);
        assert_eq!(decide_at(&s, "2024-03-01T02:00:00-05:00"), 0.0);
        assert_eq!(decide_at(&s, "2024-03-01T21:59:00-05:00"), 0.0);
    }

    #[test]
    fn discharge_window_is_positive_power() {
        let s = ScheduleStrategy::new(&params(), 5.0).expect("valid schedule");
        assert_eq!(decide_at(&s, "2024-03-01T11:00:00-05:00"), 5.0);
        assert_eq!(decide_at(&s, "2024-03-01T14:00:00-05:00"), 0.0);
    }

    #[test]
    fn equal_endpoints_make_an_empty_window() {
        let mut p = params();
        p.charge_start = "06:00".to_string();
        p.charge_end = Some("06:00".to_string());
        let s = ScheduleStrategy::new(&p, 5.0).expect("valid schedule");
        assert_eq!(decide_at(&s, "2024-03-01T06:00:00-05:00"), 0.0);
    }

    #[test]
    fn charge_takes_precedence_when_windows_overlap() {
        let p = ScheduleParams {
            charge_start: "08:00".to_string(),
            charge_end: Some("12:00".to_string()),
            discharge_start: "10:00".to_string(),
            discharge_end: Some("16:00".to_string()),
            charge_power_mw: Some(3.0),
            discharge_power_mw: Some(4.0),
        };
        let s = ScheduleStrategy::new(&p, 5.0).expect("valid schedule");
        assert_eq!(decide_at(&s, "2024-03-01T11:00:00-05:00"), -3.0);
    }

    #[test]
    fn end_defaults_fall_back_to_discharge_start() {
        let p = ScheduleParams {
            charge_start: "01:00".to_string(),
            charge_end: None,
            discharge_start: "05:00".to_string(),
            discharge_end: None,
            charge_power_mw: Some(2.0),
            discharge_power_mw: Some(2.0),
        };
        let s = ScheduleStrategy::new(&p, 5.0).expect("valid schedule");
        // Charge runs 01:00..05:00; discharge window is empty.
        assert_eq!(decide_at(&s, "2024-03-01T04:59:00-05:00"), -2.0);
        assert_eq!(decide_at(&s, "2024-03-01T05:00:00-05:00"), 0.0);
    }

    #[test]
    fn power_defaults_to_battery_capacity() {
        let p = ScheduleParams {
            charge_start: "01:00".to_string(),
            charge_end: Some("02:00".to_string()),
            discharge_start: "05:00".to_string(),
            discharge_end: Some("06:00".to_string()),
            charge_power_mw: None,
            discharge_power_mw: None,
        };
        let s = ScheduleStrategy::new(&p, 7.5).expect("valid schedule");
        assert_eq!(decide_at(&s, "2024-03-01T01:30:00-05:00"), -7.5);
    }

    #[test]
    fn rejects_malformed_time() {
        let mut p = params();
        p.charge_start = "25:00".to_string();
        assert!(ScheduleStrategy::new(&p, 5.0).is_err());
    }

    #[test]
    fn rejects_non_finite_power() {
        let mut p = params();
        p.charge_power_mw = Some(f64::NAN);
        assert!(ScheduleStrategy::new(&p, 5.0).is_err());
    }
}
