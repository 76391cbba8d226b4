//! Operating-mode tag derived from realized power.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Human-friendly operating mode for one interval.
///
/// The string values are stable; they appear verbatim in CSV and JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Charging,
    Idle,
    Discharging,
}

impl Action {
    /// Derives the tag from the sign of the realized power.
    ///
    /// Negative power charges from the grid, positive discharges to it.
    pub fn from_power_mw(power_mw: f64) -> Self {
        if power_mw < 0.0 {
            Self::Charging
        } else if power_mw > 0.0 {
            Self::Discharging
        } else {
            Self::Idle
        }
    }

    /// Stable string form used in the CSV ledger.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Charging => "CHARGING",
            Self::Idle => "IDLE",
            Self::Discharging => "DISCHARGING",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
