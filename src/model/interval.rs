//! Market-data interval types mirroring the Grid Status LMP dataset.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Envelope of a Grid Status LMP query response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmpResponse {
    /// Upstream HTTP status echoed in the payload.
    #[serde(default)]
    pub status_code: Option<u16>,
    /// Interval rows, chronologically ordered for one location.
    #[serde(default)]
    pub data: Vec<PricedInterval>,
}

/// One priced interval at a single grid node.
///
/// Timestamps arrive as RFC3339 strings with offsets. The UTC pair is
/// preferred for durations because it is unambiguous across DST changes;
/// the local pair drives calendar-day grouping and clock-window matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricedInterval {
    #[serde(rename = "interval_start_local")]
    pub start_local: DateTime<FixedOffset>,
    #[serde(rename = "interval_end_local")]
    pub end_local: DateTime<FixedOffset>,
    #[serde(rename = "interval_start_utc", default)]
    pub start_utc: Option<DateTime<Utc>>,
    #[serde(rename = "interval_end_utc", default)]
    pub end_utc: Option<DateTime<Utc>>,

    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub location_type: String,

    /// Locational marginal price in $/MWh. May be negative.
    pub lmp: f64,
    /// LMP components; propagated to outputs but not used by the core math.
    #[serde(default)]
    pub energy: f64,
    #[serde(default)]
    pub congestion: f64,
    #[serde(default)]
    pub loss: f64,
}

impl PricedInterval {
    /// Interval length, preferring the UTC pair.
    pub fn duration(&self) -> Duration {
        match (self.start_utc, self.end_utc) {
            (Some(start), Some(end)) => end - start,
            _ => self.end_local - self.start_local,
        }
    }

    /// Interval length in hours.
    pub fn duration_hours(&self) -> f64 {
        self.duration().num_milliseconds() as f64 / 3_600_000.0
    }

    /// Calendar day of the interval start in its own local offset.
    pub fn local_date(&self) -> NaiveDate {
        self.start_local.date_naive()
    }
}
