//! Typed errors surfaced at the core boundary.

use thiserror::Error;

/// Errors produced by battery validation, strategy construction, and the
/// backtest run loop.
///
/// Validation variants fail before any interval is processed; the runtime
/// variants abort a run in progress. Partial results are never returned.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Battery parameters or initial SOC rejected at construction.
    #[error("{0}")]
    InvalidBattery(String),

    /// A `"HH:MM"` time string failed to parse.
    #[error("invalid time {0:?}, expected HH:MM")]
    InvalidTime(String),

    /// Strategy name not recognized.
    #[error("unsupported strategy {0:?}")]
    UnknownStrategy(String),

    /// The interval sequence was empty.
    #[error("no intervals")]
    NoIntervals,

    /// An interval's derived duration was zero or negative.
    #[error("duration_hours must be > 0")]
    NonPositiveDuration,

    /// A lower-level failure tagged with the interval it occurred at.
    #[error("interval {index}: {source}")]
    AtInterval {
        index: usize,
        #[source]
        source: Box<CoreError>,
    },

    /// The strategy returned NaN or infinite power.
    #[error("strategy returned non-finite power {power} at interval {index}")]
    NonFinitePower { index: usize, power: f64 },

    /// A dispatch plan did not cover the interval sequence 1:1.
    #[error("plan length ({plan}) does not match intervals length ({intervals})")]
    PlanLengthMismatch { plan: usize, intervals: usize },

    /// Configuration field failed validation.
    #[error("config error: {field} — {message}")]
    Config { field: String, message: String },
}

impl CoreError {
    /// Shorthand for a configuration error with a field path and constraint.
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Wraps an error with the interval index it occurred at.
    pub fn at_interval(index: usize, source: CoreError) -> Self {
        Self::AtInterval {
            index,
            source: Box::new(source),
        }
    }
}
