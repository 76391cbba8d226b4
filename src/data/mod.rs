//! Market-data collaborators: the Grid Status client, its response cache,
//! and an offline JSON loader.

pub mod cache;
pub mod gridstatus;
pub mod json;

pub use cache::ResponseCache;
pub use gridstatus::{GridStatusClient, GridStatusError, QueryLocationParams};
pub use json::load_gridstatus_json;

use thiserror::Error;

/// Failures while obtaining market data.
#[derive(Debug, Error)]
pub enum DataError {
    /// The upstream API answered with a stable error code.
    #[error("{0}")]
    Api(GridStatusError),

    /// Transport-level failure before any upstream answer.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A `"YYYY-MM-DD"` date string failed to parse.
    #[error("invalid {field} format (expected YYYY-MM-DD): {value:?}")]
    InvalidDate { field: &'static str, value: String },

    /// Local file could not be read.
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Local file held malformed JSON.
    #[error("cannot parse {path:?}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
