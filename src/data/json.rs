//! Offline loader for saved Grid Status JSON responses.

use std::fs;
use std::path::Path;

use crate::model::LmpResponse;

use super::DataError;

/// Reads a Grid Status query response previously saved to disk.
///
/// # Errors
///
/// `DataError::Io` if the file cannot be read, `DataError::Json` if it does
/// not hold a valid response payload.
pub fn load_gridstatus_json(path: &Path) -> Result<LmpResponse, DataError> {
    let raw = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| DataError::Json {
        path: path.display().to_string(),
        source,
    })
}
