//! Boundary JSON types for the HTTP facade.

use serde::{Deserialize, Serialize};

use crate::config::{BatteryOverrides, StrategyConfig};
use crate::sim::{BacktestSummary, LedgerRow};

/// Request body for `POST /api/v1/backtest`.
#[derive(Debug, Clone, Deserialize)]
pub struct BacktestRequest {
    pub data_source: DataSourceConfig,
    pub config: BacktestConfig,
    #[serde(default)]
    pub options: BacktestOptions,
}

/// Where to fetch market data from.
#[derive(Debug, Clone, Deserialize)]
pub struct DataSourceConfig {
    /// Only `"gridstatus"` is supported.
    #[serde(rename = "type")]
    pub source_type: String,
    pub dataset_id: String,
    pub location_id: String,
    /// `"YYYY-MM-DD"`.
    pub start_date: String,
    /// `"YYYY-MM-DD"`.
    pub end_date: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Battery and strategy configuration carried in a request.
///
/// `battery_file` names a preset under the server's battery directory;
/// inline battery fields override it field by field. The strategy may be
/// omitted only inside compare variations, which inherit the base config's.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BacktestConfig {
    #[serde(default)]
    pub battery_file: Option<String>,
    #[serde(default)]
    pub battery: BatteryOverrides,
    #[serde(default)]
    pub strategy: Option<StrategyConfig>,
}

/// Optional request knobs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BacktestOptions {
    /// Truncate to the first N intervals; 0 or absent means all.
    #[serde(default)]
    pub limit_intervals: Option<usize>,
    /// Include the full per-interval ledger in the response.
    #[serde(default)]
    pub include_ledger: bool,
}

/// Response body for `POST /api/v1/backtest`.
#[derive(Debug, Serialize)]
pub struct BacktestResponse {
    pub status: &'static str,
    pub summary: BacktestSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger: Option<Vec<LedgerRow>>,
}

/// Request body for `POST /api/v1/backtest/compare`.
#[derive(Debug, Clone, Deserialize)]
pub struct CompareBacktestRequest {
    pub data_source: DataSourceConfig,
    pub base_config: BacktestConfig,
    pub variations: Vec<BacktestVariation>,
}

/// One configuration variation to compare.
#[derive(Debug, Clone, Deserialize)]
pub struct BacktestVariation {
    pub name: String,
    #[serde(default)]
    pub config: BacktestConfig,
}

/// Response body for the comparison endpoint. Failed variations are
/// dropped, not reported.
#[derive(Debug, Serialize)]
pub struct CompareBacktestResponse {
    pub comparison: Vec<ComparisonResult>,
}

#[derive(Debug, Serialize)]
pub struct ComparisonResult {
    pub name: String,
    pub summary: BacktestSummary,
}

/// Query parameters for `GET /api/v1/rank`.
#[derive(Debug, Deserialize)]
pub struct RankQuery {
    pub dataset_id: String,
    pub start_date: String,
    pub end_date: String,
    /// Comma-separated location ids.
    #[serde(default)]
    pub location_ids: Option<String>,
    /// Maximum rankings to return; default 10.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Response body for the ranking endpoint, best node first.
#[derive(Debug, Serialize)]
pub struct RankResponse {
    pub rankings: Vec<Ranking>,
}

#[derive(Debug, Serialize)]
pub struct Ranking {
    pub rank: usize,
    pub location: String,
    pub market: String,
    pub count: usize,
    pub spread_p95_p05: f64,
    pub min_lmp: f64,
    pub max_lmp: f64,
    pub oracle_profit: f64,
}

/// Strategy catalog entry for `GET /api/v1/strategies`.
#[derive(Debug, Serialize)]
pub struct StrategyInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParameterInfo>,
}

#[derive(Debug, Serialize)]
pub struct ParameterInfo {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub param_type: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

/// Error envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
