//! Request handlers for the API endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use tracing::warn;

use crate::analysis::rank_by_oracle_profit;
use crate::config;
use crate::data::DataError;
use crate::error::CoreError;
use crate::model::PricedInterval;
use crate::sim;
use crate::strategy::StrategySpec;

use super::types::{
    BacktestConfig, BacktestRequest, BacktestResponse, CompareBacktestRequest,
    CompareBacktestResponse, ComparisonResult, DataSourceConfig, ErrorDetail, ErrorResponse,
    ParameterInfo, RankQuery, RankResponse, Ranking, StrategyInfo,
};
use super::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: message.into(),
                details,
            },
        }),
    )
}

/// Maps data-layer failures onto the error envelope, forwarding upstream
/// codes and rate-limit hints.
fn data_error_response(err: DataError) -> ApiError {
    match err {
        DataError::Api(e) => {
            let status = match e.status_code {
                401 | 403 => StatusCode::UNAUTHORIZED,
                429 => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::BAD_REQUEST,
            };
            let details = json!({
                "status_code": e.status_code,
                "retry_after": e.retry_after,
            });
            error_response(status, e.code, e.message, Some(details))
        }
        other => error_response(
            StatusCode::BAD_REQUEST,
            "DATA_FETCH_ERROR",
            other.to_string(),
            None,
        ),
    }
}

/// Maps core failures: validation problems get their specific code, anything
/// that aborted a run surfaces as a generic `BACKTEST_ERROR`.
fn core_error_response(err: CoreError) -> ApiError {
    match &err {
        CoreError::InvalidBattery(_) => error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_BATTERY",
            err.to_string(),
            None,
        ),
        CoreError::InvalidTime(_) | CoreError::UnknownStrategy(_) | CoreError::Config { .. } => {
            error_response(
                StatusCode::BAD_REQUEST,
                "INVALID_CONFIG",
                err.to_string(),
                None,
            )
        }
        CoreError::NoIntervals => error_response(
            StatusCode::BAD_REQUEST,
            "NO_INTERVALS",
            "no intervals in the requested range",
            None,
        ),
        _ => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "BACKTEST_ERROR",
            err.to_string(),
            None,
        ),
    }
}

async fn fetch_intervals(
    state: &AppState,
    ds: &DataSourceConfig,
) -> Result<Vec<PricedInterval>, ApiError> {
    if ds.source_type != "gridstatus" {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "DATA_FETCH_ERROR",
            format!("unsupported data source type: {}", ds.source_type),
            None,
        ));
    }
    let response = state
        .client
        .query_location_by_date(&ds.dataset_id, &ds.location_id, &ds.start_date, &ds.end_date)
        .await
        .map_err(data_error_response)?;
    Ok(response.data)
}

/// Resolves a request config into battery params, initial SOC, and a
/// strategy spec, loading the named preset when one is given.
fn resolve_config(
    state: &AppState,
    cfg: &BacktestConfig,
) -> Result<(crate::model::BatteryParams, f64, StrategySpec), ApiError> {
    let mut overrides = cfg.battery.clone();
    if let Some(ref battery_file) = cfg.battery_file {
        let path = state.battery_dir.join(format!("{battery_file}.toml"));
        match config::load_battery_file(&path) {
            Ok(preset) => overrides = overrides.over(&preset),
            // Inline values may still form a complete battery on their own.
            Err(e) => warn!(path = %path.display(), error = %e, "battery preset not loaded"),
        }
    }

    let (params, initial_soc) = overrides.resolve().map_err(core_error_response)?;

    let strategy = cfg.strategy.as_ref().ok_or_else(|| {
        error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_CONFIG",
            "strategy.name is required",
            None,
        )
    })?;
    let spec = strategy.to_spec().map_err(core_error_response)?;

    Ok((params, initial_soc, spec))
}

/// Overlays a variation onto the base config: set battery fields win, a
/// variation's strategy replaces the base's entirely.
fn merge_config(base: &BacktestConfig, variation: &BacktestConfig) -> BacktestConfig {
    BacktestConfig {
        battery_file: variation
            .battery_file
            .clone()
            .or_else(|| base.battery_file.clone()),
        battery: variation.battery.over(&base.battery),
        strategy: variation.strategy.clone().or_else(|| base.strategy.clone()),
    }
}

/// Runs one backtest against fetched market data.
///
/// `POST /api/v1/backtest` → 200 + `BacktestResponse`
pub async fn run_backtest(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BacktestRequest>, JsonRejection>,
) -> Result<Json<BacktestResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| {
        error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_REQUEST",
            e.body_text(),
            None,
        )
    })?;

    let mut intervals = fetch_intervals(&state, &req.data_source).await?;
    if let Some(limit) = req.options.limit_intervals {
        if limit > 0 && limit < intervals.len() {
            intervals.truncate(limit);
        }
    }

    let (params, initial_soc, spec) = resolve_config(&state, &req.config)?;

    let outcome = sim::run_backtest(&intervals, params, initial_soc, &spec)
        .map_err(core_error_response)?;

    Ok(Json(BacktestResponse {
        status: "completed",
        ledger: req.options.include_ledger.then_some(outcome.result.ledger),
        summary: outcome.summary,
    }))
}

/// Runs every variation against one fetched dataset; variations that fail
/// to build or run are skipped rather than failing the request.
///
/// `POST /api/v1/backtest/compare` → 200 + `CompareBacktestResponse`
pub async fn compare_backtests(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CompareBacktestRequest>, JsonRejection>,
) -> Result<Json<CompareBacktestResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| {
        error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_REQUEST",
            e.body_text(),
            None,
        )
    })?;

    let intervals = fetch_intervals(&state, &req.data_source).await?;

    let mut comparison = Vec::with_capacity(req.variations.len());
    for variation in &req.variations {
        let merged = merge_config(&req.base_config, &variation.config);
        let resolved = match resolve_config(&state, &merged) {
            Ok(r) => r,
            Err(_) => {
                warn!(variation = %variation.name, "skipping variation with invalid config");
                continue;
            }
        };
        let (params, initial_soc, spec) = resolved;
        match sim::run_backtest(&intervals, params, initial_soc, &spec) {
            Ok(outcome) => comparison.push(ComparisonResult {
                name: variation.name.clone(),
                summary: outcome.summary,
            }),
            Err(e) => {
                warn!(variation = %variation.name, error = %e, "skipping failed variation");
            }
        }
    }

    Ok(Json(CompareBacktestResponse { comparison }))
}

/// Ranks the requested locations by canonical oracle profit.
///
/// `GET /api/v1/rank?dataset_id=..&start_date=..&end_date=..&location_ids=a,b` →
/// 200 + `RankResponse`
pub async fn rank_locations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RankQuery>,
) -> Result<Json<RankResponse>, ApiError> {
    let ids: Vec<String> = query
        .location_ids
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if ids.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_REQUEST",
            "location_ids is required",
            None,
        ));
    }

    let mut by_location: HashMap<String, Vec<PricedInterval>> = HashMap::with_capacity(ids.len());
    for id in &ids {
        let response = state
            .client
            .query_location_by_date(&query.dataset_id, id, &query.start_date, &query.end_date)
            .await
            .map_err(data_error_response)?;
        by_location.insert(id.clone(), response.data);
    }

    let limit = query.limit.unwrap_or(10);
    let rankings = rank_by_oracle_profit(&by_location)
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, p)| Ranking {
            rank: i + 1,
            location: p.location,
            market: p.market,
            count: p.count,
            spread_p95_p05: p.spread_p95_p05,
            min_lmp: p.min_lmp,
            max_lmp: p.max_lmp,
            oracle_profit: p.oracle_profit,
        })
        .collect();

    Ok(Json(RankResponse { rankings }))
}

/// Returns the strategy catalog.
///
/// `GET /api/v1/strategies` → 200 + `Vec<StrategyInfo>`
pub async fn list_strategies() -> Json<Vec<StrategyInfo>> {
    Json(vec![
        StrategyInfo {
            name: "schedule",
            description: "Charge and discharge during fixed daily clock windows",
            parameters: vec![
                ParameterInfo {
                    name: "charge_start",
                    param_type: "string",
                    description: "Charge window start, HH:MM local",
                    default: Some(json!("10:00")),
                },
                ParameterInfo {
                    name: "charge_end",
                    param_type: "string",
                    description: "Charge window end, HH:MM local",
                    default: None,
                },
                ParameterInfo {
                    name: "discharge_start",
                    param_type: "string",
                    description: "Discharge window start, HH:MM local",
                    default: Some(json!("17:00")),
                },
                ParameterInfo {
                    name: "discharge_end",
                    param_type: "string",
                    description: "Discharge window end, HH:MM local",
                    default: Some(json!("23:59")),
                },
                ParameterInfo {
                    name: "charge_power_mw",
                    param_type: "float",
                    description: "Charging magnitude; defaults to the battery's power capacity",
                    default: None,
                },
                ParameterInfo {
                    name: "discharge_power_mw",
                    param_type: "float",
                    description: "Discharging magnitude; defaults to the battery's power capacity",
                    default: None,
                },
            ],
        },
        StrategyInfo {
            name: "oracle",
            description: "Perfect-foresight dispatch via per-day dynamic programming",
            parameters: vec![
                ParameterInfo {
                    name: "soc_steps",
                    param_type: "int",
                    description: "SOC discretization between min_soc and max_soc",
                    default: Some(json!(200)),
                },
                ParameterInfo {
                    name: "power_steps",
                    param_type: "int",
                    description: "Action discretization per power direction",
                    default: Some(json!(10)),
                },
            ],
        },
    ])
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::config::BatteryOverrides;
    use crate::data::GridStatusClient;

    fn make_test_state() -> Arc<AppState> {
        Arc::new(AppState {
            // Deliberately empty key: the client fails fast before any
            // network traffic, which keeps these tests offline.
            client: GridStatusClient::new("", None, None),
            battery_dir: std::path::PathBuf::from("batteries"),
        })
    }

    fn backtest_body() -> String {
        r#"{
            "data_source": {
                "type": "gridstatus",
                "dataset_id": "caiso_lmp_real_time_5_min",
                "location_id": "MOSSLD_2_PSP1",
                "start_date": "2024-01-01",
                "end_date": "2024-01-02"
            },
            "config": { "strategy": { "name": "oracle" } }
        }"#
        .to_string()
    }

    #[tokio::test]
    async fn malformed_body_returns_invalid_request_envelope() {
        let app = router(make_test_state());
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/backtest")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn missing_api_key_maps_to_envelope_without_network() {
        let app = router(make_test_state());
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/backtest")
            .header("content-type", "application/json")
            .body(Body::from(backtest_body()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "MISSING_API_KEY");
    }

    #[tokio::test]
    async fn unsupported_data_source_is_rejected() {
        let app = router(make_test_state());
        let body = backtest_body().replace("gridstatus", "csv");
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/backtest")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"]["code"], "DATA_FETCH_ERROR");
    }

    #[tokio::test]
    async fn rank_requires_location_ids() {
        let app = router(make_test_state());
        let req = Request::builder()
            .uri("/api/v1/rank?dataset_id=d&start_date=2024-01-01&end_date=2024-01-02")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"]["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn strategies_catalog_lists_both_strategies() {
        let app = router(make_test_state());
        let req = Request::builder()
            .uri("/api/v1/strategies")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Vec<serde_json::Value> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json.len(), 2);
        assert_eq!(json[0]["name"], "schedule");
        assert_eq!(json[1]["name"], "oracle");
    }

    #[test]
    fn merge_config_overlays_battery_and_strategy() {
        let base = BacktestConfig {
            battery_file: Some("moss_landing".to_string()),
            battery: BatteryOverrides {
                energy_capacity_mwh: Some(400.0),
                power_capacity_mw: Some(100.0),
                ..Default::default()
            },
            strategy: Some(crate::config::StrategyConfig {
                name: "schedule".to_string(),
                params: Default::default(),
            }),
        };
        let variation = BacktestConfig {
            battery_file: None,
            battery: BatteryOverrides {
                power_capacity_mw: Some(50.0),
                ..Default::default()
            },
            strategy: None,
        };
        let merged = merge_config(&base, &variation);
        assert_eq!(merged.battery_file.as_deref(), Some("moss_landing"));
        assert_eq!(merged.battery.power_capacity_mw, Some(50.0));
        assert_eq!(merged.battery.energy_capacity_mwh, Some(400.0));
        assert_eq!(merged.strategy.map(|s| s.name).as_deref(), Some("schedule"));
    }
}
