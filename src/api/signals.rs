//! Signal endpoints: dataset scans, stored-signal lifecycle, tracker
//! status and favorite pairs.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::engine::{
    compute_indicators, replay_all, scan, ReplayReport, ReplayResult, ScanOptions,
    DEFAULT_REPLAY_HORIZON,
};
use crate::error::{AppError, Result};
use crate::services::TrackerSummary;
use crate::types::{
    normalize_series, FavoritePair, SignalCandidate, SignalRecord, SignalStats, SignalStatus,
    TradingStyle,
};
use crate::util;

use super::{ApiResponse, AppState};

fn db_error(e: rusqlite::Error) -> AppError {
    AppError::Internal(e.to_string())
}

// =============================================================================
// Dataset Scan
// =============================================================================

/// Request body for a dataset scan.
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    /// Dataset folder to scan.
    pub folder: String,
    /// Single file inside the folder; the whole folder when omitted.
    #[serde(default)]
    pub file: Option<String>,
    /// Pair label for candidates; defaults to the folder name.
    #[serde(default)]
    pub pair: Option<String>,
    /// Trading style: active, relaxed, passive.
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub confidence_minimum: Option<f64>,
    #[serde(default)]
    pub rsi_oversold: Option<f64>,
    #[serde(default)]
    pub rsi_overbought: Option<f64>,
    #[serde(default)]
    pub risk_reward_ratio: Option<f64>,
    /// Replay horizon in bars.
    #[serde(default)]
    pub replay_horizon: Option<usize>,
    #[serde(default = "default_true")]
    pub replay: bool,
    #[serde(default)]
    pub persist: bool,
}

fn default_true() -> bool {
    true
}

/// Response for a dataset scan.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub pair: String,
    pub style: TradingStyle,
    pub bars: usize,
    pub candidates: Vec<SignalCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcomes: Option<Vec<ReplayResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReplayReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted: Option<Vec<SignalRecord>>,
}

/// POST /api/signals/scan
///
/// Scan a stored dataset for signal candidates, replay their outcomes
/// against the rest of the series and optionally persist them.
async fn scan_dataset(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ApiResponse<ScanResponse>>> {
    let style = request
        .style
        .as_deref()
        .and_then(TradingStyle::from_str)
        .unwrap_or_default();
    let pair = request
        .pair
        .clone()
        .unwrap_or_else(|| request.folder.clone())
        .to_uppercase();

    let candles = match &request.file {
        Some(file) => state.datasets.load_file(&request.folder, file)?,
        None => state.datasets.load_folder(&request.folder)?,
    };
    let candles = normalize_series(candles);
    let series = compute_indicators(candles)?;

    let mut options = ScanOptions::default();
    if let Some(minimum) = request.confidence_minimum {
        options.confidence_minimum = minimum;
    }
    options.rsi_oversold = request.rsi_oversold;
    options.rsi_overbought = request.rsi_overbought;
    options.risk_reward_ratio = request.risk_reward_ratio;

    let candidates = scan(&series, style, &options);
    info!(
        "Scanned {} ({} bars, {:?}): {} candidates",
        request.folder,
        series.len(),
        style,
        candidates.len()
    );

    let (outcomes, report) = if request.replay {
        let horizon = request.replay_horizon.unwrap_or(DEFAULT_REPLAY_HORIZON);
        let results = replay_all(series.candles(), &candidates, horizon);
        let report = ReplayReport::from_results(&results);
        (Some(results), Some(report))
    } else {
        (None, None)
    };

    let persisted = if request.persist {
        let mut records = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            let record = SignalRecord::from_candidate(&pair, style, candidate);
            state.store.insert(&record).map_err(db_error)?;
            records.push(record);
        }
        info!("Persisted {} signals for {}", records.len(), pair);
        Some(records)
    } else {
        None
    };

    Ok(Json(ApiResponse::new(ScanResponse {
        pair,
        style,
        bars: series.len(),
        candidates,
        outcomes,
        report,
        persisted,
    })))
}

// =============================================================================
// Stored Signals
// =============================================================================

/// Query params for listing signals.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub pair: Option<String>,
    /// Status filter: OPEN, HIT_TP, HIT_SL, EXPIRED, CANCELLED.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

fn default_list_limit() -> usize {
    100
}

/// GET /api/signals
async fn list_signals(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<SignalRecord>>>> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(SignalStatus::from_str(raw).ok_or_else(|| {
            AppError::BadRequest(format!("invalid signal status: {}", raw))
        })?),
        None => None,
    };

    let limit = query.limit.clamp(1, 1000);
    let records = state.store.list(query.pair.as_deref(), status, limit);
    Ok(Json(ApiResponse::new(records)))
}

/// GET /api/signals/stats
async fn get_stats(State(state): State<AppState>) -> Json<ApiResponse<SignalStats>> {
    Json(ApiResponse::new(state.store.stats()))
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("invalid signal id: {}", raw)))
}

/// GET /api/signals/:id
async fn get_signal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SignalRecord>>> {
    let id = parse_id(&id)?;
    let record = state
        .store
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("signal not found: {}", id)))?;

    Ok(Json(ApiResponse::new(record)))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub id: String,
}

/// DELETE /api/signals/:id
async fn delete_signal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DeleteResponse>>> {
    let parsed = parse_id(&id)?;
    let deleted = state.store.delete(&parsed).map_err(db_error)?;
    if !deleted {
        return Err(AppError::NotFound(format!("signal not found: {}", id)));
    }

    Ok(Json(ApiResponse::new(DeleteResponse { deleted, id })))
}

/// POST /api/signals/:id/cancel
///
/// Cancel an open signal. The exit price is the last tracked price for
/// the pair when one is known.
async fn cancel_signal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SignalRecord>>> {
    let id = parse_id(&id)?;
    let record = state
        .store
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("signal not found: {}", id)))?;

    let exit_price = state.tracker.price(&record.pair);
    let closed = state
        .store
        .close(&id, SignalStatus::Cancelled, exit_price)
        .map_err(db_error)?
        .ok_or_else(|| AppError::BadRequest(format!("signal already closed: {}", id)))?;

    info!("Cancelled signal {} for {}", id, closed.pair);
    Ok(Json(ApiResponse::new(closed)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/scan", post(scan_dataset))
        .route("/", get(list_signals))
        .route("/stats", get(get_stats))
        .route("/:id", get(get_signal))
        .route("/:id", delete(delete_signal))
        .route("/:id/cancel", post(cancel_signal))
}

// =============================================================================
// Tracker
// =============================================================================

/// GET /api/tracker/status
async fn tracker_status(State(state): State<AppState>) -> Json<ApiResponse<TrackerSummary>> {
    Json(ApiResponse::new(state.tracker.summary()))
}

pub fn tracker_router() -> Router<AppState> {
    Router::new().route("/status", get(tracker_status))
}

// =============================================================================
// Favorites
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    pub pair: String,
}

/// GET /api/favorites
async fn list_favorites(State(state): State<AppState>) -> Json<ApiResponse<Vec<FavoritePair>>> {
    Json(ApiResponse::new(state.store.list_favorites()))
}

/// POST /api/favorites
async fn add_favorite(
    State(state): State<AppState>,
    Json(request): Json<FavoriteRequest>,
) -> Result<Json<ApiResponse<FavoritePair>>> {
    let pair = request.pair.trim().to_uppercase();
    if !util::validate_symbol(&pair) {
        return Err(AppError::BadRequest(format!(
            "invalid trading pair: {}",
            request.pair
        )));
    }

    state.store.add_favorite(&pair).map_err(db_error)?;
    Ok(Json(ApiResponse::new(FavoritePair {
        pair,
        added_at: chrono::Utc::now().timestamp_millis(),
    })))
}

/// DELETE /api/favorites/:pair
async fn remove_favorite(
    State(state): State<AppState>,
    Path(pair): Path<String>,
) -> Result<Json<ApiResponse<DeleteResponse>>> {
    let pair = pair.to_uppercase();
    let removed = state.store.remove_favorite(&pair).map_err(db_error)?;
    if !removed {
        return Err(AppError::NotFound(format!("favorite not found: {}", pair)));
    }

    Ok(Json(ApiResponse::new(DeleteResponse {
        deleted: removed,
        id: pair,
    })))
}

pub fn favorites_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_favorites))
        .route("/", post(add_favorite))
        .route("/:pair", delete(remove_favorite))
}
