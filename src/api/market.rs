//! Live-market endpoints backed by the Binance REST API.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::{blend_opinions, compute_indicators, scan, BlendedOpinion, ScanOptions};
use crate::error::{AppError, Result};
use crate::types::{normalize_series, Candle, Direction, SignalCandidate, TradingStyle};
use crate::util;

use super::{ApiResponse, AppState};

const DEFAULT_INTERVAL: &str = "1h";
const DEFAULT_KLINE_LIMIT: u32 = 500;

/// Query params for the klines endpoint.
#[derive(Debug, Deserialize)]
pub struct KlinesQuery {
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Response for fetched klines.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KlinesResponse {
    pub symbol: String,
    pub interval: String,
    pub candles: Vec<Candle>,
}

/// GET /api/market/klines/:symbol
async fn get_klines(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<KlinesQuery>,
) -> Result<Json<ApiResponse<KlinesResponse>>> {
    let interval = query.interval.unwrap_or_else(|| DEFAULT_INTERVAL.into());
    let limit = query.limit.unwrap_or(DEFAULT_KLINE_LIMIT);

    let candles = state.binance.get_klines(&symbol, &interval, limit).await?;

    Ok(Json(ApiResponse::new(KlinesResponse {
        symbol: symbol.to_uppercase(),
        interval,
        candles,
    })))
}

/// Response for the latest price of a symbol.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResponse {
    pub symbol: String,
    pub price: f64,
    pub formatted: String,
}

/// GET /api/market/price/:symbol
async fn get_price(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<PriceResponse>>> {
    let price = state.binance.get_price(&symbol).await?;
    let symbol = symbol.to_uppercase();
    state.tracker.update_price(&symbol, price);

    Ok(Json(ApiResponse::new(PriceResponse {
        formatted: util::format_price(price),
        symbol,
        price,
    })))
}

/// Query params for live analysis.
#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    /// Trading style: active, relaxed, passive.
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub confidence_minimum: Option<f64>,
    /// Direction of an external second opinion: buy or sell.
    #[serde(default)]
    pub opinion_direction: Option<String>,
    #[serde(default)]
    pub opinion_confidence: Option<f64>,
}

/// Indicator values at the most recent bar.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSnapshot {
    pub close: f64,
    pub rsi: f64,
    pub ema_fast: f64,
    pub ema_mid: f64,
    pub ema_slow: f64,
    pub atr: f64,
}

/// Response for live analysis of a symbol.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub symbol: String,
    pub interval: String,
    pub style: TradingStyle,
    pub bars: usize,
    pub snapshot: IndicatorSnapshot,
    pub candidates: Vec<SignalCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blended: Option<BlendedOpinion>,
}

/// GET /api/market/analyze/:symbol
///
/// Fetch klines, annotate them with indicators and scan for signal
/// candidates. When a second opinion is supplied the strongest
/// candidate is blended with it.
async fn analyze(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<AnalyzeQuery>,
) -> Result<Json<ApiResponse<AnalyzeResponse>>> {
    let interval = query.interval.clone().unwrap_or_else(|| DEFAULT_INTERVAL.into());
    let limit = query.limit.unwrap_or(DEFAULT_KLINE_LIMIT);
    let style = query
        .style
        .as_deref()
        .and_then(TradingStyle::from_str)
        .unwrap_or_default();

    let opinion = parse_opinion(&query)?;

    let candles = state.binance.get_klines(&symbol, &interval, limit).await?;
    let candles = normalize_series(candles);
    if candles.is_empty() {
        return Err(AppError::ExternalApi(format!(
            "Binance returned no klines for {}",
            symbol
        )));
    }

    let series = compute_indicators(candles)?;

    let mut options = ScanOptions::default();
    if let Some(minimum) = query.confidence_minimum {
        options.confidence_minimum = minimum;
    }
    let candidates = scan(&series, style, &options);

    let profile = style.profile();
    let last = series.len() - 1;
    let snapshot = IndicatorSnapshot {
        close: series.candle(last).close,
        rsi: series.rsi(profile.rsi_period)?[last],
        ema_fast: series.ema(profile.ema_fast)?[last],
        ema_mid: series.ema(profile.ema_mid)?[last],
        ema_slow: series.ema(profile.ema_slow)?[last],
        atr: series.atr()[last],
    };

    // The blend needs a technical side to argue with; without any
    // candidate there is nothing to combine.
    let blended = match (opinion, candidates.first()) {
        (Some((direction, confidence)), Some(best)) => Some(blend_opinions(
            best.direction,
            best.confidence,
            direction,
            confidence,
        )),
        _ => None,
    };

    info!(
        "Analyzed {} {} ({} bars): {} candidates",
        symbol,
        interval,
        series.len(),
        candidates.len()
    );

    Ok(Json(ApiResponse::new(AnalyzeResponse {
        symbol: symbol.to_uppercase(),
        interval,
        style,
        bars: series.len(),
        snapshot,
        candidates,
        blended,
    })))
}

fn parse_opinion(query: &AnalyzeQuery) -> Result<Option<(Direction, f64)>> {
    let direction = match query.opinion_direction.as_deref() {
        Some(raw) => Direction::from_str(raw).ok_or_else(|| {
            AppError::BadRequest(format!("invalid opinion direction: {}", raw))
        })?,
        None => return Ok(None),
    };

    let confidence = query.opinion_confidence.unwrap_or(0.5);
    if !(0.0..=1.0).contains(&confidence) {
        return Err(AppError::BadRequest(format!(
            "opinion confidence out of range: {}",
            confidence
        )));
    }

    Ok(Some((direction, confidence)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/klines/:symbol", get(get_klines))
        .route("/price/:symbol", get(get_price))
        .route("/analyze/:symbol", get(analyze))
}
