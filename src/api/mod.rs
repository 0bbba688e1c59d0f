pub mod datasets;
pub mod health;
pub mod market;
pub mod signals;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use serde::Serialize;

use crate::config::Config;
use crate::services::{DatasetStore, SignalStore, SignalTracker};
use crate::sources::BinanceClient;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<SignalStore>,
    pub tracker: Arc<SignalTracker>,
    pub datasets: Arc<DatasetStore>,
    pub binance: Arc<BinanceClient>,
    pub started_at: Instant,
}

/// API response wrapper matching frontend expectations.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub meta: ApiMeta,
}

#[derive(Debug, Serialize)]
pub struct ApiMeta {
    pub timestamp: i64,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            meta: ApiMeta {
                timestamp: chrono::Utc::now().timestamp_millis(),
            },
        }
    }
}

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/market", market::router())
        .nest("/api/signals", signals::router())
        .nest("/api/tracker", signals::tracker_router())
        .nest("/api/favorites", signals::favorites_router())
        .nest("/api/datasets", datasets::router())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_wraps_data_with_timestamp() {
        let response = ApiResponse::new(vec![1, 2, 3]);
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"data\":[1,2,3]"));
        assert!(json.contains("\"timestamp\":"));
        assert!(response.meta.timestamp > 0);
    }
}
