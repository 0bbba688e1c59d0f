use std::env;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// SQLite database path for stored signals.
    pub database_path: String,
    /// Root directory for CSV datasets.
    pub dataset_root: String,
    /// Tracker sweep interval in seconds.
    pub tracker_interval_secs: u64,
    /// Whether to stream live Binance prices into the tracker.
    pub enable_price_stream: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3003),
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "candor.db".to_string()),
            dataset_root: env::var("DATASET_ROOT").unwrap_or_else(|_| "datasets".to_string()),
            tracker_interval_secs: env::var("TRACKER_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            enable_price_stream: env::var("ENABLE_PRICE_STREAM")
                .ok()
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3003,
            database_path: "candor.db".to_string(),
            dataset_root: "datasets".to_string(),
            tracker_interval_secs: 30,
            enable_price_stream: true,
        }
    }
}
