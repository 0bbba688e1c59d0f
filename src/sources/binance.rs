use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::types::Candle;
use crate::util;

const BINANCE_API_URL: &str = "https://api.binance.com/api/v3";
const MAX_KLINES: u32 = 1000;

/// Intervals Binance serves that the scanner understands.
pub const SUPPORTED_INTERVALS: &[&str] = &[
    "1m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "12h", "1d", "3d", "1w",
];

/// Binance price ticker response.
#[derive(Debug, Deserialize)]
struct BinancePrice {
    #[allow(dead_code)]
    symbol: String,
    price: String,
}

/// Binance REST client for klines and spot prices.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
}

impl BinanceClient {
    /// Create a new Binance client.
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent("Candor/1.0")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }

    /// Fetch up to `limit` klines for a symbol/interval as candles.
    pub async fn get_klines(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Candle>> {
        let symbol = checked_symbol(symbol)?;
        let interval = checked_interval(interval)?;
        let limit = limit.clamp(1, MAX_KLINES);

        let url = format!(
            "{}/klines?symbol={}&interval={}&limit={}",
            BINANCE_API_URL, symbol, interval, limit
        );
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let preview: String = text.chars().take(200).collect();
            warn!(
                "Binance klines request for {} returned {}: {}",
                symbol, status, preview
            );
            return Err(AppError::ExternalApi(format!(
                "Binance returned {} for {}",
                status, symbol
            )));
        }

        let rows: Vec<Vec<serde_json::Value>> = response.json().await?;
        let mut candles = Vec::with_capacity(rows.len());
        for row in &rows {
            match parse_kline(row) {
                Some(candle) => candles.push(candle),
                None => {
                    warn!("Skipping malformed kline row for {}", symbol);
                }
            }
        }
        debug!("Fetched {} klines for {} {}", candles.len(), symbol, interval);
        Ok(candles)
    }

    /// Fetch the latest spot price for a symbol.
    pub async fn get_price(&self, symbol: &str) -> Result<f64> {
        let symbol = checked_symbol(symbol)?;

        let url = format!("{}/ticker/price?symbol={}", BINANCE_API_URL, symbol);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::ExternalApi(format!(
                "Binance returned {} for {}",
                status, symbol
            )));
        }

        let ticker: BinancePrice = response.json().await?;
        ticker.price.parse::<f64>().map_err(|_| {
            AppError::ExternalApi(format!("unparseable Binance price: {}", ticker.price))
        })
    }
}

impl Default for BinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

fn checked_symbol(symbol: &str) -> Result<String> {
    let upper = symbol.trim().to_uppercase();
    if !util::validate_symbol(&upper) {
        return Err(AppError::BadRequest(format!(
            "invalid trading pair: {}",
            symbol
        )));
    }
    Ok(upper)
}

fn checked_interval(interval: &str) -> Result<&str> {
    SUPPORTED_INTERVALS
        .iter()
        .find(|i| **i == interval)
        .copied()
        .ok_or_else(|| AppError::BadRequest(format!("unsupported interval: {}", interval)))
}

/// A Binance kline row is a heterogeneous JSON array: open time in ms,
/// then OHLC and volume as strings.
fn parse_kline(row: &[serde_json::Value]) -> Option<Candle> {
    if row.len() < 6 {
        return None;
    }
    let open_time_ms = row[0].as_i64()?;
    let open_time = Utc.timestamp_millis_opt(open_time_ms).single()?;

    let number = |value: &serde_json::Value| -> Option<f64> {
        match value {
            serde_json::Value::String(s) => s.parse().ok(),
            serde_json::Value::Number(n) => n.as_f64(),
            _ => None,
        }
    };

    Some(Candle {
        open_time,
        open: number(&row[1])?,
        high: number(&row[2])?,
        low: number(&row[3])?,
        close: number(&row[4])?,
        volume: number(&row[5])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_kline_row() {
        let row = vec![
            json!(1700000000000i64),
            json!("42000.50"),
            json!("42150.00"),
            json!("41900.25"),
            json!("42100.00"),
            json!("1234.5"),
            json!(1700000059999i64),
        ];
        let candle = parse_kline(&row).unwrap();
        assert_eq!(candle.open_time.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(candle.open, 42000.50);
        assert_eq!(candle.high, 42150.0);
        assert_eq!(candle.low, 41900.25);
        assert_eq!(candle.close, 42100.0);
        assert_eq!(candle.volume, 1234.5);
    }

    #[test]
    fn test_parse_kline_accepts_bare_numbers() {
        let row = vec![
            json!(1700000000000i64),
            json!(100.0),
            json!(101.0),
            json!(99.0),
            json!(100.5),
            json!(12.0),
        ];
        let candle = parse_kline(&row).unwrap();
        assert_eq!(candle.close, 100.5);
    }

    #[test]
    fn test_parse_kline_rejects_short_rows() {
        let row = vec![json!(1700000000000i64), json!("100.0")];
        assert!(parse_kline(&row).is_none());
    }

    #[test]
    fn test_parse_kline_rejects_garbage_price() {
        let row = vec![
            json!(1700000000000i64),
            json!("not-a-price"),
            json!("101.0"),
            json!("99.0"),
            json!("100.5"),
            json!("12.0"),
        ];
        assert!(parse_kline(&row).is_none());
    }

    #[test]
    fn test_checked_symbol_normalizes_case() {
        assert_eq!(checked_symbol("btcusdt").unwrap(), "BTCUSDT");
        assert_eq!(checked_symbol(" ethbusd ").unwrap(), "ETHBUSD");
    }

    #[test]
    fn test_checked_symbol_rejects_malformed() {
        assert!(checked_symbol("BTC-USD").is_err());
        assert!(checked_symbol("USDT").is_err());
        assert!(checked_symbol("").is_err());
    }

    #[test]
    fn test_checked_interval() {
        assert_eq!(checked_interval("1h").unwrap(), "1h");
        assert!(checked_interval("7m").is_err());
        assert!(checked_interval("").is_err());
    }

    #[test]
    fn test_price_response_deserialization() {
        let json = r#"{"symbol": "BTCUSDT", "price": "43500.50"}"#;
        let ticker: BinancePrice = serde_json::from_str(json).unwrap();
        assert_eq!(ticker.price, "43500.50");
        let price: f64 = ticker.price.parse().unwrap();
        assert_eq!(price, 43500.5);
    }
}
