use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A single OHLCV bar.
///
/// `open_time` accepts either a millisecond epoch integer or an ISO-8601
/// string on deserialization and is always emitted as millisecond epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    /// Bar open time (UTC).
    #[serde(with = "flexible_time")]
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Candle body: close minus open (signed).
    pub fn body(&self) -> f64 {
        self.close - self.open
    }

    /// Full bar range: high minus low.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Wick above the body.
    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    /// Wick below the body.
    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// True when the bar closed above its open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// True when the bar closed below its open.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Parse an open_time value from its textual forms.
///
/// Accepts a millisecond epoch integer, RFC 3339, or the common
/// `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS` layouts (treated as UTC).
pub fn parse_open_time(raw: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();

    if let Ok(millis) = trimmed.parse::<i64>() {
        return Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| format!("open_time out of range: {}", millis));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for layout in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, layout) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    Err(format!("unparseable open_time: {}", raw))
}

/// Sort bars by open_time and drop duplicate timestamps, keeping the last
/// occurrence. Indicator computation requires this normalization.
pub fn normalize_series(mut bars: Vec<Candle>) -> Vec<Candle> {
    bars.sort_by_key(|bar| bar.open_time);
    let mut normalized: Vec<Candle> = Vec::with_capacity(bars.len());
    for bar in bars {
        match normalized.last_mut() {
            Some(last) if last.open_time == bar.open_time => *last = bar,
            _ => normalized.push(bar),
        }
    }
    normalized
}

mod flexible_time {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TimeRepr {
        Millis(i64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match TimeRepr::deserialize(deserializer)? {
            TimeRepr::Millis(millis) => Utc
                .timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| de::Error::custom(format!("open_time out of range: {}", millis))),
            TimeRepr::Text(text) => super::parse_open_time(&text).map_err(de::Error::custom),
        }
    }

    pub fn serialize<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(time.timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            open_time: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn test_candle_geometry() {
        let bar = candle(100.0, 110.0, 95.0, 105.0);
        assert_eq!(bar.body(), 5.0);
        assert_eq!(bar.range(), 15.0);
        assert_eq!(bar.upper_wick(), 5.0);
        assert_eq!(bar.lower_wick(), 5.0);
        assert!(bar.is_bullish());
        assert!(!bar.is_bearish());
    }

    #[test]
    fn test_parse_open_time_millis() {
        let parsed = parse_open_time("1700000000000").unwrap();
        assert_eq!(parsed.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_parse_open_time_iso() {
        let parsed = parse_open_time("2023-11-14T22:13:20Z").unwrap();
        assert_eq!(parsed.timestamp_millis(), 1_700_000_000_000);

        let spaced = parse_open_time("2023-11-14 22:13:20").unwrap();
        assert_eq!(spaced, parsed);
    }

    #[test]
    fn test_parse_open_time_rejects_garbage() {
        let err = parse_open_time("not-a-time").unwrap_err();
        assert!(err.contains("not-a-time"));
    }

    #[test]
    fn test_candle_deserialize_both_time_forms() {
        let from_millis: Candle = serde_json::from_str(
            r#"{"openTime":1700000000000,"open":1.0,"high":2.0,"low":0.5,"close":1.5,"volume":10.0}"#,
        )
        .unwrap();
        let from_text: Candle = serde_json::from_str(
            r#"{"openTime":"2023-11-14T22:13:20Z","open":1.0,"high":2.0,"low":0.5,"close":1.5,"volume":10.0}"#,
        )
        .unwrap();
        assert_eq!(from_millis.open_time, from_text.open_time);
    }

    #[test]
    fn test_normalize_series_sorts_and_dedupes() {
        let mut first = candle(1.0, 2.0, 0.5, 1.5);
        let mut second = candle(2.0, 3.0, 1.5, 2.5);
        let mut dup = candle(9.0, 9.0, 9.0, 9.0);
        first.open_time = Utc.timestamp_millis_opt(2000).unwrap();
        second.open_time = Utc.timestamp_millis_opt(1000).unwrap();
        dup.open_time = Utc.timestamp_millis_opt(2000).unwrap();

        let normalized = normalize_series(vec![first, second, dup]);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].open_time.timestamp_millis(), 1000);
        // Last duplicate wins
        assert_eq!(normalized[1].close, 9.0);
    }
}
