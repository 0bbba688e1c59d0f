//! Candle series annotated with the fixed indicator column set.

use crate::engine::indicators::{
    atr_series, compute_features, ema_series, rsi_series, CandleFeatures,
};
use crate::error::EngineError;
use crate::types::Candle;

/// RSI periods computed for every series.
pub const RSI_PERIODS: [usize; 4] = [6, 8, 10, 14];
/// EMA periods computed for every series.
pub const EMA_PERIODS: [usize; 4] = [9, 20, 50, 200];
/// ATR period computed for every series.
pub const ATR_PERIOD: usize = 14;

/// An ordered candle series with its indicator columns.
///
/// Construction validates the bars once (finite fields, non-decreasing
/// open_time); everything downstream can index columns without
/// re-checking. Indicator values at index i depend only on bars at
/// indices <= i.
#[derive(Debug, Clone)]
pub struct AnnotatedSeries {
    candles: Vec<Candle>,
    rsi_6: Vec<f64>,
    rsi_8: Vec<f64>,
    rsi_10: Vec<f64>,
    rsi_14: Vec<f64>,
    ema_9: Vec<f64>,
    ema_20: Vec<f64>,
    ema_50: Vec<f64>,
    ema_200: Vec<f64>,
    atr_14: Vec<f64>,
    features: CandleFeatures,
}

impl AnnotatedSeries {
    /// Validate and annotate a candle series.
    pub fn compute(candles: Vec<Candle>) -> Result<Self, EngineError> {
        validate(&candles)?;

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

        let rsi_6 = rsi_series(&closes, 6);
        let rsi_8 = rsi_series(&closes, 8);
        let rsi_10 = rsi_series(&closes, 10);
        let rsi_14 = rsi_series(&closes, 14);

        let ema_9 = ema_series(&closes, 9);
        let ema_20 = ema_series(&closes, 20);
        let ema_50 = ema_series(&closes, 50);
        let ema_200 = ema_series(&closes, 200);

        let atr_14 = atr_series(&candles, ATR_PERIOD);

        let features = compute_features(&candles, &ema_20, &ema_50, &rsi_14);

        Ok(Self {
            candles,
            rsi_6,
            rsi_8,
            rsi_10,
            rsi_14,
            ema_9,
            ema_20,
            ema_50,
            ema_200,
            atr_14,
            features,
        })
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn candle(&self, index: usize) -> &Candle {
        &self.candles[index]
    }

    /// RSI column for one of the computed periods.
    pub fn rsi(&self, period: usize) -> Result<&[f64], EngineError> {
        match period {
            6 => Ok(&self.rsi_6),
            8 => Ok(&self.rsi_8),
            10 => Ok(&self.rsi_10),
            14 => Ok(&self.rsi_14),
            _ => Err(EngineError::UnsupportedPeriod {
                indicator: "rsi",
                period,
            }),
        }
    }

    /// EMA column for one of the computed periods.
    pub fn ema(&self, period: usize) -> Result<&[f64], EngineError> {
        match period {
            9 => Ok(&self.ema_9),
            20 => Ok(&self.ema_20),
            50 => Ok(&self.ema_50),
            200 => Ok(&self.ema_200),
            _ => Err(EngineError::UnsupportedPeriod {
                indicator: "ema",
                period,
            }),
        }
    }

    pub fn atr(&self) -> &[f64] {
        &self.atr_14
    }

    pub fn features(&self) -> &CandleFeatures {
        &self.features
    }
}

fn validate(candles: &[Candle]) -> Result<(), EngineError> {
    for (index, candle) in candles.iter().enumerate() {
        let fields = [
            ("open", candle.open),
            ("high", candle.high),
            ("low", candle.low),
            ("close", candle.close),
            ("volume", candle.volume),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(EngineError::NonFiniteField { index, field });
            }
        }
        if index > 0 && candle.open_time < candles[index - 1].open_time {
            return Err(EngineError::OutOfOrder { index });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(i: usize, close: f64) -> Candle {
        Candle {
            open_time: Utc.timestamp_millis_opt(i as i64 * 3_600_000).unwrap(),
            open: close - 0.5,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    fn uptrend(count: usize) -> Vec<Candle> {
        (0..count).map(|i| bar(i, 100.0 + i as f64)).collect()
    }

    #[test]
    fn test_compute_columns_aligned() {
        let series = AnnotatedSeries::compute(uptrend(60)).unwrap();
        assert_eq!(series.len(), 60);
        assert_eq!(series.rsi(6).unwrap().len(), 60);
        assert_eq!(series.rsi(14).unwrap().len(), 60);
        assert_eq!(series.ema(200).unwrap().len(), 60);
        assert_eq!(series.atr().len(), 60);
        assert_eq!(series.features().volume_anomaly.len(), 60);
    }

    #[test]
    fn test_compute_empty_series() {
        let series = AnnotatedSeries::compute(Vec::new()).unwrap();
        assert!(series.is_empty());
        assert!(series.atr().is_empty());
    }

    #[test]
    fn test_unsupported_periods_rejected() {
        let series = AnnotatedSeries::compute(uptrend(10)).unwrap();
        assert_eq!(
            series.rsi(7),
            Err(EngineError::UnsupportedPeriod {
                indicator: "rsi",
                period: 7
            })
        );
        assert_eq!(
            series.ema(13),
            Err(EngineError::UnsupportedPeriod {
                indicator: "ema",
                period: 13
            })
        );
    }

    #[test]
    fn test_non_finite_field_rejected() {
        let mut bars = uptrend(5);
        bars[3].close = f64::NAN;
        let err = AnnotatedSeries::compute(bars).unwrap_err();
        assert_eq!(
            err,
            EngineError::NonFiniteField {
                index: 3,
                field: "close"
            }
        );
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut bars = uptrend(5);
        bars[2].open_time = bars[0].open_time - chrono::Duration::hours(1);
        let err = AnnotatedSeries::compute(bars).unwrap_err();
        assert_eq!(err, EngineError::OutOfOrder { index: 2 });
    }

    #[test]
    fn test_causality_prefix_equality() {
        let full = AnnotatedSeries::compute(uptrend(50)).unwrap();
        let prefix = AnnotatedSeries::compute(uptrend(50)[..30].to_vec()).unwrap();

        for i in 0..30 {
            assert_eq!(full.rsi(14).unwrap()[i], prefix.rsi(14).unwrap()[i]);
            assert_eq!(full.ema(20).unwrap()[i], prefix.ema(20).unwrap()[i]);
            assert_eq!(full.atr()[i], prefix.atr()[i]);
            assert_eq!(
                full.features().volatility_5[i],
                prefix.features().volatility_5[i]
            );
        }
    }
}
