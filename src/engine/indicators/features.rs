//! Derived candle-structure features.

use crate::types::Candle;

/// Column-aligned per-bar features derived from the raw series and its
/// indicator columns. All vectors share the candle count.
#[derive(Debug, Clone, Default)]
pub struct CandleFeatures {
    /// close - open (signed).
    pub body: Vec<f64>,
    /// high - low.
    pub range: Vec<f64>,
    pub upper_wick: Vec<f64>,
    pub lower_wick: Vec<f64>,
    /// 1-bar close return; 0.0 at the first bar.
    pub return_1: Vec<f64>,
    /// 5-bar close return; 0.0 until five bars exist.
    pub return_5: Vec<f64>,
    /// Sample stddev of return_1 over the trailing 5 bars; 0.0 with
    /// fewer than two samples.
    pub volatility_5: Vec<f64>,
    pub distance_to_ema_20: Vec<f64>,
    pub distance_to_ema_50: Vec<f64>,
    /// rsi_14 normalized to [0, 1].
    pub rsi_position: Vec<f64>,
    /// volume / trailing-20 mean volume; 1.0 when the mean is zero.
    pub volume_anomaly: Vec<f64>,
}

/// Compute the feature columns. `ema_20`, `ema_50` and `rsi_14` must be
/// aligned with `candles`.
pub fn compute_features(
    candles: &[Candle],
    ema_20: &[f64],
    ema_50: &[f64],
    rsi_14: &[f64],
) -> CandleFeatures {
    let n = candles.len();
    let mut features = CandleFeatures {
        body: Vec::with_capacity(n),
        range: Vec::with_capacity(n),
        upper_wick: Vec::with_capacity(n),
        lower_wick: Vec::with_capacity(n),
        return_1: Vec::with_capacity(n),
        return_5: Vec::with_capacity(n),
        volatility_5: Vec::with_capacity(n),
        distance_to_ema_20: Vec::with_capacity(n),
        distance_to_ema_50: Vec::with_capacity(n),
        rsi_position: Vec::with_capacity(n),
        volume_anomaly: Vec::with_capacity(n),
    };

    for (i, candle) in candles.iter().enumerate() {
        features.body.push(candle.body());
        features.range.push(candle.range());
        features.upper_wick.push(candle.upper_wick());
        features.lower_wick.push(candle.lower_wick());

        let return_1 = if i == 0 || candles[i - 1].close == 0.0 {
            0.0
        } else {
            candle.close / candles[i - 1].close - 1.0
        };
        features.return_1.push(return_1);

        let return_5 = if i < 5 || candles[i - 5].close == 0.0 {
            0.0
        } else {
            candle.close / candles[i - 5].close - 1.0
        };
        features.return_5.push(return_5);

        let window_start = i.saturating_sub(4);
        features
            .volatility_5
            .push(sample_stddev(&features.return_1[window_start..=i]));

        features.distance_to_ema_20.push(candle.close - ema_20[i]);
        features.distance_to_ema_50.push(candle.close - ema_50[i]);
        features.rsi_position.push(rsi_14[i] / 100.0);

        let volume_start = i.saturating_sub(19);
        let volume_window = &candles[volume_start..=i];
        let mean_volume =
            volume_window.iter().map(|c| c.volume).sum::<f64>() / volume_window.len() as f64;
        features.volume_anomaly.push(if mean_volume > 0.0 {
            candle.volume / mean_volume
        } else {
            1.0
        });
    }

    features
}

fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values
        .iter()
        .map(|v| (v - mean) * (v - mean))
        .sum::<f64>()
        / (values.len() - 1) as f64;
    variance.sqrt()
}
