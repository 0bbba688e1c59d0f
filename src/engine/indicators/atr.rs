//! Average True Range (ATR).

use crate::engine::indicators::ema::ema_series;
use crate::types::Candle;

/// True range of a bar against the previous close.
pub fn true_range(candle: &Candle, prev_close: f64) -> f64 {
    let high_low = candle.high - candle.low;
    let high_close = (candle.high - prev_close).abs();
    let low_close = (candle.low - prev_close).abs();
    high_low.max(high_close).max(low_close)
}

/// Compute an ATR series aligned to `candles`.
///
/// The first bar uses its own close as the previous close, so its true
/// range reduces to high minus low. True ranges are smoothed with the
/// same span EMA used elsewhere (alpha = 2/(period+1)).
pub fn atr_series(candles: &[Candle], period: usize) -> Vec<f64> {
    let ranges: Vec<f64> = candles
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            let prev_close = if i == 0 {
                candle.close
            } else {
                candles[i - 1].close
            };
            true_range(candle, prev_close)
        })
        .collect();

    ema_series(&ranges, period)
}
