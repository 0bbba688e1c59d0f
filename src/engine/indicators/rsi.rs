//! Relative Strength Index (RSI) with Wilder smoothing.

/// Compute an RSI series aligned to `closes`.
///
/// Gains and losses are smoothed with an exponential factor of 1/period
/// (Wilder style), seeded from the first bar-to-bar change. Values stay
/// within [0, 100]:
/// - The first bar has no prior close and reports a neutral 50.0.
/// - A zero average loss caps RSI at 100.0, unless the average gain is
///   also zero (flat series), which stays neutral at 50.0.
pub fn rsi_series(closes: &[f64], period: usize) -> Vec<f64> {
    let mut rsi = Vec::with_capacity(closes.len());
    if closes.is_empty() {
        return rsi;
    }
    rsi.push(50.0);

    let alpha = 1.0 / period as f64;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for i in 1..closes.len() {
        let change = closes[i] - closes[i - 1];
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        if i == 1 {
            avg_gain = gain;
            avg_loss = loss;
        } else {
            avg_gain = avg_gain * (1.0 - alpha) + gain * alpha;
            avg_loss = avg_loss * (1.0 - alpha) + loss * alpha;
        }
        rsi.push(rsi_value(avg_gain, avg_loss));
    }

    rsi
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - (100.0 / (1.0 + rs))
    }
}
