//! Exponential Moving Average (EMA).

/// Compute an EMA series aligned to `values`.
///
/// Standard span smoothing with alpha = 2/(period+1), seeded with the
/// first value so there is no warm-up gap at the head of the series.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let mut ema = Vec::with_capacity(values.len());
    let Some(&first) = values.first() else {
        return ema;
    };

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut current = first;
    ema.push(current);

    for &value in &values[1..] {
        current = value * alpha + current * (1.0 - alpha);
        ema.push(current);
    }

    ema
}
