//! Pivot-based market structure.
//!
//! Support/resistance from local pivots, RSI/price divergence, and the
//! choppy-market and volatility-spike filters applied before any bar is
//! scored.

use crate::types::{Candle, Direction};

/// Body at or below this fraction of the bar range counts as indecisive.
const DOJI_THRESHOLD: f64 = 0.2;
/// Bars inspected by the market-regime filter.
const DOJI_WINDOW: usize = 10;
/// Bars averaged by the volatility filter.
const ATR_MEAN_WINDOW: usize = 20;
/// Backward search window for support/resistance pivots.
const SR_WINDOW: usize = 50;
/// Bars required on each side of a support/resistance pivot.
const SR_PIVOT_SPAN: usize = 3;
/// Bars required on each side of a divergence pivot.
const DIVERGENCE_PIVOT_SPAN: usize = 2;

/// Nearest structure levels around a close.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StructureLevels {
    /// Highest pivot low strictly below the close.
    pub support: Option<f64>,
    /// Lowest pivot high strictly above the close.
    pub resistance: Option<f64>,
}

/// True when `low[idx]` is the minimum over the surrounding span. Only
/// interior bars, with `left` and `right` neighbors available, qualify.
pub fn is_pivot_low(candles: &[Candle], idx: usize, left: usize, right: usize) -> bool {
    if idx < left || idx + right >= candles.len() {
        return false;
    }
    let low = candles[idx].low;
    candles[idx - left..=idx + right].iter().all(|c| low <= c.low)
}

/// True when `high[idx]` is the maximum over the surrounding span.
pub fn is_pivot_high(candles: &[Candle], idx: usize, left: usize, right: usize) -> bool {
    if idx < left || idx + right >= candles.len() {
        return false;
    }
    let high = candles[idx].high;
    candles[idx - left..=idx + right]
        .iter()
        .all(|c| high >= c.high)
}

/// Nearest support and resistance for the bar at `index`, from pivots in
/// the trailing window. Pivots above the close never become support and
/// pivots below never become resistance.
///
/// Only bars before `index` participate, including pivot confirmation,
/// so the result never changes when later bars are appended.
pub fn detect_support_resistance(candles: &[Candle], index: usize) -> StructureLevels {
    let history = &candles[..index];
    let start = index.saturating_sub(SR_WINDOW);
    let current = candles[index].close;

    let mut support: Option<f64> = None;
    let mut resistance: Option<f64> = None;

    for j in start..index {
        if is_pivot_low(history, j, SR_PIVOT_SPAN, SR_PIVOT_SPAN) {
            let low = history[j].low;
            if low < current && support.map_or(true, |s| low > s) {
                support = Some(low);
            }
        }
        if is_pivot_high(history, j, SR_PIVOT_SPAN, SR_PIVOT_SPAN) {
            let high = history[j].high;
            if high > current && resistance.map_or(true, |r| high < r) {
                resistance = Some(high);
            }
        }
    }

    StructureLevels {
        support,
        resistance,
    }
}

/// Divergence between the last two price swings and the RSI column.
///
/// Buy: price prints a lower low while RSI prints a higher low
/// (weakening downside momentum). Sell mirrors with highs. Needs at
/// least two qualifying pivots inside the lookback, and at least five
/// bars of history.
pub fn detect_divergence(
    candles: &[Candle],
    rsi: &[f64],
    index: usize,
    direction: Direction,
    lookback: usize,
) -> bool {
    if index < 5 {
        return false;
    }

    let history = &candles[..index];
    let start = index.saturating_sub(lookback);
    let mut pivots: Vec<usize> = Vec::new();
    for j in start..index {
        let qualifies = match direction {
            Direction::Buy => is_pivot_low(history, j, DIVERGENCE_PIVOT_SPAN, DIVERGENCE_PIVOT_SPAN),
            Direction::Sell => {
                is_pivot_high(history, j, DIVERGENCE_PIVOT_SPAN, DIVERGENCE_PIVOT_SPAN)
            }
        };
        if qualifies {
            pivots.push(j);
        }
    }

    if pivots.len() < 2 {
        return false;
    }
    let prev = pivots[pivots.len() - 2];
    let now = pivots[pivots.len() - 1];

    match direction {
        Direction::Buy => candles[now].low < candles[prev].low && rsi[now] > rsi[prev],
        Direction::Sell => candles[now].high > candles[prev].high && rsi[now] < rsi[prev],
    }
}

fn is_doji(candle: &Candle) -> bool {
    let range = candle.range().max(1e-9);
    (candle.body().abs() / range) <= DOJI_THRESHOLD
}

/// Market-regime filter. Counts indecisive bars over the trailing window
/// and rejects the bar once 40% of the nominal window is indecisive. The
/// threshold stays fixed even when fewer bars exist, which leaves short
/// histories more permissive.
pub fn regime_allows(candles: &[Candle], index: usize) -> bool {
    let start = (index + 1).saturating_sub(DOJI_WINDOW);
    let window = &candles[start..=index];
    if window.is_empty() {
        return true;
    }
    let doji_count = window.iter().filter(|c| is_doji(c)).count();
    (doji_count as f64) < DOJI_WINDOW as f64 * 0.4
}

/// Volatility filter. Rejects the bar while ATR spikes beyond 3x its
/// trailing mean; a zero ATR or zero mean passes (nothing abnormal to
/// measure).
pub fn volatility_allows(atr: &[f64], index: usize) -> bool {
    let atr_now = atr[index];
    if atr_now == 0.0 {
        return true;
    }
    let start = (index + 1).saturating_sub(ATR_MEAN_WINDOW);
    let window = &atr[start..=index];
    let mean = window.iter().sum::<f64>() / window.len() as f64;
    if mean == 0.0 {
        return true;
    }
    atr_now <= 3.0 * mean
}
