//! Scan orchestration.
//!
//! Walks an annotated series bar by bar, runs the regime filters,
//! structure detection and confluence scoring, and collects the
//! candidates that survive confidence and overlap checks.

use tracing::{debug, warn};

use crate::engine::builder::build_trade_levels;
use crate::engine::confidence::honest_confidence;
use crate::engine::confluence::{
    evaluate_confluence, ConfluenceInputs, ConfluenceScore, CONFLUENCE_TOTAL,
};
use crate::engine::series::AnnotatedSeries;
use crate::engine::structure::{
    detect_divergence, detect_support_resistance, regime_allows, volatility_allows,
};
use crate::error::EngineError;
use crate::types::{Direction, SignalCandidate, StyleProfile, TradingStyle};

/// Bars averaged for the smoothed ATR used in stop placement.
const ATR_SMOOTHING_WINDOW: usize = 14;
/// Default confidence floor for accepted candidates.
pub const DEFAULT_CONFIDENCE_MINIMUM: f64 = 0.30;

/// Scan-time knobs. Every override falls back to the style profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanOptions {
    /// Candidates scoring below this are dropped.
    pub confidence_minimum: f64,
    /// Override for the profile's oversold threshold.
    pub rsi_oversold: Option<f64>,
    /// Override for the profile's overbought threshold.
    pub rsi_overbought: Option<f64>,
    /// Override for the profile's risk/reward ratio.
    pub risk_reward_ratio: Option<f64>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            confidence_minimum: DEFAULT_CONFIDENCE_MINIMUM,
            rsi_oversold: None,
            rsi_overbought: None,
            risk_reward_ratio: None,
        }
    }
}

/// Scan a series under a style's stock profile.
pub fn scan(
    series: &AnnotatedSeries,
    style: TradingStyle,
    options: &ScanOptions,
) -> Vec<SignalCandidate> {
    scan_with_profile(series, style, &style.profile(), options)
}

/// Scan with an explicit profile, e.g. a stock profile with the trend
/// filter dropped. The style still supplies scan geometry and the label
/// used in reason text.
///
/// A bar that fails to evaluate is logged and skipped; one bad bar
/// never aborts the scan. Candidates whose entry lands inside an
/// already-accepted candidate's entry-to-target range are discarded.
pub fn scan_with_profile(
    series: &AnnotatedSeries,
    style: TradingStyle,
    profile: &StyleProfile,
    options: &ScanOptions,
) -> Vec<SignalCandidate> {
    if series.is_empty() || series.len() < style.min_series_len() {
        return Vec::new();
    }

    let mut accepted: Vec<SignalCandidate> = Vec::new();
    let mut index = style.scan_start();
    while index < series.len() {
        match evaluate_bar(series, index, style, profile, options) {
            Ok(Some(candidate)) => {
                if overlaps_accepted(&candidate, &accepted) {
                    debug!(
                        "Skipping overlapping {} candidate at bar {} (entry {})",
                        candidate.direction.label(),
                        index,
                        candidate.entry
                    );
                } else {
                    accepted.push(candidate);
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!("Bar {} evaluation failed, continuing scan: {}", index, err);
            }
        }
        index += style.scan_stride();
    }

    accepted
}

/// Evaluate one bar. Buy is graded first; an accepted buy suppresses
/// the sell check at the same bar. A buy that is eligible but below the
/// confidence floor still lets the sell side run.
pub fn evaluate_bar(
    series: &AnnotatedSeries,
    index: usize,
    style: TradingStyle,
    profile: &StyleProfile,
    options: &ScanOptions,
) -> Result<Option<SignalCandidate>, EngineError> {
    if index >= series.len() {
        return Ok(None);
    }

    let candles = series.candles();
    let atr_column = series.atr();

    if !regime_allows(candles, index) || !volatility_allows(atr_column, index) {
        return Ok(None);
    }

    let oversold = options.rsi_oversold.unwrap_or(profile.rsi_oversold);
    let overbought = options.rsi_overbought.unwrap_or(profile.rsi_overbought);
    let risk_reward = options
        .risk_reward_ratio
        .unwrap_or(profile.risk_reward_ratio);

    let rsi_column = series.rsi(profile.rsi_period)?;
    let ema_fast = series.ema(profile.ema_fast)?[index];
    let ema_mid = series.ema(profile.ema_mid)?[index];
    let ema_trend = series.ema(200)?[index];

    let bar = candles[index];
    let rsi = rsi_column[index];
    let levels = detect_support_resistance(candles, index);
    let atr = smoothed_atr(atr_column, index, &bar);

    let inputs = ConfluenceInputs {
        open: bar.open,
        close: bar.close,
        rsi,
        ema_fast,
        ema_mid,
        ema_trend,
        levels,
    };

    let mut effective = *profile;
    effective.rsi_oversold = oversold;
    effective.rsi_overbought = overbought;

    for direction in [Direction::Buy, Direction::Sell] {
        let score = evaluate_confluence(&inputs, direction, &effective);
        let divergence = detect_divergence(
            candles,
            rsi_column,
            index,
            direction,
            profile.divergence_lookback,
        );

        if !score.eligible() {
            continue;
        }

        let (support_dist, resistance_dist) = match direction {
            Direction::Buy => (score.level_distance_pct, None),
            Direction::Sell => (None, score.level_distance_pct),
        };
        let confidence = honest_confidence(
            score.count,
            CONFLUENCE_TOTAL,
            divergence,
            support_dist,
            resistance_dist,
            direction,
        );
        if confidence < options.confidence_minimum {
            continue;
        }

        let trade = build_trade_levels(
            direction,
            bar.close,
            bar.low,
            bar.high,
            atr,
            profile.atr_multiplier,
            risk_reward,
            &levels,
        );

        return Ok(Some(SignalCandidate {
            direction,
            entry: trade.entry,
            stop_loss: trade.stop_loss,
            take_profit: trade.take_profit,
            confidence,
            reason: build_reason(style.name(), direction, &score, rsi, divergence),
            open_time: bar.open_time,
            confluence_count: score.count,
            divergence,
        }));
    }

    Ok(None)
}

/// Mean ATR over the trailing window, falling back to the bar's own
/// range when the column is all zero.
fn smoothed_atr(atr_column: &[f64], index: usize, bar: &crate::types::Candle) -> f64 {
    let start = index.saturating_sub(ATR_SMOOTHING_WINDOW - 1);
    let window = &atr_column[start..=index];
    let mean = window.iter().sum::<f64>() / window.len() as f64;
    if mean == 0.0 {
        bar.high - bar.low
    } else {
        mean
    }
}

fn build_reason(
    style_name: &str,
    direction: Direction,
    score: &ConfluenceScore,
    rsi: f64,
    divergence: bool,
) -> String {
    let mut parts = vec![
        format!("[{}] {} signal", style_name, direction.label()),
        format!("confluence {}/{}", score.count, CONFLUENCE_TOTAL),
    ];

    match direction {
        Direction::Buy => {
            if score.rsi_extreme {
                parts.push(format!("RSI oversold ({:.1})", rsi));
            }
            if score.ema_aligned {
                parts.push("EMA stacked bullish".to_string());
            }
            if score.near_level {
                if let Some(pct) = score.level_distance_pct {
                    parts.push(format!("near support ({:.1}%)", pct));
                }
            }
            if divergence {
                parts.push("bullish divergence".to_string());
            }
        }
        Direction::Sell => {
            if score.rsi_extreme {
                parts.push(format!("RSI overbought ({:.1})", rsi));
            }
            if score.ema_aligned {
                parts.push("EMA stacked bearish".to_string());
            }
            if score.near_level {
                if let Some(pct) = score.level_distance_pct {
                    parts.push(format!("near resistance ({:.1}%)", pct));
                }
            }
            if divergence {
                parts.push("bearish divergence".to_string());
            }
        }
    }

    let mut reason = parts.join(", ");
    reason.push('.');
    reason
}

/// True when the entry lands inside an accepted candidate's live range:
/// [entry, target] for buys, [target, entry] for sells. Both bounds
/// inclusive.
fn overlaps_accepted(candidate: &SignalCandidate, accepted: &[SignalCandidate]) -> bool {
    accepted.iter().any(|existing| match existing.direction {
        Direction::Buy => {
            existing.entry <= candidate.entry && candidate.entry <= existing.take_profit
        }
        Direction::Sell => {
            existing.take_profit <= candidate.entry && candidate.entry <= existing.entry
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::types::Candle;

    fn bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            open_time: Utc.timestamp_millis_opt(i as i64 * 3_600_000).unwrap(),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    fn candidate(direction: Direction, entry: f64, stop: f64, target: f64) -> SignalCandidate {
        SignalCandidate {
            direction,
            entry,
            stop_loss: stop,
            take_profit: target,
            confidence: 0.5,
            reason: String::new(),
            open_time: Utc.timestamp_millis_opt(0).unwrap(),
            confluence_count: 4,
            divergence: false,
        }
    }

    #[test]
    fn test_short_series_yields_nothing() {
        let candles: Vec<Candle> = (0..9)
            .map(|i| bar(i, 100.0, 101.0, 99.0, 100.5))
            .collect();
        let series = AnnotatedSeries::compute(candles).unwrap();
        let signals = scan(&series, TradingStyle::Active, &ScanOptions::default());
        assert!(signals.is_empty());
    }

    #[test]
    fn test_flat_series_yields_nothing() {
        // 100 identical bars: no RSI extreme, no structure below price
        let candles: Vec<Candle> = (0..100)
            .map(|i| bar(i, 100.0, 100.0, 100.0, 100.0))
            .collect();
        let series = AnnotatedSeries::compute(candles).unwrap();
        for style in TradingStyle::all() {
            let signals = scan(&series, style, &ScanOptions::default());
            assert!(signals.is_empty(), "{:?} found signals in a flat tape", style);
        }
    }

    #[test]
    fn test_overlap_rejection_ranges() {
        let buy = candidate(Direction::Buy, 100.0, 95.0, 110.0);
        let accepted = vec![buy];

        // Inside [entry, target], bounds inclusive
        assert!(overlaps_accepted(
            &candidate(Direction::Buy, 105.0, 100.0, 115.0),
            &accepted
        ));
        assert!(overlaps_accepted(
            &candidate(Direction::Buy, 100.0, 95.0, 110.0),
            &accepted
        ));
        assert!(overlaps_accepted(
            &candidate(Direction::Sell, 110.0, 115.0, 100.0),
            &accepted
        ));
        // Below entry or above target is clear
        assert!(!overlaps_accepted(
            &candidate(Direction::Buy, 99.9, 95.0, 105.0),
            &accepted
        ));
        assert!(!overlaps_accepted(
            &candidate(Direction::Buy, 110.1, 105.0, 120.0),
            &accepted
        ));

        let sell = candidate(Direction::Sell, 100.0, 105.0, 90.0);
        let accepted = vec![sell];
        assert!(overlaps_accepted(
            &candidate(Direction::Buy, 95.0, 90.0, 99.0),
            &accepted
        ));
        assert!(!overlaps_accepted(
            &candidate(Direction::Buy, 89.9, 85.0, 95.0),
            &accepted
        ));
    }

    #[test]
    fn test_smoothed_atr_fallback() {
        let flat = vec![0.0; 20];
        let b = bar(0, 100.0, 104.0, 98.0, 101.0);
        assert_eq!(smoothed_atr(&flat, 19, &b), 6.0);

        let live = vec![2.0; 20];
        assert_eq!(smoothed_atr(&live, 19, &b), 2.0);
    }

    #[test]
    fn test_reason_text_shape() {
        let score = ConfluenceScore {
            count: 5,
            rsi_extreme: true,
            ema_aligned: true,
            price_beyond_fast: true,
            macro_trend: true,
            near_level: true,
            candle_confirms: false,
            level_distance_pct: Some(0.84),
        };
        let reason = build_reason("Active", Direction::Buy, &score, 12.34, true);
        assert_eq!(
            reason,
            "[Active] BUY signal, confluence 5/6, RSI oversold (12.3), \
             EMA stacked bullish, near support (0.8%), bullish divergence."
        );
    }

    #[test]
    fn test_stride_caps_evaluated_bars() {
        // Passive strides by 3 from bar 4, so 30 bars allow at most 9
        // evaluations and at most 9 candidates
        let candles: Vec<Candle> = (0..30)
            .map(|i| bar(i, 100.0, 101.0, 99.0, 100.5))
            .collect();
        let series = AnnotatedSeries::compute(candles).unwrap();
        let signals = scan(&series, TradingStyle::Passive, &ScanOptions::default());
        assert!(signals.len() <= 9);
    }
}
