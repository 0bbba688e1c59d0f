//! Confluence scoring.
//!
//! Each direction is graded against a fixed six-point checklist at one
//! bar. A bar only graduates into a signal once enough points line up.

use crate::engine::structure::StructureLevels;
use crate::types::{Direction, StyleProfile};

/// Number of conditions each direction is scored against.
pub const CONFLUENCE_TOTAL: u8 = 6;
/// Conditions that must hold before a bar can become a signal.
pub const CONFLUENCE_REQUIRED: u8 = 4;
/// Structure must sit within this percent of the close to count.
pub const LEVEL_PROXIMITY_MAX_PCT: f64 = 2.0;

/// Per-bar values the confluence check reads.
#[derive(Debug, Clone, Copy)]
pub struct ConfluenceInputs {
    pub open: f64,
    pub close: f64,
    /// RSI at the style's period.
    pub rsi: f64,
    pub ema_fast: f64,
    pub ema_mid: f64,
    /// EMA-200, the macro trend reference.
    pub ema_trend: f64,
    pub levels: StructureLevels,
}

/// Outcome of scoring one direction at one bar.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfluenceScore {
    /// Conditions satisfied, out of [`CONFLUENCE_TOTAL`].
    pub count: u8,
    /// RSI reached the style's extreme band.
    pub rsi_extreme: bool,
    /// Fast EMA on the right side of the mid EMA.
    pub ema_aligned: bool,
    /// Close on the right side of the fast EMA.
    pub price_beyond_fast: bool,
    /// Close on the right side of EMA-200. Always true for styles that
    /// waive the trend filter.
    pub macro_trend: bool,
    /// Qualified structure within proximity of the close.
    pub near_level: bool,
    /// Candle body agrees with the direction.
    pub candle_confirms: bool,
    /// Distance to the direction's structure level, percent of close.
    /// Present whenever the level exists, near or not.
    pub level_distance_pct: Option<f64>,
}

impl ConfluenceScore {
    /// True when enough conditions line up to build a signal.
    pub fn eligible(&self) -> bool {
        self.count >= CONFLUENCE_REQUIRED
    }

    /// Satisfied fraction of the full checklist.
    pub fn ratio(&self) -> f64 {
        f64::from(self.count) / f64::from(CONFLUENCE_TOTAL)
    }
}

/// Score one direction at one bar. Buy reads support, sell reads
/// resistance; the other four conditions mirror around the EMAs.
pub fn evaluate_confluence(
    inputs: &ConfluenceInputs,
    direction: Direction,
    profile: &StyleProfile,
) -> ConfluenceScore {
    let mut score = ConfluenceScore::default();

    match direction {
        Direction::Buy => {
            score.rsi_extreme = inputs.rsi <= profile.rsi_oversold;
            score.ema_aligned = inputs.ema_fast > inputs.ema_mid;
            score.price_beyond_fast = inputs.close > inputs.ema_fast;
            score.macro_trend = !profile.requires_trend_filter || inputs.close > inputs.ema_trend;
            if let Some(support) = inputs.levels.support {
                let pct = (inputs.close - support).abs() / inputs.close * 100.0;
                score.level_distance_pct = Some(pct);
                score.near_level = pct < LEVEL_PROXIMITY_MAX_PCT;
            }
            score.candle_confirms = inputs.close > inputs.open;
        }
        Direction::Sell => {
            score.rsi_extreme = inputs.rsi >= profile.rsi_overbought;
            score.ema_aligned = inputs.ema_fast < inputs.ema_mid;
            score.price_beyond_fast = inputs.close < inputs.ema_fast;
            score.macro_trend = !profile.requires_trend_filter || inputs.close < inputs.ema_trend;
            if let Some(resistance) = inputs.levels.resistance {
                let pct = (inputs.close - resistance).abs() / inputs.close * 100.0;
                score.level_distance_pct = Some(pct);
                score.near_level = pct < LEVEL_PROXIMITY_MAX_PCT;
            }
            score.candle_confirms = inputs.close < inputs.open;
        }
    }

    score.count = [
        score.rsi_extreme,
        score.ema_aligned,
        score.price_beyond_fast,
        score.macro_trend,
        score.near_level,
        score.candle_confirms,
    ]
    .iter()
    .filter(|&&hit| hit)
    .count() as u8;

    score
}
