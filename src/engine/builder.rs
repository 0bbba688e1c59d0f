//! Stop and target placement.
//!
//! Stops hug structure when a usable level exists and fall back to an
//! ATR stop off the bar's extreme. Targets start at risk x reward and
//! get pulled in to the opposing level when that level still pays at
//! least 1R.

use crate::engine::structure::StructureLevels;
use crate::types::Direction;

/// Slippage pad applied when a stop or target sits on a structure level.
const LEVEL_PAD: f64 = 0.001;

/// Entry, stop and target for one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeLevels {
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

/// Derive stop and target around an entry.
///
/// Degenerate inputs (zero ATR against a flat bar) resolve to a fixed
/// 1% target rather than an inverted stop/target pair.
pub fn build_trade_levels(
    direction: Direction,
    entry: f64,
    bar_low: f64,
    bar_high: f64,
    atr: f64,
    atr_multiplier: f64,
    risk_reward_ratio: f64,
    levels: &StructureLevels,
) -> TradeLevels {
    let pad = atr * atr_multiplier;

    match direction {
        Direction::Buy => {
            let atr_stop = || {
                let sl = bar_low - pad;
                let risk = entry - sl;
                if risk <= 0.0 {
                    (sl, pad)
                } else {
                    (sl, risk)
                }
            };
            let (stop_loss, risk) = match levels.support {
                Some(support) if support < entry => {
                    let sl = support * (1.0 - LEVEL_PAD);
                    let risk = entry - sl;
                    if risk <= 0.0 {
                        atr_stop()
                    } else {
                        (sl, risk)
                    }
                }
                _ => atr_stop(),
            };

            let mut tp_atr = entry + risk * risk_reward_ratio;
            if tp_atr <= entry {
                tp_atr = entry + pad * risk_reward_ratio;
            }

            let mut take_profit = match levels.resistance {
                Some(resistance) if resistance > entry => {
                    // Only cap at resistance when it still pays 1R
                    let min_tp = entry + risk;
                    if resistance >= min_tp && resistance < tp_atr {
                        resistance * (1.0 - LEVEL_PAD)
                    } else {
                        tp_atr
                    }
                }
                _ => tp_atr,
            };
            if take_profit <= entry {
                take_profit = entry * 1.01;
            }

            TradeLevels {
                entry,
                stop_loss,
                take_profit,
            }
        }
        Direction::Sell => {
            let atr_stop = || {
                let sl = bar_high + pad;
                let risk = sl - entry;
                if risk <= 0.0 {
                    (sl, pad)
                } else {
                    (sl, risk)
                }
            };
            let (stop_loss, risk) = match levels.resistance {
                Some(resistance) if resistance > entry => {
                    let sl = resistance * (1.0 + LEVEL_PAD);
                    let risk = sl - entry;
                    if risk <= 0.0 {
                        atr_stop()
                    } else {
                        (sl, risk)
                    }
                }
                _ => atr_stop(),
            };

            let mut tp_atr = entry - risk * risk_reward_ratio;
            if tp_atr >= entry {
                tp_atr = entry - pad * risk_reward_ratio;
            }

            let mut take_profit = match levels.support {
                Some(support) if support < entry => {
                    let max_tp = entry - risk;
                    if support <= max_tp && support > tp_atr {
                        support * (1.0 + LEVEL_PAD)
                    } else {
                        tp_atr
                    }
                }
                _ => tp_atr,
            };
            if take_profit >= entry {
                take_profit = entry * 0.99;
            }

            TradeLevels {
                entry,
                stop_loss,
                take_profit,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_LEVELS: StructureLevels = StructureLevels {
        support: None,
        resistance: None,
    };

    #[test]
    fn test_buy_stop_under_support() {
        let levels = StructureLevels {
            support: Some(98.0),
            resistance: None,
        };
        let trade = build_trade_levels(Direction::Buy, 100.0, 99.0, 101.0, 2.0, 1.0, 2.0, &levels);

        let expected_sl = 98.0 * 0.999;
        let expected_tp = 100.0 + (100.0 - expected_sl) * 2.0;
        assert!((trade.stop_loss - expected_sl).abs() < 1e-9);
        assert!((trade.take_profit - expected_tp).abs() < 1e-9);
        assert!(trade.stop_loss < trade.entry && trade.entry < trade.take_profit);
    }

    #[test]
    fn test_buy_atr_fallback_without_support() {
        let trade =
            build_trade_levels(Direction::Buy, 100.0, 99.0, 101.0, 2.0, 1.0, 2.0, &NO_LEVELS);
        // Stop below the bar low by one ATR unit
        assert!((trade.stop_loss - 97.0).abs() < 1e-9);
        assert!((trade.take_profit - 106.0).abs() < 1e-9);
    }

    #[test]
    fn test_buy_target_capped_at_resistance() {
        let levels = StructureLevels {
            support: Some(98.0),
            resistance: Some(103.0),
        };
        let trade = build_trade_levels(Direction::Buy, 100.0, 99.0, 101.0, 2.0, 1.0, 2.0, &levels);
        // Resistance pays more than 1R but less than the ATR target
        assert!((trade.take_profit - 103.0 * 0.999).abs() < 1e-9);
    }

    #[test]
    fn test_buy_ignores_resistance_under_one_r() {
        let levels = StructureLevels {
            support: Some(98.0),
            resistance: Some(101.0),
        };
        let trade = build_trade_levels(Direction::Buy, 100.0, 99.0, 101.0, 2.0, 1.0, 2.0, &levels);
        // 101 pays less than the ~2.1 risk, so the ATR target stands
        let expected_sl = 98.0 * 0.999;
        let expected_tp = 100.0 + (100.0 - expected_sl) * 2.0;
        assert!((trade.take_profit - expected_tp).abs() < 1e-9);
    }

    #[test]
    fn test_buy_degenerate_inputs_fixed_target() {
        // Zero ATR, flat bar, no structure
        let trade =
            build_trade_levels(Direction::Buy, 100.0, 100.0, 100.0, 0.0, 0.8, 2.0, &NO_LEVELS);
        assert!((trade.take_profit - 101.0).abs() < 1e-9);
        assert!(trade.take_profit > trade.entry);
    }

    #[test]
    fn test_sell_stop_over_resistance() {
        let levels = StructureLevels {
            support: None,
            resistance: Some(102.0),
        };
        let trade = build_trade_levels(Direction::Sell, 100.0, 99.0, 101.0, 2.0, 1.0, 2.0, &levels);

        let expected_sl = 102.0 * 1.001;
        let expected_tp = 100.0 - (expected_sl - 100.0) * 2.0;
        assert!((trade.stop_loss - expected_sl).abs() < 1e-9);
        assert!((trade.take_profit - expected_tp).abs() < 1e-9);
        assert!(trade.take_profit < trade.entry && trade.entry < trade.stop_loss);
    }

    #[test]
    fn test_sell_target_capped_at_support() {
        let levels = StructureLevels {
            support: Some(97.0),
            resistance: Some(102.0),
        };
        let trade = build_trade_levels(Direction::Sell, 100.0, 99.0, 101.0, 2.0, 1.0, 2.0, &levels);
        // Support sits between 1R and the ATR target, so it wins
        assert!((trade.take_profit - 97.0 * 1.001).abs() < 1e-9);
    }

    #[test]
    fn test_sell_atr_fallback_and_clamp() {
        let trade =
            build_trade_levels(Direction::Sell, 100.0, 99.0, 101.0, 2.0, 1.0, 2.0, &NO_LEVELS);
        assert!((trade.stop_loss - 103.0).abs() < 1e-9);
        assert!((trade.take_profit - 94.0).abs() < 1e-9);

        // Degenerate sell lands on the fixed 1% target below entry
        let degenerate =
            build_trade_levels(Direction::Sell, 100.0, 100.0, 100.0, 0.0, 1.0, 2.0, &NO_LEVELS);
        assert!((degenerate.take_profit - 99.0).abs() < 1e-9);
    }
}
