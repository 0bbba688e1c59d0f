//! Forward replay of candidates against recorded bars.
//!
//! Deterministic outcome measurement: each candidate is walked forward
//! through the bars that followed it until the target or stop is
//! touched, or the horizon runs out. No simulation, no randomness.

use serde::Serialize;

use crate::types::{Candle, Direction, SignalCandidate, SignalOutcome};

/// Default replay horizon: one week of hourly bars.
pub const DEFAULT_REPLAY_HORIZON: usize = 168;

/// How one candidate resolved against the bars that followed it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayResult {
    pub outcome: SignalOutcome,
    /// Realized percent move, rounded to 2 decimals. Expiries report 0.
    pub pnl_percent: f64,
    /// Bars elapsed until resolution (1-based), capped at the horizon
    /// for expiries.
    pub bars_held: usize,
}

/// Aggregate performance over a replayed batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub total: usize,
    pub wins: usize,
    pub losses: usize,
    pub expired: usize,
    /// Winners over decided trades, percent. Expiries are not decided.
    pub win_rate: f64,
    pub total_pnl_percent: f64,
    pub avg_pnl_percent: f64,
    /// Deepest drop of the cumulative pnl curve below its running peak.
    pub max_drawdown_percent: f64,
    pub avg_bars_held: f64,
}

/// Replay one candidate against bars strictly after its open time.
///
/// Within each bar the target is checked before the stop, so a bar
/// spanning both levels resolves as a win.
pub fn replay(candles: &[Candle], candidate: &SignalCandidate, horizon: usize) -> ReplayResult {
    let entry = candidate.entry;
    let mut seen = 0usize;

    for (offset, bar) in candles
        .iter()
        .filter(|c| c.open_time > candidate.open_time)
        .enumerate()
    {
        seen = offset + 1;

        let resolved = match candidate.direction {
            Direction::Buy => {
                if bar.high >= candidate.take_profit {
                    Some((
                        SignalOutcome::HitTarget,
                        (candidate.take_profit - entry) / entry * 100.0,
                    ))
                } else if bar.low <= candidate.stop_loss {
                    Some((
                        SignalOutcome::HitStop,
                        (candidate.stop_loss - entry) / entry * 100.0,
                    ))
                } else {
                    None
                }
            }
            Direction::Sell => {
                if bar.low <= candidate.take_profit {
                    Some((
                        SignalOutcome::HitTarget,
                        (entry - candidate.take_profit) / entry * 100.0,
                    ))
                } else if bar.high >= candidate.stop_loss {
                    Some((
                        SignalOutcome::HitStop,
                        (entry - candidate.stop_loss) / entry * 100.0,
                    ))
                } else {
                    None
                }
            }
        };

        if let Some((outcome, pnl)) = resolved {
            return ReplayResult {
                outcome,
                pnl_percent: round2(pnl),
                bars_held: offset + 1,
            };
        }

        if offset >= horizon {
            break;
        }
    }

    ReplayResult {
        outcome: SignalOutcome::Expired,
        pnl_percent: 0.0,
        bars_held: seen.min(horizon),
    }
}

/// Replay every candidate in discovery order.
pub fn replay_all(
    candles: &[Candle],
    candidates: &[SignalCandidate],
    horizon: usize,
) -> Vec<ReplayResult> {
    candidates
        .iter()
        .map(|candidate| replay(candles, candidate, horizon))
        .collect()
}

impl ReplayReport {
    /// Summarize a batch of replay results.
    pub fn from_results(results: &[ReplayResult]) -> Self {
        let total = results.len();
        let wins = results
            .iter()
            .filter(|r| r.outcome == SignalOutcome::HitTarget)
            .count();
        let losses = results
            .iter()
            .filter(|r| r.outcome == SignalOutcome::HitStop)
            .count();
        let expired = total - wins - losses;

        let decided = wins + losses;
        let win_rate = if decided > 0 {
            wins as f64 / decided as f64 * 100.0
        } else {
            0.0
        };

        let total_pnl_percent: f64 = results.iter().map(|r| r.pnl_percent).sum();
        let avg_pnl_percent = if total > 0 {
            total_pnl_percent / total as f64
        } else {
            0.0
        };

        // Max drawdown over the cumulative pnl curve, in result order
        let mut cumulative = 0.0f64;
        let mut peak = 0.0f64;
        let mut max_drawdown_percent = 0.0f64;
        for result in results {
            cumulative += result.pnl_percent;
            if cumulative > peak {
                peak = cumulative;
            }
            let drawdown = peak - cumulative;
            if drawdown > max_drawdown_percent {
                max_drawdown_percent = drawdown;
            }
        }

        let avg_bars_held = if total > 0 {
            results.iter().map(|r| r.bars_held).sum::<usize>() as f64 / total as f64
        } else {
            0.0
        };

        Self {
            total,
            wins,
            losses,
            expired,
            win_rate: round2(win_rate),
            total_pnl_percent: round2(total_pnl_percent),
            avg_pnl_percent: round2(avg_pnl_percent),
            max_drawdown_percent: round2(max_drawdown_percent),
            avg_bars_held: round2(avg_bars_held),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(hour * 3_600_000).unwrap()
    }

    fn bar(hour: i64, high: f64, low: f64) -> Candle {
        Candle {
            open_time: at(hour),
            open: (high + low) / 2.0,
            high,
            low,
            close: (high + low) / 2.0,
            volume: 1000.0,
        }
    }

    fn buy_candidate(entry: f64, stop: f64, target: f64) -> SignalCandidate {
        SignalCandidate {
            direction: Direction::Buy,
            entry,
            stop_loss: stop,
            take_profit: target,
            confidence: 0.5,
            reason: String::new(),
            open_time: at(0),
            confluence_count: 4,
            divergence: false,
        }
    }

    fn sell_candidate(entry: f64, stop: f64, target: f64) -> SignalCandidate {
        SignalCandidate {
            direction: Direction::Sell,
            ..buy_candidate(entry, stop, target)
        }
    }

    #[test]
    fn test_buy_hits_target() {
        let candles = vec![
            bar(0, 101.0, 99.0), // candidate's own bar, skipped
            bar(1, 102.0, 99.5),
            bar(2, 106.0, 100.0),
        ];
        let result = replay(&candles, &buy_candidate(100.0, 95.0, 105.0), 168);
        assert_eq!(result.outcome, SignalOutcome::HitTarget);
        assert_eq!(result.pnl_percent, 5.0);
        assert_eq!(result.bars_held, 2);
    }

    #[test]
    fn test_buy_hits_stop() {
        let candles = vec![bar(0, 101.0, 99.0), bar(1, 101.0, 94.0)];
        let result = replay(&candles, &buy_candidate(100.0, 95.0, 105.0), 168);
        assert_eq!(result.outcome, SignalOutcome::HitStop);
        assert_eq!(result.pnl_percent, -5.0);
        assert_eq!(result.bars_held, 1);
    }

    #[test]
    fn test_target_wins_inside_one_bar() {
        // One wide bar touches both levels; the optimistic read wins
        let candles = vec![bar(0, 101.0, 99.0), bar(1, 106.0, 94.0)];
        let result = replay(&candles, &buy_candidate(100.0, 95.0, 105.0), 168);
        assert_eq!(result.outcome, SignalOutcome::HitTarget);
    }

    #[test]
    fn test_sell_directions_mirrored() {
        let candles = vec![bar(0, 101.0, 99.0), bar(1, 101.0, 94.0)];
        let result = replay(&candles, &sell_candidate(100.0, 105.0, 95.0), 168);
        assert_eq!(result.outcome, SignalOutcome::HitTarget);
        assert_eq!(result.pnl_percent, 5.0);

        let candles = vec![bar(0, 101.0, 99.0), bar(1, 106.0, 99.0)];
        let result = replay(&candles, &sell_candidate(100.0, 105.0, 95.0), 168);
        assert_eq!(result.outcome, SignalOutcome::HitStop);
        assert_eq!(result.pnl_percent, -5.0);
    }

    #[test]
    fn test_expiry_at_horizon() {
        // 200 future bars that never touch either level
        let mut candles = vec![bar(0, 101.0, 99.0)];
        for hour in 1..=200 {
            candles.push(bar(hour, 101.0, 99.0));
        }
        let result = replay(&candles, &buy_candidate(100.0, 95.0, 105.0), 168);
        assert_eq!(result.outcome, SignalOutcome::Expired);
        assert_eq!(result.pnl_percent, 0.0);
        assert_eq!(result.bars_held, 168);
    }

    #[test]
    fn test_expiry_short_tape() {
        let candles = vec![bar(0, 101.0, 99.0), bar(1, 101.0, 99.0), bar(2, 101.0, 99.0)];
        let result = replay(&candles, &buy_candidate(100.0, 95.0, 105.0), 168);
        assert_eq!(result.outcome, SignalOutcome::Expired);
        assert_eq!(result.bars_held, 2);
    }

    #[test]
    fn test_no_future_bars() {
        let candles = vec![bar(0, 101.0, 99.0)];
        let result = replay(&candles, &buy_candidate(100.0, 95.0, 105.0), 168);
        assert_eq!(result.outcome, SignalOutcome::Expired);
        assert_eq!(result.bars_held, 0);
    }

    #[test]
    fn test_report_aggregates() {
        let results = vec![
            ReplayResult {
                outcome: SignalOutcome::HitTarget,
                pnl_percent: 4.0,
                bars_held: 3,
            },
            ReplayResult {
                outcome: SignalOutcome::HitStop,
                pnl_percent: -2.0,
                bars_held: 5,
            },
            ReplayResult {
                outcome: SignalOutcome::HitTarget,
                pnl_percent: 6.0,
                bars_held: 10,
            },
            ReplayResult {
                outcome: SignalOutcome::Expired,
                pnl_percent: 0.0,
                bars_held: 168,
            },
        ];
        let report = ReplayReport::from_results(&results);
        assert_eq!(report.total, 4);
        assert_eq!(report.wins, 2);
        assert_eq!(report.losses, 1);
        assert_eq!(report.expired, 1);
        assert!((report.win_rate - 66.67).abs() < 0.01);
        assert!((report.total_pnl_percent - 8.0).abs() < 1e-9);
        assert!((report.avg_pnl_percent - 2.0).abs() < 1e-9);
        // Curve: 4 -> 2 -> 8 -> 8; worst dip is 2 below the peak of 4
        assert!((report.max_drawdown_percent - 2.0).abs() < 1e-9);
        assert!((report.avg_bars_held - 46.5).abs() < 1e-9);
    }

    #[test]
    fn test_report_empty() {
        let report = ReplayReport::from_results(&[]);
        assert_eq!(report.total, 0);
        assert_eq!(report.win_rate, 0.0);
        assert_eq!(report.avg_pnl_percent, 0.0);
    }
}
