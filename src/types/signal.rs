use crate::types::TradingStyle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of an emitted trading signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "buy" | "long" => Some(Self::Buy),
            "sell" | "short" => Some(Self::Sell),
            _ => None,
        }
    }

    /// Get display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }

    /// Which of stop/target a traded price has crossed, target checked
    /// first. Returns None while the price sits between the two levels.
    pub fn crossed(&self, price: f64, stop_loss: f64, take_profit: f64) -> Option<SignalOutcome> {
        match self {
            Self::Buy => {
                if price >= take_profit {
                    Some(SignalOutcome::HitTarget)
                } else if price <= stop_loss {
                    Some(SignalOutcome::HitStop)
                } else {
                    None
                }
            }
            Self::Sell => {
                if price <= take_profit {
                    Some(SignalOutcome::HitTarget)
                } else if price >= stop_loss {
                    Some(SignalOutcome::HitStop)
                } else {
                    None
                }
            }
        }
    }
}

/// How a tracked or replayed signal resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalOutcome {
    HitTarget,
    HitStop,
    Expired,
}

/// Lifecycle status of a persisted signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStatus {
    Open,
    HitTp,
    HitSl,
    Expired,
    Cancelled,
}

impl SignalStatus {
    /// Parse from the stored string form.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OPEN" => Some(Self::Open),
            "HIT_TP" => Some(Self::HitTp),
            "HIT_SL" => Some(Self::HitSl),
            "EXPIRED" => Some(Self::Expired),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// String form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::HitTp => "HIT_TP",
            Self::HitSl => "HIT_SL",
            Self::Expired => "EXPIRED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// True for any state other than OPEN. Terminal states never change.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

impl From<SignalOutcome> for SignalStatus {
    fn from(outcome: SignalOutcome) -> Self {
        match outcome {
            SignalOutcome::HitTarget => Self::HitTp,
            SignalOutcome::HitStop => Self::HitSl,
            SignalOutcome::Expired => Self::Expired,
        }
    }
}

/// An immutable signal produced by one scan evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalCandidate {
    /// Trade direction.
    pub direction: Direction,
    /// Entry price (close of the evaluated bar).
    pub entry: f64,
    /// Stop-loss level.
    pub stop_loss: f64,
    /// Take-profit level.
    pub take_profit: f64,
    /// Bounded confidence, in [0.35, 0.80] by construction.
    pub confidence: f64,
    /// Human-readable list of the conditions that fired.
    pub reason: String,
    /// Open time of the evaluated bar.
    pub open_time: DateTime<Utc>,
    /// Conditions satisfied, out of 6.
    pub confluence_count: u8,
    /// RSI/price divergence was present.
    pub divergence: bool,
}

impl SignalCandidate {
    /// First threshold the given price has crossed, target checked first.
    pub fn crossing(&self, price: f64) -> Option<SignalOutcome> {
        self.direction.crossed(price, self.stop_loss, self.take_profit)
    }
}

/// A persisted signal with its lifecycle fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalRecord {
    /// Unique signal ID.
    pub id: Uuid,
    /// Trading pair, e.g. "BTCUSDT".
    pub pair: String,
    /// Style the signal was generated under.
    pub style: TradingStyle,
    /// Trade direction.
    pub direction: Direction,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub confidence: f64,
    pub confluence_count: u8,
    pub divergence: bool,
    pub reason: String,
    /// Current lifecycle status.
    pub status: SignalStatus,
    /// Unix timestamp (milliseconds) when the signal was created.
    pub created_at: i64,
    /// Unix timestamp (milliseconds) when the signal reached a terminal
    /// status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<i64>,
    /// Price at which the signal closed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_price: Option<f64>,
    /// Realized profit/loss percent at close.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnl_percent: Option<f64>,
    /// Minutes the signal stayed open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
    /// Highest price observed while tracking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_price: Option<f64>,
    /// Lowest price observed while tracking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lowest_price: Option<f64>,
}

impl SignalRecord {
    /// Create an OPEN record from a scan candidate.
    pub fn from_candidate(pair: &str, style: TradingStyle, candidate: &SignalCandidate) -> Self {
        Self {
            id: Uuid::new_v4(),
            pair: pair.to_uppercase(),
            style,
            direction: candidate.direction,
            entry: candidate.entry,
            stop_loss: candidate.stop_loss,
            take_profit: candidate.take_profit,
            confidence: candidate.confidence,
            confluence_count: candidate.confluence_count,
            divergence: candidate.divergence,
            reason: candidate.reason.clone(),
            status: SignalStatus::Open,
            created_at: candidate.open_time.timestamp_millis(),
            closed_at: None,
            exit_price: None,
            pnl_percent: None,
            duration_minutes: None,
            highest_price: None,
            lowest_price: None,
        }
    }

    /// First threshold the given price has crossed, target checked first.
    pub fn crossing(&self, price: f64) -> Option<SignalOutcome> {
        self.direction.crossed(price, self.stop_loss, self.take_profit)
    }
}

/// Aggregate performance statistics over stored signals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalStats {
    /// All signals ever stored.
    pub total: u32,
    /// Currently open.
    pub open: u32,
    /// Closed at take-profit.
    pub hit_tp: u32,
    /// Closed at stop-loss.
    pub hit_sl: u32,
    /// Expired without resolving.
    pub expired: u32,
    /// Cancelled by the user.
    pub cancelled: u32,
    /// hit_tp / (hit_tp + hit_sl) * 100, 0 when undecided.
    pub win_rate: f64,
    /// Mean pnl percent over closed signals that recorded one.
    pub avg_pnl_percent: f64,
    /// Best recorded pnl percent.
    pub best_pnl_percent: f64,
    /// Worst recorded pnl percent.
    pub worst_pnl_percent: f64,
}

/// A trading pair pinned by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritePair {
    /// Pair symbol, uppercase.
    pub pair: String,
    /// Unix timestamp (milliseconds) when added.
    pub added_at: i64,
}
