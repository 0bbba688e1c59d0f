//! Formatting and trade-math helpers shared across services and API.

use crate::types::Direction;

/// Decimal places appropriate for a price magnitude.
pub fn price_decimals(price: f64) -> usize {
    if price >= 1000.0 {
        2
    } else if price >= 1.0 {
        4
    } else if price >= 0.01 {
        6
    } else {
        8
    }
}

/// Format a price with magnitude-appropriate precision.
pub fn format_price(price: f64) -> String {
    format!("{:.*}", price_decimals(price), price)
}

/// Signed percent move from entry to exit for the given direction.
pub fn pnl_percent(entry: f64, exit: f64, direction: Direction) -> f64 {
    if entry == 0.0 {
        return 0.0;
    }
    match direction {
        Direction::Buy => (exit - entry) / entry * 100.0,
        Direction::Sell => (entry - exit) / entry * 100.0,
    }
}

/// Reward-to-risk ratio of a stop/target pair. Zero or inverted risk
/// yields 0.
pub fn risk_reward(entry: f64, stop_loss: f64, take_profit: f64, direction: Direction) -> f64 {
    let (risk, reward) = match direction {
        Direction::Buy => (entry - stop_loss, take_profit - entry),
        Direction::Sell => (stop_loss - entry, entry - take_profit),
    };
    if risk <= 0.0 {
        return 0.0;
    }
    reward / risk
}

/// Position size that risks `risk_percent` of the balance between
/// entry and stop. A stop at the entry yields 0.
pub fn position_size(balance: f64, risk_percent: f64, entry: f64, stop_loss: f64) -> f64 {
    let risk_amount = balance * (risk_percent / 100.0);
    let price_diff = (entry - stop_loss).abs();
    if price_diff == 0.0 {
        return 0.0;
    }
    risk_amount / price_diff
}

/// True for an uppercase alphanumeric pair quoted in USDT or BUSD.
pub fn validate_symbol(symbol: &str) -> bool {
    if symbol.len() < 5 {
        return false;
    }
    if !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return false;
    }
    if symbol != symbol.to_uppercase() {
        return false;
    }
    symbol.ends_with("USDT") || symbol.ends_with("BUSD")
}

/// Kline interval to minutes. Unknown intervals map to None.
pub fn interval_minutes(interval: &str) -> Option<u32> {
    let minutes = match interval {
        "1m" => 1,
        "3m" => 3,
        "5m" => 5,
        "15m" => 15,
        "30m" => 30,
        "1h" => 60,
        "2h" => 120,
        "4h" => 240,
        "6h" => 360,
        "8h" => 480,
        "12h" => 720,
        "1d" => 1440,
        "3d" => 4320,
        "1w" => 10080,
        _ => return None,
    };
    Some(minutes)
}
