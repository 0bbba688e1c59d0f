use serde::{Deserialize, Serialize};

/// Trading style selecting the signal engine's parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TradingStyle {
    /// Short holds, roughly 1h-4h. Fast RSI, tight EMA stack.
    Active,
    /// Medium holds, roughly 4h-12h. Balanced parameters.
    #[default]
    Relaxed,
    /// Long holds, roughly 12h-3d. Classic RSI, widest targets.
    Passive,
}

impl TradingStyle {
    /// Parse from string. Accepts the legacy mode aliases used by older
    /// dataset exports alongside the canonical names.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" | "aktif" => Some(Self::Active),
            "relaxed" | "santai" => Some(Self::Relaxed),
            "passive" | "pasif" => Some(Self::Passive),
            _ => None,
        }
    }

    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Relaxed => "Relaxed",
            Self::Passive => "Passive",
        }
    }

    /// All styles, in selectivity order.
    pub fn all() -> [TradingStyle; 3] {
        [Self::Active, Self::Relaxed, Self::Passive]
    }

    /// Typical holding window, for display.
    pub fn holding_window(&self) -> &'static str {
        match self {
            Self::Active => "1h-4h",
            Self::Relaxed => "4h-12h",
            Self::Passive => "12h-3d",
        }
    }

    /// Engine parameters for this style.
    pub fn profile(&self) -> StyleProfile {
        match self {
            Self::Active => StyleProfile {
                rsi_period: 6,
                rsi_oversold: 15.0,
                rsi_overbought: 85.0,
                ema_fast: 9,
                ema_mid: 20,
                ema_slow: 50,
                risk_reward_ratio: 2.0,
                atr_multiplier: 0.8,
                requires_trend_filter: true,
                divergence_lookback: 30,
            },
            Self::Relaxed => StyleProfile {
                rsi_period: 8,
                rsi_oversold: 18.0,
                rsi_overbought: 82.0,
                ema_fast: 20,
                ema_mid: 50,
                ema_slow: 200,
                risk_reward_ratio: 2.5,
                atr_multiplier: 1.0,
                requires_trend_filter: true,
                divergence_lookback: 30,
            },
            Self::Passive => StyleProfile {
                rsi_period: 14,
                rsi_oversold: 15.0,
                rsi_overbought: 85.0,
                ema_fast: 20,
                ema_mid: 50,
                ema_slow: 200,
                risk_reward_ratio: 3.0,
                atr_multiplier: 1.5,
                requires_trend_filter: true,
                divergence_lookback: 30,
            },
        }
    }

    /// Minimum series length for a scan to produce anything.
    pub fn min_series_len(&self) -> usize {
        match self {
            Self::Active => 10,
            Self::Relaxed => 8,
            Self::Passive => 6,
        }
    }

    /// First bar index a scan evaluates (indicator warm-up skip).
    pub fn scan_start(&self) -> usize {
        match self {
            Self::Active => 8,
            Self::Relaxed => 6,
            Self::Passive => 4,
        }
    }

    /// Bar stride between scan evaluations.
    pub fn scan_stride(&self) -> usize {
        match self {
            Self::Active => 1,
            Self::Relaxed => 2,
            Self::Passive => 3,
        }
    }

    /// Hours an open tracked signal may live before it expires.
    pub fn expiry_hours(&self) -> i64 {
        match self {
            Self::Active => 24,
            Self::Relaxed => 24,
            Self::Passive => 48,
        }
    }
}

/// Immutable engine parameters attached to a trading style.
///
/// Fields are public so callers can derive variants (e.g. dropping the
/// trend filter for short series without EMA-200 context).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleProfile {
    /// RSI lookback period.
    pub rsi_period: usize,
    /// RSI at or below this is oversold.
    pub rsi_oversold: f64,
    /// RSI at or above this is overbought.
    pub rsi_overbought: f64,
    /// Fast EMA period.
    pub ema_fast: usize,
    /// Mid EMA period.
    pub ema_mid: usize,
    /// Slow EMA period.
    pub ema_slow: usize,
    /// Target distance as a multiple of stop distance.
    pub risk_reward_ratio: f64,
    /// ATR multiple for fallback stop placement.
    pub atr_multiplier: f64,
    /// Require close on the trend side of EMA-200.
    pub requires_trend_filter: bool,
    /// Bars searched backward for divergence pivots.
    pub divergence_lookback: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_from_str() {
        assert_eq!(TradingStyle::from_str("active"), Some(TradingStyle::Active));
        assert_eq!(TradingStyle::from_str("Relaxed"), Some(TradingStyle::Relaxed));
        assert_eq!(TradingStyle::from_str("passive"), Some(TradingStyle::Passive));
        assert_eq!(TradingStyle::from_str("invalid"), None);
    }

    #[test]
    fn test_style_from_str_legacy_aliases() {
        assert_eq!(TradingStyle::from_str("aktif"), Some(TradingStyle::Active));
        assert_eq!(TradingStyle::from_str("santai"), Some(TradingStyle::Relaxed));
        assert_eq!(TradingStyle::from_str("pasif"), Some(TradingStyle::Passive));
    }

    #[test]
    fn test_style_serialization() {
        let json = serde_json::to_string(&TradingStyle::Active).unwrap();
        assert_eq!(json, "\"active\"");

        let parsed: TradingStyle = serde_json::from_str("\"passive\"").unwrap();
        assert_eq!(parsed, TradingStyle::Passive);
    }

    #[test]
    fn test_profile_parameters() {
        let active = TradingStyle::Active.profile();
        assert_eq!(active.rsi_period, 6);
        assert_eq!(active.rsi_oversold, 15.0);
        assert_eq!(active.ema_fast, 9);
        assert_eq!(active.risk_reward_ratio, 2.0);

        let relaxed = TradingStyle::Relaxed.profile();
        assert_eq!(relaxed.rsi_period, 8);
        assert_eq!(relaxed.rsi_overbought, 82.0);
        assert_eq!(relaxed.ema_slow, 200);

        let passive = TradingStyle::Passive.profile();
        assert_eq!(passive.rsi_period, 14);
        assert_eq!(passive.atr_multiplier, 1.5);
        assert!(passive.requires_trend_filter);
    }

    #[test]
    fn test_scan_geometry_by_style() {
        assert_eq!(TradingStyle::Active.min_series_len(), 10);
        assert_eq!(TradingStyle::Relaxed.min_series_len(), 8);
        assert_eq!(TradingStyle::Passive.min_series_len(), 6);

        assert_eq!(TradingStyle::Active.scan_start(), 8);
        assert_eq!(TradingStyle::Relaxed.scan_start(), 6);
        assert_eq!(TradingStyle::Passive.scan_start(), 4);

        assert_eq!(TradingStyle::Active.scan_stride(), 1);
        assert_eq!(TradingStyle::Relaxed.scan_stride(), 2);
        assert_eq!(TradingStyle::Passive.scan_stride(), 3);
    }

    #[test]
    fn test_expiry_hours() {
        assert_eq!(TradingStyle::Active.expiry_hours(), 24);
        assert_eq!(TradingStyle::Relaxed.expiry_hours(), 24);
        assert_eq!(TradingStyle::Passive.expiry_hours(), 48);
    }
}
