//! Signal engine.
//!
//! Pure, synchronous pipeline from raw OHLCV bars to scored trade
//! candidates: indicator annotation, structure detection, confluence
//! scoring, stop/target placement and forward replay. Nothing in this
//! tree performs I/O; services and API handlers feed it data.

pub mod builder;
pub mod confidence;
pub mod confluence;
pub mod indicators;
pub mod replay;
pub mod scan;
pub mod series;
pub mod structure;

pub use builder::{build_trade_levels, TradeLevels};
pub use confidence::{
    blend_opinions, honest_confidence, BlendedOpinion, OpinionAgreement, CONFIDENCE_CAP,
};
pub use confluence::{
    evaluate_confluence, ConfluenceInputs, ConfluenceScore, CONFLUENCE_REQUIRED, CONFLUENCE_TOTAL,
};
pub use replay::{replay, replay_all, ReplayReport, ReplayResult, DEFAULT_REPLAY_HORIZON};
pub use scan::{evaluate_bar, scan, scan_with_profile, ScanOptions, DEFAULT_CONFIDENCE_MINIMUM};
pub use series::AnnotatedSeries;
pub use structure::{detect_divergence, detect_support_resistance, StructureLevels};

use crate::error::EngineError;
use crate::types::Candle;

/// Annotate a raw series with the full indicator set.
pub fn compute_indicators(candles: Vec<Candle>) -> Result<AnnotatedSeries, EngineError> {
    AnnotatedSeries::compute(candles)
}
