//! Per-bar indicator computations.
//!
//! Every function here is a pure series transform: input and output are
//! column-aligned, and any value at index i depends only on bars at
//! indices <= i.

pub mod atr;
pub mod ema;
pub mod features;
pub mod rsi;

pub use atr::{atr_series, true_range};
pub use ema::ema_series;
pub use features::{compute_features, CandleFeatures};
pub use rsi::rsi_series;
