//! Candor - Honest technical-analysis signal engine for crypto markets

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;
pub mod util;

// Re-export commonly used types
pub use api::AppState;
pub use config::Config;
pub use error::{AppError, EngineError};
pub use types::*;
