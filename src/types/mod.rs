pub mod candle;
pub mod signal;
pub mod style;

pub use candle::*;
pub use signal::*;
pub use style::*;
