pub mod binance;
pub mod binance_ws;

pub use binance::BinanceClient;
pub use binance_ws::BinanceWs;
