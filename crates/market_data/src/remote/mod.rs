pub mod binance_client;
pub mod binance_poller;
pub mod kline_response;

pub use binance_client::{AccountInformation, Balance, BinanceClient, OrderResponse};
pub use binance_poller::BinancePoller;
pub use kline_response::KlineRow;
