/// External HTTP API clients
///
/// Each client owns its rate limiter and maps transport failures to
/// `ApiError`.
pub mod binance;
pub mod client;
pub mod tokensniffer;
pub mod tradingstrategy;

pub use binance::BinanceClient;
pub use client::{HttpClient, RateLimiter};
pub use tokensniffer::TokenSnifferClient;
pub use tradingstrategy::TradingStrategyClient;
