pub mod client;
pub mod errors;
pub mod types;
pub mod universe;

pub use client::{BinanceClient, CandleSource, build_http_client};
pub use errors::ExchangeError;
pub use types::*;
