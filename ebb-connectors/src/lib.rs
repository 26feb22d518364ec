//! Ebb Connectors Layer
//!
//! REST adapters for the Binance venue: spot klines for market data, signed
//! USDT-margined futures orders for execution.

#![warn(clippy::all)]

pub mod binance;

pub use binance::{BinanceFutures, BinanceMarketData};
