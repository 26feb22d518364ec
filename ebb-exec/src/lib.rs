//! Ebb Execution Layer
//!
//! Port definitions for the market data feed and the order execution venue,
//! lot-size normalization shared by every adapter, and in-memory stubs for
//! tests.

#![warn(clippy::all)]

pub mod error;
pub mod lot;
pub mod ports;
pub mod stub;

pub use error::{ExecError, FeedError};
pub use lot::{normalize_qty, LotSizeFilter};
pub use ports::{MarketDataFeed, OrderExecutionService};
pub use stub::{PlacedOrder, StubExchange, StubFeed};
