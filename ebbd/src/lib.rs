//! Ebb Daemon
//!
//! Runtime orchestrator: environment configuration, the trading engine cycle
//! with its fail-safe boundary, and the scheduler loop.

#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod error;

pub use config::Config;
pub use engine::{EngineContext, TradingEngine};
pub use error::{DaemonError, DaemonResult};
