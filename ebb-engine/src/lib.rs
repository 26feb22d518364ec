//! Ebb Engine Layer
//!
//! Pure decision logic, deterministic, no I/O.
//! Takes candle series and position state, returns actions to execute.

#![warn(clippy::all)]

pub mod entry;
pub mod error;
pub mod exit;
pub mod regime;

pub use entry::{evaluate_entry, EntrySignal};
pub use error::EngineError;
pub use exit::{evaluate_open_position, ExitAction};
pub use regime::{anchor_instant, detect_regime, AnchorCache};
