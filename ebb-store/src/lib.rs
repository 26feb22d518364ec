//! Ebb Store Layer
//!
//! Durable persistence for the single position-state record. One file
//! implementation with atomic replace-on-write, one in-memory implementation
//! for tests.

#![warn(clippy::all)]

pub mod error;
pub mod file;
pub mod memory;
pub mod repository;

pub use error::StoreError;
pub use file::FileStateStore;
pub use memory::MemoryStateStore;
pub use repository::StateStore;
