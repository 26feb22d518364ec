//! In-memory state store.
//!
//! Used by tests and development runs without touching the filesystem.
//! Thread-safe behind a plain RwLock; the engine is the only writer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use ebb_domain::PositionState;

use crate::error::StoreError;
use crate::repository::StateStore;

/// In-memory store for testing.
#[derive(Default)]
pub struct MemoryStateStore {
    state: RwLock<Option<PositionState>>,
    save_count: AtomicU64,
}

impl MemoryStateStore {
    /// Create an empty store (loads as `None`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a persisted record.
    pub fn seeded(state: PositionState) -> Self {
        Self {
            state: RwLock::new(Some(state)),
            save_count: AtomicU64::new(0),
        }
    }

    /// Number of saves performed, for write-amplification assertions.
    pub fn save_count(&self) -> u64 {
        self.save_count.load(Ordering::SeqCst)
    }

    /// Current persisted record, if any.
    pub fn current(&self) -> Option<PositionState> {
        self.state.read().expect("memory store lock").clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<Option<PositionState>, StoreError> {
        Ok(self.state.read().expect("memory store lock").clone())
    }

    async fn save(&self, state: &PositionState) -> Result<(), StoreError> {
        *self.state.write().expect("memory store lock") = Some(state.clone());
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
