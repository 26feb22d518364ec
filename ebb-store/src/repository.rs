//! Storage port for the durable position state.
//!
//! The engine owns exactly one record; implementations only have to load and
//! replace it. Interpretation of a missing or corrupt record (boot flat,
//! recompute the stop-loss) belongs to the daemon, not the store.

use async_trait::async_trait;
use ebb_domain::PositionState;

use crate::error::StoreError;

/// Durable store for the single position-state record.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the persisted record; `None` when nothing was ever saved.
    async fn load(&self) -> Result<Option<PositionState>, StoreError>;

    /// Replace the persisted record. Must be atomic: a crash mid-save leaves
    /// either the old record or the new one, never a torn write.
    async fn save(&self, state: &PositionState) -> Result<(), StoreError>;
}
