//! Storage trait and the in-memory implementation.

use crate::error::Result;
use crate::state::StateSlice;
use crate::types::Timestamp;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Version of the [`PersistedState`] payload shape.
pub const PERSISTED_VERSION: u32 = 1;

/// What gets written to storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub version: u32,
    pub saved_at: Timestamp,
    pub slice: StateSlice,
}

impl PersistedState {
    /// Wrap `slice`, stamped with the current time.
    pub fn new(slice: StateSlice) -> Self {
        Self {
            version: PERSISTED_VERSION,
            saved_at: Timestamp::now(),
            slice,
        }
    }

    /// True if the payload was saved less than `max_age` ago and has a
    /// version this build understands.
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        self.version == PERSISTED_VERSION && self.saved_at.age() < max_age
    }
}

/// A storage medium for the persisted slice.
pub trait StateStorage: Send + Sync {
    fn save(&self, state: &PersistedState) -> Result<()>;

    /// The last saved payload, or `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<PersistedState>>;

    fn clear(&self) -> Result<()>;
}

/// Keeps the last saved payload in memory. Counts saves.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<PersistedState>>,
    saves: Mutex<u64>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with `state`, as if a previous session saved it.
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            slot: Mutex::new(Some(state)),
            saves: Mutex::new(0),
        }
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> u64 {
        *self.saves.lock()
    }
}

impl StateStorage for MemoryStorage {
    fn save(&self, state: &PersistedState) -> Result<()> {
        *self.slot.lock() = Some(state.clone());
        *self.saves.lock() += 1;
        Ok(())
    }

    fn load(&self) -> Result<Option<PersistedState>> {
        Ok(self.slot.lock().clone())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}
