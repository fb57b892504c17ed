//! Persistence boundary: where the persistable slice of state is kept.
//!
//! The store never touches a storage medium directly. The persistence
//! middleware calls [`StateStorage::save`] with a [`PersistedState`] (the
//! selections, pricing and progress regions, never UI state or the catalog)
//! and [`StateStorage::load`] once at startup.

mod file;
mod storage;

pub use file::FileStorage;
pub use storage::{MemoryStorage, PersistedState, StateStorage, PERSISTED_VERSION};
