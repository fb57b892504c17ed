//! # Quote Store
//!
//! The state core of a multi-step quote configurator: one store owning an
//! immutable state tree, changed only by dispatching actions.
//!
//! ## Core Concepts
//!
//! - **Actions**: Closed enum of intended changes, `{ kind, payload }` on the wire
//! - **Reducers**: Pure `(state, action) -> state`, sharing untouched regions
//! - **Middleware**: Ordered interceptors around the reducer (logging,
//!   persistence, throttling, batching, caching, retry, sync)
//! - **Selectors**: Derived views memoized on state identity
//! - **History**: Bounded linear undo/redo over state snapshots
//!
//! ## Example
//!
//! ```ignore
//! use quote_store::{standard_pipeline, Action, Selectors, StandardOptions, Store, StoreConfig};
//!
//! let store = Store::builder(StoreConfig::default())
//!     .with_all(standard_pipeline(StandardOptions::default()))
//!     .build()?;
//! let selectors = Selectors::new();
//!
//! store.subscribe(move |state| {
//!     println!("total: {}", selectors.final_price.select(state));
//! });
//!
//! store.dispatch(Action::select_package("growth"))?;
//! store.dispatch(Action::toggle_feature("extra-seo"))?;
//! store.dispatch(Action::CalculatePrice)?;
//! store.undo();
//! ```

pub mod actions;
pub mod error;
pub mod history;
pub mod middleware;
pub mod persistence;
pub mod reducers;
pub mod selectors;
pub mod state;
pub mod store;
pub mod subscriptions;
pub mod sync;
pub mod types;

// Re-exports
pub use actions::{Action, ActionCategory, ActionKind, HistoryPolicy};
pub use error::{Result, StoreError};
pub use history::{History, HistoryEntry};
pub use middleware::{standard_pipeline, Middleware, Next, StandardOptions};
pub use persistence::{FileStorage, MemoryStorage, PersistedState, StateStorage};
pub use reducers::reduce;
pub use selectors::{QuoteSummary, Selector, Selectors, ValidationIssue};
pub use state::{
    Catalog, CatalogItem, Package, Pricing, Progress, SelectionSet, Selections, ServiceArea,
    State, StateSlice, SystemState, UiState,
};
pub use store::{Checkpoint, Store, StoreBuilder, StoreConfig, WeakStore};
pub use subscriptions::{
    ChangeCause, DropReason, StoreEvent, SubscriptionConfig, SubscriptionFilter,
    SubscriptionHandle, SubscriptionId,
};
pub use sync::{SyncHub, SyncMessage, SyncPort};
pub use types::*;
