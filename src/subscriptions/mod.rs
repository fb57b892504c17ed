//! Subscriptions to committed state.
//!
//! Two kinds of subscriber share one ordered list:
//! - callbacks, invoked synchronously with each committed state
//! - bounded channels receiving [`StoreEvent`]s, dropped when they fall behind
//!
//! Subscribers are notified after the commit, in registration order, exactly
//! once per state change.
//!
//! # Example
//!
//! ```ignore
//! let handle = store.subscribe_channel(SubscriptionConfig {
//!     filter: SubscriptionFilter::kinds(vec![ActionKind::CalculatePrice]),
//!     ..Default::default()
//! });
//!
//! loop {
//!     match handle.recv() {
//!         Ok(StoreEvent::StateChanged { state, .. }) => render(&state),
//!         Ok(StoreEvent::Dropped { .. }) | Err(_) => break,
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::{Callback, SubscriptionManager};
pub use types::{
    ChangeCause, DropReason, StoreEvent, SubscriptionConfig, SubscriptionFilter,
    SubscriptionHandle, SubscriptionId,
};
