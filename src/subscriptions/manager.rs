//! Subscription manager: fans committed states out to subscribers.

use crate::state::State;
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::types::{
    ChangeCause, DropReason, StoreEvent, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
};
use crate::types::Revision;

/// Callback invoked with every committed state.
pub type Callback = Arc<dyn Fn(&Arc<State>) + Send + Sync>;

#[derive(Clone)]
enum Sink {
    Callback(Callback),
    Channel {
        config: SubscriptionConfig,
        sender: Sender<StoreEvent>,
    },
}

#[derive(Clone)]
struct Subscription {
    id: SubscriptionId,
    sink: Sink,
}

/// Manages subscriptions in registration order.
pub struct SubscriptionManager {
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Register a callback.
    pub fn subscribe(&self, callback: Callback) -> SubscriptionId {
        let id = self.next_id();
        self.subscriptions.write().push(Subscription {
            id,
            sink: Sink::Callback(callback),
        });
        id
    }

    /// Register a bounded channel subscriber.
    pub fn subscribe_channel(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let id = self.next_id();
        let (sender, receiver) = bounded(config.buffer_size.max(1));
        self.subscriptions.write().push(Subscription {
            id,
            sink: Sink::Channel { config, sender },
        });
        SubscriptionHandle { id, receiver }
    }

    /// Unsubscribe and clean up. Returns false for an unknown id.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscriptions.write();
        let Some(position) = subs.iter().position(|s| s.id == id) else {
            return false;
        };
        let removed = subs.remove(position);
        if let Sink::Channel { sender, .. } = removed.sink {
            let _ = sender.try_send(StoreEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
        true
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Notify every subscriber, in registration order.
    ///
    /// Runs against a snapshot of the list taken up front, so callbacks may
    /// subscribe, unsubscribe or dispatch without deadlocking. Channel
    /// subscribers whose buffer is full are dropped.
    pub fn notify(&self, state: &Arc<State>, revision: Revision, cause: ChangeCause) {
        let snapshot: Vec<Subscription> = self.subscriptions.read().clone();
        let mut to_remove = Vec::new();

        for sub in &snapshot {
            match &sub.sink {
                Sink::Callback(callback) => callback(state),
                Sink::Channel { config, sender } => {
                    if !config.filter.matches(&cause) {
                        continue;
                    }
                    let event = StoreEvent::StateChanged {
                        revision,
                        cause,
                        state: Arc::clone(state),
                    };
                    match sender.try_send(event) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                            to_remove.push(sub.id);
                        }
                    }
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            subs.retain(|sub| {
                if !to_remove.contains(&sub.id) {
                    return true;
                }
                if let Sink::Channel { sender, .. } = &sub.sink {
                    tracing::warn!(subscription = sub.id.0, "dropping slow subscriber");
                    // Might fail, that's ok.
                    let _ = sender.try_send(StoreEvent::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
                false
            });
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}
