//! Subscription types for state change notifications.

use crate::actions::ActionKind;
use crate::state::State;
use crate::types::Revision;
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Identifier of a subscription, unique per store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SubscriptionId(pub u64);

/// Configuration for a channel subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered events before the subscriber is dropped.
    /// Default: 256
    pub buffer_size: usize,

    /// Filter criteria.
    pub filter: SubscriptionFilter,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 256,
            filter: SubscriptionFilter::default(),
        }
    }
}

/// Filter criteria for channel subscriptions.
#[derive(Clone, Debug)]
pub struct SubscriptionFilter {
    /// Only changes caused by these kinds (None = all kinds).
    pub kinds: Option<Vec<ActionKind>>,

    /// Include changes caused by undo/redo.
    pub include_history_moves: bool,
}

impl Default for SubscriptionFilter {
    fn default() -> Self {
        Self {
            kinds: None,
            include_history_moves: true,
        }
    }
}

impl SubscriptionFilter {
    /// Subscribe to changes caused by specific kinds only.
    pub fn kinds(kinds: Vec<ActionKind>) -> Self {
        Self {
            kinds: Some(kinds),
            include_history_moves: false,
        }
    }

    pub(crate) fn matches(&self, cause: &ChangeCause) -> bool {
        match cause {
            ChangeCause::Action(kind) => self
                .kinds
                .as_ref()
                .map_or(true, |kinds| kinds.contains(kind)),
            ChangeCause::Undo | ChangeCause::Redo => self.include_history_moves,
        }
    }
}

/// What produced a committed state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "kind", rename_all = "snake_case")]
pub enum ChangeCause {
    Action(ActionKind),
    Undo,
    Redo,
}

/// Events delivered to channel subscribers.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    /// A new state was committed.
    StateChanged {
        revision: Revision,
        cause: ChangeCause,
        state: Arc<State>,
    },

    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Receiving end of a channel subscription.
#[derive(Debug)]
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    pub(crate) receiver: Receiver<StoreEvent>,
}

impl SubscriptionHandle {
    /// Block until the next event.
    pub fn recv(&self) -> Result<StoreEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<StoreEvent, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    pub fn try_recv(&self) -> Result<StoreEvent, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Everything buffered right now.
    pub fn drain(&self) -> Vec<StoreEvent> {
        self.receiver.try_iter().collect()
    }
}
