//! In-process broadcast channels for keeping several stores in step.
//!
//! A [`SyncHub`] holds named channels. Each store joins a channel with a
//! [`SyncPort`]; a message published on a port is delivered to every other
//! port on the same channel, never back to the sender.

use crate::actions::ActionKind;
use crate::state::StateSlice;
use crate::types::Timestamp;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A state update broadcast to peers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMessage {
    pub channel: String,
    /// Port id of the publisher.
    pub origin: u64,
    pub action_kind: ActionKind,
    pub slice: StateSlice,
    pub timestamp: Timestamp,
}

struct Peer {
    id: u64,
    sender: Sender<SyncMessage>,
}

/// Registry of named broadcast channels.
pub struct SyncHub {
    channels: Mutex<HashMap<String, Vec<Peer>>>,
    next_id: AtomicU64,
}

impl SyncHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            channels: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Join `channel`, creating it on first use.
    pub fn join(self: &Arc<Self>, channel: impl Into<String>) -> SyncPort {
        let channel = channel.into();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = unbounded();

        self.channels
            .lock()
            .entry(channel.clone())
            .or_default()
            .push(Peer { id, sender });
        tracing::debug!(channel = %channel, port = id, "joined sync channel");

        SyncPort {
            id,
            channel,
            hub: Arc::clone(self),
            receiver,
        }
    }

    /// Number of ports currently joined to `channel`.
    pub fn peer_count(&self, channel: &str) -> usize {
        self.channels.lock().get(channel).map_or(0, Vec::len)
    }

    fn broadcast(&self, message: &SyncMessage) -> usize {
        let mut channels = self.channels.lock();
        let Some(peers) = channels.get_mut(&message.channel) else {
            return 0;
        };

        let mut delivered = 0;
        peers.retain(|peer| {
            if peer.id == message.origin {
                return true;
            }
            match peer.sender.send(message.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });
        delivered
    }

    fn leave(&self, channel: &str, id: u64) {
        let mut channels = self.channels.lock();
        if let Some(peers) = channels.get_mut(channel) {
            peers.retain(|peer| peer.id != id);
            if peers.is_empty() {
                channels.remove(channel);
            }
        }
    }
}

/// One store's membership in a channel. Leaves the channel on drop.
pub struct SyncPort {
    id: u64,
    channel: String,
    hub: Arc<SyncHub>,
    receiver: Receiver<SyncMessage>,
}

impl SyncPort {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Send `slice` to every other port on the channel.
    ///
    /// Returns the number of peers it was delivered to.
    pub fn publish(&self, action_kind: ActionKind, slice: StateSlice, timestamp: Timestamp) -> usize {
        let message = SyncMessage {
            channel: self.channel.clone(),
            origin: self.id,
            action_kind,
            slice,
            timestamp,
        };
        self.hub.broadcast(&message)
    }

    pub fn try_recv(&self) -> Option<SyncMessage> {
        self.receiver.try_recv().ok()
    }

    /// Everything received so far, oldest first.
    pub fn drain(&self) -> Vec<SyncMessage> {
        self.receiver.try_iter().collect()
    }
}

impl Drop for SyncPort {
    fn drop(&mut self) {
        self.hub.leave(&self.channel, self.id);
    }
}

impl std::fmt::Debug for SyncPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncPort")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .finish()
    }
}
