use super::{Middleware, Next};
use crate::actions::{Action, ActionCategory, ActionKind};
use crate::error::Result;
use crate::state::State;
use crate::store::Store;
use crate::sync::{SyncHub, SyncPort};
use crate::types::Timestamp;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Channel joined on the hub.
    pub channel: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            channel: "quote-builder".to_string(),
        }
    }
}

/// Keeps stores on the same channel in step.
///
/// After a dispatch changes the selections, pricing or progress, the new
/// slice is published to peers. Inbound messages are applied as
/// `SYNC_FROM_PEER` dispatches, either at the start of the next local
/// dispatch or on an explicit [`CrossTabSync::receive_pending`]. Peer updates
/// and storage restores are never re-published, and inbound messages older
/// than the last one applied are ignored.
pub struct CrossTabSync {
    port: SyncPort,
    last_remote: Mutex<Option<Timestamp>>,
}

impl CrossTabSync {
    pub fn new(port: SyncPort) -> Self {
        Self {
            port,
            last_remote: Mutex::new(None),
        }
    }

    /// Join `config.channel` on `hub`.
    pub fn join(hub: &Arc<SyncHub>, config: SyncConfig) -> Self {
        Self::new(hub.join(config.channel))
    }

    pub fn port(&self) -> &SyncPort {
        &self.port
    }

    /// Apply every inbound message. Returns how many were dispatched.
    pub fn receive_pending(&self, store: &Store) -> usize {
        let mut applied = 0;
        for message in self.port.drain() {
            {
                let mut last = self.last_remote.lock();
                if last.map_or(false, |seen| message.timestamp < seen) {
                    tracing::debug!(
                        origin = message.origin,
                        timestamp = message.timestamp.0,
                        "ignoring stale peer update"
                    );
                    continue;
                }
                *last = Some(message.timestamp);
            }

            let action = Action::SyncFromPeer {
                slice: message.slice,
                timestamp: message.timestamp,
            };
            match store.dispatch(action) {
                Ok(_) => applied += 1,
                Err(e) => tracing::error!(origin = message.origin, error = %e, "failed to apply peer update"),
            }
        }
        applied
    }

    fn publish(&self, kind: ActionKind, state: &State) {
        let peers = self.port.publish(kind, state.slice(), Timestamp::now());
        tracing::trace!(kind = %kind, peers, channel = self.port.channel(), "published");
    }
}

fn slice_changed(prev: &State, next: &State) -> bool {
    !Arc::ptr_eq(&prev.selections, &next.selections)
        || !Arc::ptr_eq(&prev.pricing, &next.pricing)
        || !Arc::ptr_eq(&prev.progress, &next.progress)
}

impl Middleware for CrossTabSync {
    fn name(&self) -> &'static str {
        "sync"
    }

    fn handle(&self, store: &Store, action: Action, next: &Next<'_>) -> Result<Arc<State>> {
        self.receive_pending(store);

        let kind = action.kind();
        let prev = store.working_state();
        let state = next(action)?;

        let publishable = kind.category() != ActionCategory::Storage && !kind.is_transient();
        if publishable && slice_changed(&prev, &state) {
            self.publish(kind, &state);
        }
        Ok(state)
    }

    fn on_restore(&self, _store: &Store, state: &Arc<State>) {
        self.publish(ActionKind::RestoreState, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreConfig;

    fn joined(hub: &Arc<SyncHub>) -> (Store, Arc<CrossTabSync>) {
        let sync = Arc::new(CrossTabSync::join(hub, SyncConfig::default()));
        let store = Store::builder(StoreConfig::default())
            .with_arc(sync.clone())
            .build()
            .unwrap();
        (store, sync)
    }

    #[test]
    fn test_changes_reach_peer() {
        let hub = SyncHub::new();
        let (a, a_sync) = joined(&hub);
        let (b, b_sync) = joined(&hub);

        a.dispatch(Action::toggle_feature("extra-seo")).unwrap();
        assert_eq!(b_sync.receive_pending(&b), 1);

        let state = b.get_state();
        assert!(state.selections.features.contains("extra-seo"));
        assert!(state.system.last_remote_sync.is_some());

        // The peer update is not echoed back.
        assert_eq!(a_sync.receive_pending(&a), 0);
    }

    #[test]
    fn test_transient_changes_not_published() {
        let hub = SyncHub::new();
        let (a, _a_sync) = joined(&hub);
        let (_b, b_sync) = joined(&hub);

        a.dispatch(Action::SetLoading { loading: true }).unwrap();
        a.dispatch(Action::PreviousStep).unwrap();
        assert!(b_sync.port().try_recv().is_none());
    }

    #[test]
    fn test_stale_messages_ignored() {
        let hub = SyncHub::new();
        let (b, b_sync) = joined(&hub);
        let peer = hub.join("quote-builder");

        let mut newer = State::initial(5);
        newer.progress = Arc::new(crate::state::Progress {
            current_step: 4,
            total_steps: 5,
        });
        peer.publish(ActionKind::SetStep, newer.slice(), Timestamp(200));
        peer.publish(ActionKind::SetStep, State::initial(5).slice(), Timestamp(100));

        assert_eq!(b_sync.receive_pending(&b), 1);
        assert_eq!(b.get_state().progress.current_step, 4);
    }

    #[test]
    fn test_inbound_applied_on_next_dispatch() {
        let hub = SyncHub::new();
        let (a, _a_sync) = joined(&hub);
        let (b, _b_sync) = joined(&hub);

        a.dispatch(Action::toggle_feature("x")).unwrap();
        b.dispatch(Action::OpenModal { id: "summary".into() }).unwrap();

        let state = b.get_state();
        assert!(state.selections.features.contains("x"));
        assert!(state.ui.is_modal_open("summary"));
    }

    #[test]
    fn test_undo_is_published() {
        let hub = SyncHub::new();
        let (a, _a_sync) = joined(&hub);
        let (b, b_sync) = joined(&hub);

        a.dispatch(Action::toggle_feature("x")).unwrap();
        assert!(a.undo());

        assert_eq!(b_sync.receive_pending(&b), 2);
        assert!(b.get_state().selections.features.is_empty());
    }
}
