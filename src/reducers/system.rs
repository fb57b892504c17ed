//! System lifecycle and storage-sourced state.

use super::derive;
use crate::actions::Action;
use crate::error::{Result, StoreError};
use crate::state::{State, StateSlice, SystemState};
use std::sync::Arc;

pub(super) fn reduce(state: &Arc<State>, action: &Action) -> Result<Arc<State>> {
    match action {
        Action::Initialize => {
            if state.system.initialized {
                return Ok(Arc::clone(state));
            }
            let system = SystemState {
                initialized: true,
                ..(*state.system).clone()
            };
            Ok(derive(state, |s| s.system = Arc::new(system)))
        }
        // A fresh tree; the store clears history alongside.
        Action::ResetSystem => Ok(Arc::new(State::initial(state.progress.total_steps))),
        Action::RestoreState { slice } => {
            check_progress(state, action, slice)?;
            Ok(Arc::new(state.with_slice(slice)))
        }
        Action::SyncFromPeer { slice, timestamp } => {
            check_progress(state, action, slice)?;
            let system = SystemState {
                last_remote_sync: Some(*timestamp),
                ..(*state.system).clone()
            };
            let mut next = state.with_slice(slice);
            next.system = Arc::new(system);
            Ok(Arc::new(next))
        }
        _ => Ok(Arc::clone(state)),
    }
}

/// Stored and peer slices are untrusted: their progress must fit this store.
fn check_progress(state: &State, action: &Action, slice: &StateSlice) -> Result<()> {
    slice
        .progress
        .fits(state.progress.total_steps)
        .map_err(|reason| StoreError::reducer(action.kind(), reason))
}
