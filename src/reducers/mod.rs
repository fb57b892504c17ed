//! Reducer registry: pure `(state, action) -> state` transitions.
//!
//! Every reducer returns either the input reference unchanged (no-op) or a
//! new root whose untouched regions are shared with the input. The store
//! relies on this to skip notification for no-ops, and selectors rely on it
//! for memo invalidation.
//!
//! Reducers never catch: a failure is returned to the dispatch pipeline and
//! the store keeps its last committed state.

mod data;
mod pricing;
mod progress;
mod selection;
mod system;
mod ui;

pub use pricing::{price_lines, PriceLine, PriceSource};

use crate::actions::{Action, ActionCategory};
use crate::error::Result;
use crate::state::State;
use std::sync::Arc;

/// Apply `action` to `state`.
pub fn reduce(state: &Arc<State>, action: &Action) -> Result<Arc<State>> {
    match action {
        Action::Batch { actions } => {
            let mut current = Arc::clone(state);
            for inner in actions {
                current = reduce(&current, inner)?;
            }
            Ok(current)
        }
        Action::FlushBatch | Action::Unknown { .. } => Ok(Arc::clone(state)),
        _ => match action.kind().category() {
            ActionCategory::Package
            | ActionCategory::Feature
            | ActionCategory::Addon
            | ActionCategory::Component
            | ActionCategory::Emergency
            | ActionCategory::ServiceArea => selection::reduce(state, action),
            ActionCategory::Price => pricing::reduce(state, action),
            ActionCategory::Progress => progress::reduce(state, action),
            ActionCategory::Data => data::reduce(state, action),
            ActionCategory::Ui => ui::reduce(state, action),
            ActionCategory::Storage | ActionCategory::System => system::reduce(state, action),
        },
    }
}

/// Copy the root, let `edit` replace regions, and wrap the result.
pub(crate) fn derive(state: &State, edit: impl FnOnce(&mut State)) -> Arc<State> {
    let mut next = state.clone();
    edit(&mut next);
    Arc::new(next)
}
