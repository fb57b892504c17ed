use super::{Middleware, Next};
use crate::actions::{Action, ActionCategory, ActionKind};
use crate::error::Result;
use crate::state::State;
use crate::store::Store;
use crate::types::Timestamp;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

/// One tracked dispatch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnalyticsEvent {
    pub kind: ActionKind,
    pub category: ActionCategory,
    pub timestamp: Timestamp,
    pub succeeded: bool,
    /// Whether the dispatch produced a new state.
    pub changed: bool,
}

/// Destination for analytics events.
pub trait AnalyticsSink: Send + Sync {
    fn track(&self, event: AnalyticsEvent);
}

/// Emits each event as an `info` log line.
#[derive(Debug, Default)]
pub struct TracingSink;

impl AnalyticsSink for TracingSink {
    fn track(&self, event: AnalyticsEvent) {
        tracing::info!(
            target: "quote_store::analytics",
            kind = %event.kind,
            category = ?event.category,
            succeeded = event.succeeded,
            changed = event.changed,
            "action tracked"
        );
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AnalyticsSink for RecordingSink {
    fn track(&self, event: AnalyticsEvent) {
        self.events.lock().push(event);
    }
}

/// Reports user-driven dispatches to an [`AnalyticsSink`].
///
/// UI-category actions and unknown kinds are not tracked.
pub struct AnalyticsMiddleware {
    sink: Arc<dyn AnalyticsSink>,
}

impl AnalyticsMiddleware {
    pub fn new(sink: Arc<dyn AnalyticsSink>) -> Self {
        Self { sink }
    }
}

impl Middleware for AnalyticsMiddleware {
    fn name(&self) -> &'static str {
        "analytics"
    }

    fn handle(&self, store: &Store, action: Action, next: &Next<'_>) -> Result<Arc<State>> {
        let kind = action.kind();
        let category = kind.category();
        if category == ActionCategory::Ui || kind == ActionKind::Unknown {
            return next(action);
        }

        let prev = store.working_state();
        let result = next(action);
        self.sink.track(AnalyticsEvent {
            kind,
            category,
            timestamp: Timestamp::now(),
            succeeded: result.is_ok(),
            changed: result
                .as_ref()
                .map_or(false, |state| !Arc::ptr_eq(state, &prev)),
        });
        result
    }
}
