use super::{Middleware, Next};
use crate::actions::Action;
use crate::error::Result;
use crate::state::State;
use crate::store::Store;
use std::sync::Arc;
use std::time::Instant;

/// Logs every dispatch at `debug`, with a `trace` span around the rest of
/// the chain.
#[derive(Debug, Default)]
pub struct LoggerMiddleware;

impl LoggerMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for LoggerMiddleware {
    fn name(&self) -> &'static str {
        "logger"
    }

    fn handle(&self, store: &Store, action: Action, next: &Next<'_>) -> Result<Arc<State>> {
        let kind = action.kind();
        let revision = store.revision();
        let prev = store.working_state();
        let start = Instant::now();

        let span = tracing::trace_span!("dispatch", kind = %kind, %revision);
        let result = span.in_scope(|| next(action));
        let elapsed_us = start.elapsed().as_micros() as u64;

        match &result {
            Ok(state) => tracing::debug!(
                kind = %kind,
                %revision,
                changed = !Arc::ptr_eq(state, &prev),
                elapsed_us,
                "dispatched"
            ),
            Err(e) => tracing::debug!(kind = %kind, %revision, error = %e, elapsed_us, "dispatch failed"),
        }
        result
    }
}
