use super::{Middleware, Next};
use crate::actions::{Action, ActionKind};
use crate::error::Result;
use crate::state::State;
use crate::store::Store;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between accepted dispatches, per kind.
    pub windows: HashMap<ActionKind, Duration>,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            windows: HashMap::from([(ActionKind::CalculatePrice, Duration::from_millis(500))]),
        }
    }
}

impl ThrottleConfig {
    /// No kind is throttled.
    pub fn disabled() -> Self {
        Self {
            windows: HashMap::new(),
        }
    }
}

/// Drops a dispatch when the same kind was accepted within its window.
///
/// A dropped dispatch is not an error: it logs a warning and returns the
/// current state unchanged.
pub struct ThrottleMiddleware {
    config: ThrottleConfig,
    last_accepted: Mutex<HashMap<ActionKind, Instant>>,
}

impl ThrottleMiddleware {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            last_accepted: Mutex::new(HashMap::new()),
        }
    }
}

impl Middleware for ThrottleMiddleware {
    fn name(&self) -> &'static str {
        "throttle"
    }

    fn handle(&self, store: &Store, action: Action, next: &Next<'_>) -> Result<Arc<State>> {
        let kind = action.kind();
        let Some(window) = self.config.windows.get(&kind) else {
            return next(action);
        };

        let now = Instant::now();
        if let Some(prev) = self.last_accepted.lock().get(&kind) {
            let since = now.duration_since(*prev);
            if since < *window {
                tracing::warn!(
                    kind = %kind,
                    since_ms = since.as_millis() as u64,
                    window_ms = window.as_millis() as u64,
                    "throttled"
                );
                return Ok(store.working_state());
            }
        }

        // Only a dispatch the inner chain accepted opens a new window.
        let state = next(action)?;
        self.last_accepted.lock().insert(kind, now);
        Ok(state)
    }
}
