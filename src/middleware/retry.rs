use super::{Middleware, Next};
use crate::actions::{Action, ActionKind};
use crate::error::Result;
use crate::state::State;
use crate::store::Store;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub kinds: HashSet<ActionKind>,
    /// Total attempts, including the first. At least 1.
    pub max_attempts: u32,
    /// Delay before attempt `n + 1` is `base_delay * n`.
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            kinds: HashSet::from([ActionKind::LoadDataSuccess, ActionKind::RestoreState]),
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

/// Retries the rest of the chain with linear backoff, then re-throws.
///
/// Reducer work from a failed attempt is rolled back before the next one.
pub struct RetryMiddleware {
    config: RetryConfig,
}

impl RetryMiddleware {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl Middleware for RetryMiddleware {
    fn name(&self) -> &'static str {
        "retry"
    }

    fn handle(&self, store: &Store, action: Action, next: &Next<'_>) -> Result<Arc<State>> {
        let kind = action.kind();
        if !self.config.kinds.contains(&kind) {
            return next(action);
        }

        let max_attempts = self.config.max_attempts.max(1);
        let checkpoint = store.checkpoint();
        let mut attempt = 1;
        loop {
            match next(action.clone()) {
                Ok(state) => return Ok(state),
                Err(err) if attempt < max_attempts => {
                    let delay = self.config.base_delay * attempt;
                    tracing::warn!(
                        kind = %kind,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying"
                    );
                    store.rollback_to(&checkpoint);
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => {
                    store.rollback_to(&checkpoint);
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::state::StateSlice;
    use crate::store::StoreConfig;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` calls it forwards.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    impl Middleware for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn handle(&self, _store: &Store, action: Action, next: &Next<'_>) -> Result<Arc<State>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let state = next(action)?;
            if call < self.failures {
                return Err(StoreError::Persistence("storage unavailable".into()));
            }
            Ok(state)
        }
    }

    fn store(failures: u32, max_attempts: u32) -> (Store, Arc<Flaky>) {
        let flaky = Arc::new(Flaky {
            failures,
            calls: AtomicU32::new(0),
        });
        let store = Store::builder(StoreConfig::default())
            .with(RetryMiddleware::new(RetryConfig {
                max_attempts,
                base_delay: Duration::from_millis(1),
                ..Default::default()
            }))
            .with_arc(flaky.clone())
            .build()
            .unwrap();
        (store, flaky)
    }

    fn restore() -> Action {
        let mut slice = StateSlice::default();
        slice.progress = Arc::new(crate::state::Progress {
            current_step: 3,
            total_steps: 5,
        });
        Action::RestoreState { slice }
    }

    #[test]
    fn test_succeeds_after_transient_failures() {
        let (store, flaky) = store(2, 3);
        let state = store.dispatch(restore()).unwrap();
        assert_eq!(state.progress.current_step, 3);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let (store, flaky) = store(5, 3);
        let result = store.dispatch(restore());
        assert!(matches!(result, Err(StoreError::Persistence(_))));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.get_state().progress.current_step, 1);
    }

    #[test]
    fn test_other_kinds_not_retried() {
        let (store, flaky) = store(1, 3);
        assert!(store.dispatch(Action::NextStep).is_err());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }
}
