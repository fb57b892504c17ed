//! Error reporting and error-rate-triggered recovery.

use super::{Middleware, Next};
use crate::actions::{Action, ActionKind};
use crate::error::Result;
use crate::state::State;
use crate::store::Store;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Logs failures, surfaces them as `ui.error`, then re-throws.
///
/// The `SET_ERROR` dispatch is queued behind the failing one, so it lands
/// after the failed dispatch has returned and never touches its state.
#[derive(Debug, Default)]
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for ErrorReporter {
    fn name(&self) -> &'static str {
        "errors"
    }

    fn handle(&self, store: &Store, action: Action, next: &Next<'_>) -> Result<Arc<State>> {
        let kind = action.kind();
        next(action).map_err(|err| {
            tracing::error!(kind = %kind, error = %err, "dispatch failed");
            if kind != ActionKind::SetError {
                let report = Action::SetError {
                    message: err.to_string(),
                };
                if let Err(e) = store.dispatch(report) {
                    tracing::warn!(error = %e, "could not report error to ui");
                }
            }
            err
        })
    }
}

/// Recovery hook run once a kind keeps failing.
pub type RecoveryStrategy = Arc<dyn Fn(&Store, ActionKind) -> Result<()> + Send + Sync>;

#[derive(Clone, Debug)]
pub struct RecoveryConfig {
    /// Failures within `window` tolerated before recovery runs.
    pub threshold: usize,
    pub window: Duration,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            threshold: 5,
            window: Duration::from_secs(60),
        }
    }
}

/// Counts failures per action kind over a rolling window.
///
/// Once a kind has failed more than `threshold` times within `window`, the
/// next dispatch of that kind runs the recovery strategy first and starts a
/// fresh count. Failures are always re-thrown.
pub struct ErrorRecovery {
    config: RecoveryConfig,
    strategy: Option<RecoveryStrategy>,
    failures: Mutex<HashMap<ActionKind, VecDeque<Instant>>>,
    activations: AtomicU64,
}

impl ErrorRecovery {
    pub fn new(config: RecoveryConfig) -> Self {
        Self {
            config,
            strategy: None,
            failures: Mutex::new(HashMap::new()),
            activations: AtomicU64::new(0),
        }
    }

    pub fn with_strategy(mut self, strategy: RecoveryStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Failures of `kind` inside the current window.
    pub fn failure_count(&self, kind: ActionKind) -> usize {
        let mut failures = self.failures.lock();
        match failures.get_mut(&kind) {
            Some(times) => {
                Self::prune(times, self.config.window);
                times.len()
            }
            None => 0,
        }
    }

    /// Times the recovery strategy ran.
    pub fn activations(&self) -> u64 {
        self.activations.load(Ordering::Relaxed)
    }

    fn prune(times: &mut VecDeque<Instant>, window: Duration) {
        while times.front().map_or(false, |t| t.elapsed() > window) {
            times.pop_front();
        }
    }

    fn record_failure(&self, kind: ActionKind) {
        let mut failures = self.failures.lock();
        let times = failures.entry(kind).or_default();
        times.push_back(Instant::now());
        Self::prune(times, self.config.window);
    }

    /// True (and the count reset) if `kind` crossed the threshold.
    fn take_trip(&self, kind: ActionKind) -> bool {
        let mut failures = self.failures.lock();
        let Some(times) = failures.get_mut(&kind) else {
            return false;
        };
        Self::prune(times, self.config.window);
        if times.len() <= self.config.threshold {
            return false;
        }
        times.clear();
        true
    }
}

impl Middleware for ErrorRecovery {
    fn name(&self) -> &'static str {
        "recovery"
    }

    fn handle(&self, store: &Store, action: Action, next: &Next<'_>) -> Result<Arc<State>> {
        let kind = action.kind();

        if self.take_trip(kind) {
            self.activations.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(kind = %kind, threshold = self.config.threshold, "error threshold exceeded, running recovery");
            if let Some(strategy) = &self.strategy {
                if let Err(e) = strategy(store, kind) {
                    tracing::error!(kind = %kind, error = %e, "recovery strategy failed");
                }
            }
        }

        next(action).map_err(|err| {
            self.record_failure(kind);
            err
        })
    }
}
