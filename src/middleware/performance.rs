use super::{Middleware, Next};
use crate::actions::{Action, ActionKind};
use crate::error::Result;
use crate::state::State;
use crate::store::Store;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct PerformanceConfig {
    /// Record timing for one dispatch in this many. 0 disables sampling.
    pub sample_every: u64,

    /// Dispatches slower than this are logged at `warn`, sampled or not.
    pub slow_threshold: Duration,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            sample_every: 10,
            slow_threshold: Duration::from_millis(16),
        }
    }
}

/// Sampled timings for one action kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KindStats {
    pub samples: u64,
    pub total: Duration,
    pub max: Duration,
}

impl KindStats {
    fn record(&mut self, elapsed: Duration) {
        self.samples += 1;
        self.total += elapsed;
        self.max = self.max.max(elapsed);
    }

    pub fn mean(&self) -> Duration {
        if self.samples == 0 {
            return Duration::ZERO;
        }
        self.total / self.samples as u32
    }
}

/// Samples dispatch latency per action kind.
pub struct PerformanceMiddleware {
    config: PerformanceConfig,
    dispatches: AtomicU64,
    stats: Mutex<HashMap<ActionKind, KindStats>>,
}

impl PerformanceMiddleware {
    pub fn new(config: PerformanceConfig) -> Self {
        Self {
            config,
            dispatches: AtomicU64::new(0),
            stats: Mutex::new(HashMap::new()),
        }
    }

    pub fn stats(&self, kind: ActionKind) -> Option<KindStats> {
        self.stats.lock().get(&kind).copied()
    }

    pub fn snapshot(&self) -> HashMap<ActionKind, KindStats> {
        self.stats.lock().clone()
    }

    /// Dispatches seen, sampled or not.
    pub fn dispatch_count(&self) -> u64 {
        self.dispatches.load(Ordering::Relaxed)
    }
}

impl Middleware for PerformanceMiddleware {
    fn name(&self) -> &'static str {
        "performance"
    }

    fn handle(&self, _store: &Store, action: Action, next: &Next<'_>) -> Result<Arc<State>> {
        let kind = action.kind();
        let n = self.dispatches.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        let result = next(action);
        let elapsed = start.elapsed();

        if elapsed > self.config.slow_threshold {
            tracing::warn!(
                kind = %kind,
                elapsed_ms = elapsed.as_millis() as u64,
                threshold_ms = self.config.slow_threshold.as_millis() as u64,
                "slow dispatch"
            );
        }
        if self.config.sample_every > 0 && n % self.config.sample_every == 0 {
            self.stats.lock().entry(kind).or_default().record(elapsed);
        }
        result
    }
}
