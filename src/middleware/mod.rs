//! Middleware: ordered interceptors wrapped around the reducer step.
//!
//! Each middleware receives the store, the action and a `next` continuation.
//! It may forward the action (possibly transformed), call `next` several
//! times (retry), not at all (short-circuit), or act on the result on the way
//! out. The chain is composed once when the store is built: registration
//! order on the way in, reverse order on the way out.
//!
//! ```text
//! dispatch -> [errors -> recovery -> logger -> ... -> retry] -> reducer
//!                                                                 |
//! commit   <- [errors <- recovery <- logger <- ... <- retry] <----+
//! ```
//!
//! Middleware never commits. The state returned by the outermost layer is
//! what the store commits, and only if the whole chain succeeded.

mod analytics;
mod batch;
mod cache;
mod errors;
mod logger;
mod performance;
mod persistence;
mod retry;
mod sync;
mod throttle;
mod validation;

pub use analytics::{AnalyticsEvent, AnalyticsMiddleware, AnalyticsSink, RecordingSink, TracingSink};
pub use batch::{BatchConfig, BatchMiddleware};
pub use cache::{CacheConfig, CacheMiddleware, CacheStats};
pub use errors::{ErrorRecovery, ErrorReporter, RecoveryConfig, RecoveryStrategy};
pub use logger::LoggerMiddleware;
pub use performance::{KindStats, PerformanceConfig, PerformanceMiddleware};
pub use persistence::{PersistenceConfig, PersistenceMiddleware};
pub use retry::{RetryConfig, RetryMiddleware};
pub use sync::{CrossTabSync, SyncConfig};
pub use throttle::{ThrottleConfig, ThrottleMiddleware};
pub use validation::ValidationMiddleware;

use crate::actions::{Action, ActionKind};
use crate::error::Result;
use crate::persistence::StateStorage;
use crate::state::State;
use crate::store::Store;
use crate::sync::SyncHub;
use std::sync::Arc;

/// Continuation handed to a middleware: the rest of the chain.
pub type Next<'a> = dyn Fn(Action) -> Result<Arc<State>> + 'a;

/// An interceptor in the dispatch chain.
pub trait Middleware: Send + Sync {
    fn name(&self) -> &'static str;

    /// Handle `action`, usually by forwarding it to `next`.
    ///
    /// Must not mutate state directly; the returned state is the proposal the
    /// store commits if the whole chain succeeds.
    fn handle(&self, store: &Store, action: Action, next: &Next<'_>) -> Result<Arc<State>>;

    /// Called once, in registration order, after the store is built.
    fn on_attach(&self, _store: &Store) -> Result<()> {
        Ok(())
    }

    /// Called after undo/redo committed `state`.
    fn on_restore(&self, _store: &Store, _state: &Arc<State>) {}
}

pub(crate) type Handler = Box<dyn Fn(&Store, Action) -> Result<Arc<State>> + Send + Sync>;

/// A precomposed middleware chain.
pub struct Pipeline {
    handler: Handler,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    /// Fold `middleware` around `core`, first registered outermost.
    pub(crate) fn compose(middleware: Vec<Arc<dyn Middleware>>, core: Handler) -> Self {
        let mut handler = core;
        for mw in middleware.iter().rev() {
            let inner = handler;
            let mw = Arc::clone(mw);
            handler = Box::new(move |store: &Store, action: Action| {
                let next = |forwarded: Action| inner(store, forwarded);
                mw.handle(store, action, &next)
            });
        }
        Self {
            handler,
            middleware,
        }
    }

    pub(crate) fn run(&self, store: &Store, action: Action) -> Result<Arc<State>> {
        (self.handler)(store, action)
    }

    pub(crate) fn middleware(&self) -> &[Arc<dyn Middleware>] {
        &self.middleware
    }

    /// Middleware names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.middleware.iter().map(|mw| mw.name()).collect()
    }
}

/// Collaborators and settings for [`standard_pipeline`].
#[derive(Default)]
pub struct StandardOptions {
    pub storage: Option<Arc<dyn StateStorage>>,
    /// Joined on `sync.channel` when set.
    pub sync_hub: Option<Arc<SyncHub>>,
    pub analytics: Option<Arc<dyn AnalyticsSink>>,
    pub persistence: PersistenceConfig,
    pub sync: SyncConfig,
    pub throttle: ThrottleConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub batch: BatchConfig,
    pub recovery: RecoveryConfig,
    pub performance: PerformanceConfig,
}

/// The recommended middleware ordering, outermost first.
///
/// Error handling wraps everything; observers (logging, performance, sync,
/// persistence, analytics) sit outside the short-circuiting layers
/// (throttle, validation, batching, cache) so they see final outcomes; retry
/// sits closest to the reducer. The recovery strategy clears the cache.
pub fn standard_pipeline(options: StandardOptions) -> Vec<Arc<dyn Middleware>> {
    let cache = Arc::new(CacheMiddleware::new(options.cache));
    let recovery_cache = Arc::clone(&cache);
    let recovery = ErrorRecovery::new(options.recovery).with_strategy(Arc::new(
        move |_store: &Store, kind: ActionKind| {
            tracing::warn!(kind = %kind, "clearing result cache after repeated failures");
            recovery_cache.clear();
            Ok(())
        },
    ));

    let mut chain: Vec<Arc<dyn Middleware>> = vec![
        Arc::new(ErrorReporter::new()),
        Arc::new(recovery),
        Arc::new(LoggerMiddleware::new()),
        Arc::new(PerformanceMiddleware::new(options.performance)),
    ];
    if let Some(hub) = options.sync_hub {
        chain.push(Arc::new(CrossTabSync::join(&hub, options.sync)));
    }
    if let Some(storage) = options.storage {
        chain.push(Arc::new(PersistenceMiddleware::new(storage, options.persistence)));
    }
    if let Some(sink) = options.analytics {
        chain.push(Arc::new(AnalyticsMiddleware::new(sink)));
    }
    chain.push(Arc::new(ThrottleMiddleware::new(options.throttle)));
    chain.push(Arc::new(ValidationMiddleware::new()));
    chain.push(Arc::new(BatchMiddleware::new(options.batch)));
    chain.push(cache);
    chain.push(Arc::new(RetryMiddleware::new(options.retry)));
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Store, StoreConfig};
    use parking_lot::Mutex;

    struct Tracer {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for Tracer {
        fn name(&self) -> &'static str {
            self.label
        }

        fn handle(&self, _store: &Store, action: Action, next: &Next<'_>) -> Result<Arc<State>> {
            self.log.lock().push(format!("{}:in", self.label));
            let result = next(action);
            self.log.lock().push(format!("{}:out", self.label));
            result
        }
    }

    #[test]
    fn test_onion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let store = Store::builder(StoreConfig::default())
            .with(Tracer {
                label: "a",
                log: Arc::clone(&log),
            })
            .with(Tracer {
                label: "b",
                log: Arc::clone(&log),
            })
            .build()
            .unwrap();

        store.dispatch(Action::NextStep).unwrap();
        assert_eq!(*log.lock(), vec!["a:in", "b:in", "b:out", "a:out"]);
        assert_eq!(store.middleware_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_standard_pipeline_order() {
        let chain = standard_pipeline(StandardOptions::default());
        let names: Vec<_> = chain.iter().map(|mw| mw.name()).collect();
        assert_eq!(
            names,
            vec![
                "errors",
                "recovery",
                "logger",
                "performance",
                "throttle",
                "validation",
                "batch",
                "cache",
                "retry"
            ]
        );
    }
}
