//! Main Store struct tying all components together.

use crate::actions::{Action, HistoryPolicy};
use crate::error::{Result, StoreError};
use crate::history::{History, DEFAULT_MAX_HISTORY};
use crate::middleware::{Handler, Middleware, Pipeline};
use crate::reducers;
use crate::state::{State, DEFAULT_TOTAL_STEPS};
use crate::subscriptions::{
    ChangeCause, SubscriptionConfig, SubscriptionHandle, SubscriptionId, SubscriptionManager,
};
use crate::types::Revision;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// History entries retained, including the baseline.
    pub max_history_size: usize,

    /// Steps in the configurator flow.
    pub total_steps: u32,

    /// Max re-entrant dispatches waiting behind the one in flight.
    pub dispatch_queue_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_history_size: DEFAULT_MAX_HISTORY,
            total_steps: DEFAULT_TOTAL_STEPS,
            dispatch_queue_limit: 1024,
        }
    }
}

/// Reducer progress of the dispatch in flight.
struct Transaction {
    /// State the next reducer call starts from.
    working: Arc<State>,
    /// Actions that reached the reducer, in order.
    applied: Vec<Action>,
}

/// A point to roll the in-flight dispatch back to.
#[derive(Clone, Debug)]
pub struct Checkpoint {
    working: Arc<State>,
    applied: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HistoryMove {
    Undo,
    Redo,
}

enum Job {
    Dispatch(Action),
    Move(HistoryMove),
}

#[derive(Default)]
struct DispatchQueue {
    jobs: VecDeque<Job>,
    draining: bool,
}

/// Clears the dispatch queue if a reducer, middleware or subscriber panics,
/// so the store stays usable afterwards.
struct DrainGuard<'a> {
    queue: &'a Mutex<DispatchQueue>,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut queue = self.queue.lock();
            queue.jobs.clear();
            queue.draining = false;
        }
    }
}

/// The state store.
///
/// Owns the state tree and serializes every change through one path:
/// middleware pipeline, reducer, commit, history, notification. Calls to
/// [`Store::dispatch`], [`Store::undo`] or [`Store::redo`] made while another
/// one is running (from a subscriber, a middleware or another thread) are
/// queued and run in submission order once the running one has committed and
/// notified.
///
/// Background work (timers, writer threads) reaches the store through a
/// [`WeakStore`] so it never keeps the store alive.
pub struct Store {
    shared: Arc<Shared>,
}

struct Shared {
    config: StoreConfig,

    /// Last committed state.
    state: RwLock<Arc<State>>,

    revision: AtomicU64,

    history: Mutex<History>,

    subscriptions: SubscriptionManager,

    pipeline: Pipeline,

    transaction: Mutex<Option<Transaction>>,

    queue: Mutex<DispatchQueue>,
}

/// A handle that does not keep the store alive.
#[derive(Clone)]
pub struct WeakStore(Weak<Shared>);

impl WeakStore {
    /// The store, if it has not been dropped.
    pub fn upgrade(&self) -> Option<Store> {
        self.0.upgrade().map(|shared| Store { shared })
    }
}

impl Store {
    /// A store with no middleware and a fresh initial state.
    pub fn new(config: StoreConfig) -> Self {
        let initial = Arc::new(State::initial(config.total_steps));
        Self::assemble(config, initial, Vec::new())
    }

    pub fn builder(config: StoreConfig) -> StoreBuilder {
        StoreBuilder {
            config,
            middleware: Vec::new(),
            initial: None,
        }
    }

    fn assemble(config: StoreConfig, initial: Arc<State>, middleware: Vec<Arc<dyn Middleware>>) -> Self {
        let core: Handler = Box::new(|store: &Store, action: Action| store.apply_reducer(action));
        let history = History::new(Arc::clone(&initial), config.max_history_size);

        let shared = Shared {
            config,
            state: RwLock::new(initial),
            revision: AtomicU64::new(0),
            history: Mutex::new(history),
            subscriptions: SubscriptionManager::new(),
            pipeline: Pipeline::compose(middleware, core),
            transaction: Mutex::new(None),
            queue: Mutex::new(DispatchQueue::default()),
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    /// A handle for background work that must not keep the store alive.
    pub fn downgrade(&self) -> WeakStore {
        WeakStore(Arc::downgrade(&self.shared))
    }

    // --- Reading ---

    /// The last committed state.
    pub fn get_state(&self) -> Arc<State> {
        Arc::clone(&self.shared.state.read())
    }

    /// State as seen by the dispatch in flight: the committed state plus
    /// whatever reducers already ran in this dispatch.
    pub fn working_state(&self) -> Arc<State> {
        match self.shared.transaction.lock().as_ref() {
            Some(txn) => Arc::clone(&txn.working),
            None => self.get_state(),
        }
    }

    pub fn revision(&self) -> Revision {
        Revision(self.shared.revision.load(Ordering::SeqCst))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.shared.pipeline.names()
    }

    /// True while a dispatch, undo or redo is running.
    pub fn is_dispatching(&self) -> bool {
        self.shared.queue.lock().draining
    }

    // --- Subscriptions ---

    /// Call `callback` after every committed change, in registration order.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Arc<State>) + Send + Sync + 'static,
    {
        self.shared.subscriptions.subscribe(Arc::new(callback))
    }

    /// Receive committed changes on a bounded channel.
    pub fn subscribe_channel(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        self.shared.subscriptions.subscribe_channel(config)
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.subscriptions.unsubscribe(id)
    }

    // --- Dispatch ---

    /// Run `action` through the middleware pipeline and commit the result.
    ///
    /// Returns the committed state. A failure anywhere in the chain leaves the
    /// committed state untouched. When called re-entrantly the action is
    /// queued and the current state is returned immediately.
    ///
    /// A queued action that later fails is only logged: the caller already got
    /// `Ok`, so the failure reaches it only through `ui.error`, and only when
    /// an [`ErrorReporter`](crate::middleware::ErrorReporter) is installed.
    pub fn dispatch(&self, action: Action) -> Result<Arc<State>> {
        {
            let mut queue = self.shared.queue.lock();
            if queue.draining {
                if queue.jobs.len() >= self.shared.config.dispatch_queue_limit {
                    return Err(StoreError::InvalidAction(format!(
                        "dispatch queue full ({} pending), dropping {}",
                        queue.jobs.len(),
                        action.kind()
                    )));
                }
                tracing::trace!(kind = %action.kind(), pending = queue.jobs.len() + 1, "queued re-entrant dispatch");
                queue.jobs.push_back(Job::Dispatch(action));
                drop(queue);
                return Ok(self.get_state());
            }
            queue.draining = true;
        }

        let _guard = DrainGuard { queue: &self.shared.queue };
        let result = self.dispatch_now(action);
        self.drain_queue();
        result
    }

    /// Dispatch by string kind and JSON payload.
    ///
    /// Unknown kinds are accepted and change nothing.
    pub fn dispatch_kind(&self, kind: &str, payload: serde_json::Value) -> Result<Arc<State>> {
        self.dispatch(Action::from_parts(kind, payload)?)
    }

    /// Apply any toggles held back by the batching middleware.
    pub fn flush_batched(&self) -> Result<Arc<State>> {
        self.dispatch(Action::FlushBatch)
    }

    fn dispatch_now(&self, action: Action) -> Result<Arc<State>> {
        let prev = self.get_state();
        let original = action.clone();
        *self.shared.transaction.lock() = Some(Transaction {
            working: Arc::clone(&prev),
            applied: Vec::new(),
        });

        let result = self.shared.pipeline.run(self, action);
        let applied = self
            .shared.transaction
            .lock()
            .take()
            .map(|txn| txn.applied)
            .unwrap_or_default();
        let next = result?;

        if Arc::ptr_eq(&next, &prev) {
            tracing::trace!(kind = %original.kind(), "dispatch left state unchanged");
            return Ok(next);
        }

        // History records what actually reached the reducer: batched toggles
        // arrive as one entry, short-circuited results as the original action.
        let mut applied = applied;
        let recorded = match applied.len() {
            0 => original,
            1 => applied.remove(0),
            _ => Action::Batch { actions: applied },
        };
        Ok(self.commit(next, recorded))
    }

    fn apply_reducer(&self, action: Action) -> Result<Arc<State>> {
        let mut txn = self.shared.transaction.lock();
        let working = match txn.as_ref() {
            Some(txn) => Arc::clone(&txn.working),
            None => self.get_state(),
        };

        let next = reducers::reduce(&working, &action)?;
        if let Some(txn) = txn.as_mut() {
            txn.working = Arc::clone(&next);
            txn.applied.push(action);
        }
        Ok(next)
    }

    fn commit(&self, next: Arc<State>, recorded: Action) -> Arc<State> {
        let kind = recorded.kind();
        let policy = recorded.history_policy();

        *self.shared.state.write() = Arc::clone(&next);
        let revision = Revision(self.shared.revision.fetch_add(1, Ordering::SeqCst) + 1);

        {
            let mut history = self.shared.history.lock();
            match policy {
                HistoryPolicy::Skip => {}
                HistoryPolicy::Record => history.record(recorded, Arc::clone(&next)),
                HistoryPolicy::Rebase => history.rebase(Arc::clone(&next)),
            }
        }
        tracing::trace!(kind = %kind, %revision, ?policy, "committed");

        self.shared.subscriptions
            .notify(&next, revision, ChangeCause::Action(kind));
        next
    }

    fn drain_queue(&self) {
        loop {
            let job = {
                let mut queue = self.shared.queue.lock();
                match queue.jobs.pop_front() {
                    Some(job) => job,
                    None => {
                        queue.draining = false;
                        return;
                    }
                }
            };

            match job {
                Job::Dispatch(action) => {
                    let kind = action.kind();
                    if let Err(e) = self.dispatch_now(action) {
                        tracing::error!(kind = %kind, error = %e, "queued dispatch failed");
                    }
                }
                Job::Move(direction) => {
                    self.move_history_now(direction);
                }
            }
        }
    }

    // --- History ---

    /// Step back one history entry.
    ///
    /// Restores the recorded selections, pricing and progress; UI state and
    /// the catalog stay as they are. Returns false at the oldest entry.
    pub fn undo(&self) -> bool {
        self.move_history(HistoryMove::Undo)
    }

    /// Step forward one history entry. Returns false at the newest entry.
    pub fn redo(&self) -> bool {
        self.move_history(HistoryMove::Redo)
    }

    pub fn can_undo(&self) -> bool {
        self.shared.history.lock().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.shared.history.lock().can_redo()
    }

    /// Entries currently retained, including the baseline.
    pub fn history_len(&self) -> usize {
        self.shared.history.lock().len()
    }

    fn move_history(&self, direction: HistoryMove) -> bool {
        {
            let mut queue = self.shared.queue.lock();
            if queue.draining {
                if queue.jobs.len() >= self.shared.config.dispatch_queue_limit {
                    tracing::warn!(?direction, "dispatch queue full, dropping history move");
                    return false;
                }
                let possible = match direction {
                    HistoryMove::Undo => self.can_undo(),
                    HistoryMove::Redo => self.can_redo(),
                };
                queue.jobs.push_back(Job::Move(direction));
                return possible;
            }
            queue.draining = true;
        }

        let _guard = DrainGuard { queue: &self.shared.queue };
        let moved = self.move_history_now(direction);
        self.drain_queue();
        moved
    }

    fn move_history_now(&self, direction: HistoryMove) -> bool {
        let snapshot = {
            let mut history = self.shared.history.lock();
            match direction {
                HistoryMove::Undo => history.undo(),
                HistoryMove::Redo => history.redo(),
            }
        };
        let Some(snapshot) = snapshot else {
            tracing::debug!(?direction, "history boundary reached");
            return false;
        };

        let restored = Arc::new(self.get_state().with_slice(&snapshot.slice()));
        *self.shared.state.write() = Arc::clone(&restored);
        let revision = Revision(self.shared.revision.fetch_add(1, Ordering::SeqCst) + 1);

        let cause = match direction {
            HistoryMove::Undo => ChangeCause::Undo,
            HistoryMove::Redo => ChangeCause::Redo,
        };
        tracing::debug!(?direction, %revision, "history restored");

        self.shared.subscriptions.notify(&restored, revision, cause);
        for mw in self.shared.pipeline.middleware() {
            mw.on_restore(self, &restored);
        }
        true
    }

    // --- Middleware support ---

    /// Mark the current progress of the dispatch in flight.
    pub fn checkpoint(&self) -> Checkpoint {
        match self.shared.transaction.lock().as_ref() {
            Some(txn) => Checkpoint {
                working: Arc::clone(&txn.working),
                applied: txn.applied.len(),
            },
            None => Checkpoint {
                working: self.get_state(),
                applied: 0,
            },
        }
    }

    /// Discard reducer work done since `checkpoint` in the dispatch in flight.
    pub fn rollback_to(&self, checkpoint: &Checkpoint) {
        if let Some(txn) = self.shared.transaction.lock().as_mut() {
            txn.working = Arc::clone(&checkpoint.working);
            txn.applied.truncate(checkpoint.applied);
        }
    }
}

/// Builder for a [`Store`] with middleware.
pub struct StoreBuilder {
    config: StoreConfig,
    middleware: Vec<Arc<dyn Middleware>>,
    initial: Option<State>,
}

impl StoreBuilder {
    /// Append a middleware. The first one added is outermost.
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Append a shared middleware, e.g. one the caller keeps a handle to.
    pub fn with_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Append several middleware in order.
    pub fn with_all(mut self, middleware: impl IntoIterator<Item = Arc<dyn Middleware>>) -> Self {
        self.middleware.extend(middleware);
        self
    }

    /// Start from `state` instead of a fresh initial state.
    pub fn initial_state(mut self, state: State) -> Self {
        self.initial = Some(state);
        self
    }

    /// Build the store and run every middleware's `on_attach`, in order.
    pub fn build(self) -> Result<Store> {
        let initial = Arc::new(
            self.initial
                .unwrap_or_else(|| State::initial(self.config.total_steps)),
        );
        let store = Store::assemble(self.config, initial, self.middleware);

        for mw in store.shared.pipeline.middleware() {
            mw.on_attach(&store)?;
        }
        tracing::debug!(middleware = ?store.middleware_names(), "store built");
        Ok(store)
    }
}
