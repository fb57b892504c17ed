use super::{Middleware, Next};
use crate::actions::{Action, ActionKind};
use crate::error::Result;
use crate::state::State;
use crate::store::{Store, WeakStore};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Kinds held back and applied together.
    pub kinds: HashSet<ActionKind>,

    /// How long a batch stays open after its first action.
    pub window: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            kinds: ActionKind::SET_TOGGLES.into_iter().collect(),
            window: Duration::from_millis(16),
        }
    }
}

struct OpenBatch {
    actions: Vec<Action>,
    opened: Instant,
}

enum TimerCommand {
    /// Flush through `store` at `deadline` unless rearmed or disarmed first.
    Arm { deadline: Instant, store: WeakStore },
    Disarm,
}

/// Coalesces rapid toggles into one `BATCH` transition.
///
/// A batchable action is buffered and the dispatch returns the current state
/// without notifying anyone. The buffer is applied as a single `BATCH`:
/// - when the window closes, by a `FLUSH_BATCH` from the timer thread,
/// - by `FLUSH_BATCH` ([`Store::flush_batched`]),
/// - before any non-batchable action, in the same dispatch,
/// - by the first batchable action arriving after the window closed.
pub struct BatchMiddleware {
    config: BatchConfig,
    open: Mutex<Option<OpenBatch>>,
    timer: Option<Sender<TimerCommand>>,
    worker: Option<JoinHandle<()>>,
}

impl BatchMiddleware {
    pub fn new(config: BatchConfig) -> Self {
        // A zero window never holds anything back, so it needs no timer.
        let (timer, worker) = if config.window.is_zero() {
            (None, None)
        } else {
            let (commands, inbox) = unbounded();
            let worker = std::thread::spawn(move || run_timer(&inbox));
            (Some(commands), Some(worker))
        };

        Self {
            config,
            open: Mutex::new(None),
            timer,
            worker,
        }
    }

    /// Actions currently held back.
    pub fn pending(&self) -> usize {
        self.open.lock().as_ref().map_or(0, |batch| batch.actions.len())
    }

    fn take(&self) -> Option<Vec<Action>> {
        let actions = self.open.lock().take().map(|batch| batch.actions);
        if actions.is_some() {
            self.send(TimerCommand::Disarm);
        }
        actions
    }

    /// Put `actions` back at the front of the buffer.
    fn restore(&self, store: &Store, mut actions: Vec<Action>) {
        let mut open = self.open.lock();
        match open.as_mut() {
            Some(batch) => {
                actions.append(&mut batch.actions);
                batch.actions = actions;
            }
            None => {
                *open = Some(OpenBatch {
                    actions,
                    opened: Instant::now(),
                });
                drop(open);
                self.arm(store);
            }
        }
    }

    fn arm(&self, store: &Store) {
        self.send(TimerCommand::Arm {
            deadline: Instant::now() + self.config.window,
            store: store.downgrade(),
        });
    }

    fn send(&self, command: TimerCommand) {
        if let Some(timer) = &self.timer {
            if timer.send(command).is_err() {
                tracing::warn!("batch timer stopped");
            }
        }
    }
}

fn run_timer(inbox: &Receiver<TimerCommand>) {
    let mut armed: Option<(Instant, WeakStore)> = None;

    loop {
        let received = match &armed {
            Some((deadline, _)) => {
                inbox.recv_timeout(deadline.saturating_duration_since(Instant::now()))
            }
            None => inbox.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(TimerCommand::Arm { deadline, store }) => armed = Some((deadline, store)),
            Ok(TimerCommand::Disarm) => armed = None,
            Err(RecvTimeoutError::Timeout) => {
                let Some(store) = armed.take().and_then(|(_, store)| store.upgrade()) else {
                    continue;
                };
                tracing::trace!("batch window elapsed");
                if let Err(e) = store.flush_batched() {
                    tracing::error!(error = %e, "timed batch flush failed");
                }
            }
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

impl Middleware for BatchMiddleware {
    fn name(&self) -> &'static str {
        "batch"
    }

    fn handle(&self, store: &Store, action: Action, next: &Next<'_>) -> Result<Arc<State>> {
        let kind = action.kind();

        if kind == ActionKind::FlushBatch {
            return match self.take() {
                Some(actions) => {
                    tracing::trace!(size = actions.len(), "flushing batch");
                    next(Action::Batch { actions })
                }
                None => next(action),
            };
        }

        if self.config.kinds.contains(&kind) {
            let mut open = self.open.lock();
            let opening = open.is_none();
            let batch = open.get_or_insert_with(|| OpenBatch {
                actions: Vec::new(),
                opened: Instant::now(),
            });
            batch.actions.push(action);
            if batch.opened.elapsed() < self.config.window {
                drop(open);
                if opening {
                    self.arm(store);
                }
                return Ok(store.working_state());
            }

            drop(open);
            let actions = self.take().unwrap_or_default();
            tracing::trace!(size = actions.len(), "batch window closed");
            return next(Action::Batch { actions });
        }

        let Some(actions) = self.take() else {
            return next(action);
        };
        tracing::trace!(size = actions.len(), kind = %kind, "flushing batch ahead of action");
        // The dispatch is discarded as a whole on either failure; keep the
        // toggles for the next flush.
        let flushed = next(Action::Batch {
            actions: actions.clone(),
        });
        if let Err(err) = flushed {
            self.restore(store, actions);
            return Err(err);
        }
        next(action).map_err(|err| {
            self.restore(store, actions);
            err
        })
    }
}

impl Drop for BatchMiddleware {
    fn drop(&mut self) {
        // Disconnecting the inbox stops the timer.
        self.timer.take();
        if let Some(worker) = self.worker.take() {
            // The timer thread may itself release the last store handle.
            if worker.thread().id() != std::thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}
