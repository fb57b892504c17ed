//! Debounced persistence of the selections, pricing and progress regions.

use super::{Middleware, Next};
use crate::actions::{Action, ActionKind};
use crate::error::{Result, StoreError};
use crate::persistence::{PersistedState, StateStorage};
use crate::state::State;
use crate::store::Store;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct PersistenceConfig {
    /// Quiet period after the last change before writing.
    pub debounce: Duration,

    /// Saved state older than this is ignored at startup.
    pub max_age: Duration,

    /// Load and restore saved state when the store is built.
    pub restore_on_attach: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1000),
            max_age: Duration::from_secs(24 * 60 * 60),
            restore_on_attach: true,
        }
    }
}

enum Command {
    Save(PersistedState),
    Flush(Sender<()>),
}

/// Writes the persistable slice to a [`StateStorage`] on a background thread.
///
/// Each change restarts the debounce timer, so a burst of dispatches costs one
/// write. Transient kinds (UI, catalog loading) and restores are not written.
/// Storage failures never fail a dispatch; they are logged and surfaced as
/// `ui.error` on the next dispatch.
pub struct PersistenceMiddleware {
    storage: Arc<dyn StateStorage>,
    config: PersistenceConfig,
    commands: Option<Sender<Command>>,
    failures: Receiver<StoreError>,
    writer: Option<JoinHandle<()>>,
}

impl PersistenceMiddleware {
    pub fn new(storage: Arc<dyn StateStorage>, config: PersistenceConfig) -> Self {
        let (commands, inbox) = unbounded();
        let (failure_tx, failures) = unbounded();
        let writer_storage = Arc::clone(&storage);
        let debounce = config.debounce;

        let writer = std::thread::spawn(move || {
            run_writer(writer_storage.as_ref(), debounce, &inbox, &failure_tx);
        });

        Self {
            storage,
            config,
            commands: Some(commands),
            failures,
            writer: Some(writer),
        }
    }

    /// Write any pending state now and wait for it.
    pub fn flush(&self) -> Result<()> {
        let (ack_tx, ack) = bounded(1);
        self.send(Command::Flush(ack_tx))?;
        ack.recv()
            .map_err(|_| StoreError::Persistence("writer stopped".into()))
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .as_ref()
            .ok_or_else(|| StoreError::Persistence("writer stopped".into()))?
            .send(command)
            .map_err(|_| StoreError::Persistence("writer stopped".into()))
    }

    fn schedule(&self, state: &State) {
        if let Err(e) = self.send(Command::Save(PersistedState::new(state.slice()))) {
            tracing::error!(error = %e, "could not schedule save");
        }
    }

    fn report_failures(&self, store: &Store) {
        for failure in self.failures.try_iter() {
            let report = Action::SetError {
                message: failure.to_string(),
            };
            if let Err(e) = store.dispatch(report) {
                tracing::warn!(error = %e, "could not report persistence failure");
            }
        }
    }

    fn persists(kind: ActionKind) -> bool {
        !kind.is_transient() && !matches!(kind, ActionKind::RestoreState | ActionKind::Unknown)
    }
}

fn run_writer(
    storage: &dyn StateStorage,
    debounce: Duration,
    inbox: &Receiver<Command>,
    failures: &Sender<StoreError>,
) {
    let mut pending: Option<PersistedState> = None;
    let write = |pending: &mut Option<PersistedState>| {
        if let Some(state) = pending.take() {
            match storage.save(&state) {
                Ok(()) => tracing::debug!(saved_at = state.saved_at.0, "state persisted"),
                Err(e) => {
                    tracing::error!(error = %e, "failed to persist state");
                    let _ = failures.send(StoreError::Persistence(e.to_string()));
                }
            }
        }
    };

    loop {
        let received = if pending.is_some() {
            inbox.recv_timeout(debounce)
        } else {
            inbox.recv().map_err(|_| RecvTimeoutError::Disconnected)
        };

        match received {
            Ok(Command::Save(state)) => pending = Some(state),
            Ok(Command::Flush(ack)) => {
                write(&mut pending);
                let _ = ack.send(());
            }
            Err(RecvTimeoutError::Timeout) => write(&mut pending),
            Err(RecvTimeoutError::Disconnected) => {
                write(&mut pending);
                return;
            }
        }
    }
}

impl Middleware for PersistenceMiddleware {
    fn name(&self) -> &'static str {
        "persistence"
    }

    fn handle(&self, store: &Store, action: Action, next: &Next<'_>) -> Result<Arc<State>> {
        self.report_failures(store);

        let kind = action.kind();
        let prev = store.working_state();
        let state = next(action)?;

        let slice_changed = !Arc::ptr_eq(&prev.selections, &state.selections)
            || !Arc::ptr_eq(&prev.pricing, &state.pricing)
            || !Arc::ptr_eq(&prev.progress, &state.progress);
        if Self::persists(kind) && slice_changed {
            self.schedule(&state);
        }
        Ok(state)
    }

    fn on_attach(&self, store: &Store) -> Result<()> {
        if !self.config.restore_on_attach {
            return Ok(());
        }

        match self.storage.load() {
            Ok(Some(saved)) if saved.is_fresh(self.config.max_age) => {
                tracing::debug!(saved_at = saved.saved_at.0, "restoring saved state");
                if let Err(e) = store.dispatch(Action::RestoreState { slice: saved.slice }) {
                    tracing::error!(error = %e, "failed to restore saved state");
                }
            }
            Ok(Some(saved)) => {
                tracing::debug!(saved_at = saved.saved_at.0, "saved state too old, ignoring");
            }
            Ok(None) => {}
            Err(e) => tracing::error!(error = %e, "failed to load saved state"),
        }
        Ok(())
    }

    fn on_restore(&self, _store: &Store, state: &Arc<State>) {
        self.schedule(state);
    }
}

impl Drop for PersistenceMiddleware {
    fn drop(&mut self) {
        // Disconnecting the inbox makes the writer flush and exit.
        self.commands.take();
        if let Some(writer) = self.writer.take() {
            let _ = writer.join();
        }
    }
}
