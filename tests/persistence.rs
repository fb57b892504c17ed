//! Persistence across store instances, backed by files on disk.

use quote_store::middleware::{PersistenceConfig, PersistenceMiddleware};
use quote_store::{
    Action, FileStorage, PersistedState, State, StateStorage, Store, StoreConfig, StoreError,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn session(dir: &TempDir) -> (Store, Arc<PersistenceMiddleware>) {
    let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
    let persistence = Arc::new(PersistenceMiddleware::new(
        storage,
        PersistenceConfig {
            debounce: Duration::from_secs(60),
            ..Default::default()
        },
    ));
    let store = Store::builder(StoreConfig::default())
        .with_arc(persistence.clone())
        .build()
        .unwrap();
    (store, persistence)
}

// --- Hydration ---

#[test]
fn test_state_survives_restart() {
    let dir = TempDir::new().unwrap();

    {
        let (store, persistence) = session(&dir);
        store.dispatch(Action::select_package("growth")).unwrap();
        store.dispatch(Action::toggle_feature("extra-seo")).unwrap();
        store.dispatch(Action::NextStep).unwrap();
        store
            .dispatch(Action::OpenModal {
                id: "summary".into(),
            })
            .unwrap();
        persistence.flush().unwrap();
    }

    let (store, _persistence) = session(&dir);
    let state = store.get_state();
    assert_eq!(state.selections.package.as_deref(), Some("growth"));
    assert!(state.selections.features.contains("extra-seo"));
    assert_eq!(state.progress.current_step, 2);

    // UI state is not persisted, and restoring starts a fresh history.
    assert!(!state.ui.is_modal_open("summary"));
    assert!(!store.can_undo());
}

#[test]
fn test_pending_write_lands_on_drop() {
    let dir = TempDir::new().unwrap();
    {
        let (store, _persistence) = session(&dir);
        store.dispatch(Action::SetStep { step: 4 }).unwrap();
    }

    let storage = FileStorage::open(dir.path()).unwrap();
    let saved = storage.load().unwrap().unwrap();
    assert_eq!(saved.slice.progress.current_step, 4);
}

#[test]
fn test_undo_is_persisted() {
    let dir = TempDir::new().unwrap();
    {
        let (store, persistence) = session(&dir);
        store.dispatch(Action::toggle_feature("a")).unwrap();
        store.dispatch(Action::toggle_feature("b")).unwrap();
        assert!(store.undo());
        persistence.flush().unwrap();
    }

    let (store, _persistence) = session(&dir);
    let features = &store.get_state().selections.features;
    assert!(features.contains("a"));
    assert!(!features.contains("b"));
}

// --- Storage Boundary ---

#[test]
fn test_second_open_is_locked() {
    let dir = TempDir::new().unwrap();
    let _first = FileStorage::open(dir.path()).unwrap();
    assert!(matches!(
        FileStorage::open(dir.path()),
        Err(StoreError::Locked)
    ));
}

#[test]
fn test_expired_state_is_not_restored() {
    let dir = TempDir::new().unwrap();
    {
        let storage = FileStorage::open(dir.path()).unwrap();
        let mut old = State::initial(5);
        old.progress = Arc::new(quote_store::Progress {
            current_step: 5,
            total_steps: 5,
        });
        let mut saved = PersistedState::new(old.slice());
        saved.saved_at = quote_store::Timestamp(saved.saved_at.0 - 25 * 60 * 60 * 1000);
        storage.save(&saved).unwrap();
    }

    let (store, _persistence) = session(&dir);
    assert_eq!(store.get_state().progress.current_step, 1);
}

#[test]
fn test_corrupt_file_does_not_block_startup() {
    let dir = TempDir::new().unwrap();
    {
        let storage = FileStorage::open(dir.path()).unwrap();
        storage
            .save(&PersistedState::new(State::initial(5).slice()))
            .unwrap();
        let mut bytes = std::fs::read(storage.path()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(storage.path(), bytes).unwrap();
    }

    let (store, _persistence) = session(&dir);
    assert_eq!(*store.get_state(), State::initial(5));
}
