//! Error handling tests for the quote store.
//!
//! Failed dispatches must leave the committed state, revision and history
//! untouched, and must never notify subscribers.

use quote_store::middleware::{ErrorReporter, ValidationMiddleware};
use quote_store::{
    Action, ActionKind, Middleware, Next, State, Store, StoreConfig, StoreError,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

fn count_notifications(store: &Store) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    store.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    count
}

// --- Reducer Errors ---

#[test]
fn test_reducer_error_is_atomic() {
    let store = Store::new(StoreConfig::default());
    store.dispatch(Action::NextStep).unwrap();
    let notified = count_notifications(&store);
    let before = store.get_state();
    let revision = store.revision();

    let result = store.dispatch(Action::SetStep { step: 42 });
    assert!(matches!(
        result,
        Err(StoreError::Reducer {
            kind: ActionKind::SetStep,
            ..
        })
    ));

    assert!(Arc::ptr_eq(&store.get_state(), &before));
    assert_eq!(store.revision(), revision);
    assert_eq!(store.history_len(), 2);
    assert_eq!(notified.load(Ordering::SeqCst), 0);
}

#[test]
fn test_failing_batch_applies_nothing() {
    let store = Store::new(StoreConfig::default());
    let before = store.get_state();

    let result = store.dispatch(Action::batch([
        Action::toggle_feature("a"),
        Action::SetStep { step: 0 },
        Action::toggle_feature("b"),
    ]));
    assert!(result.is_err());
    assert!(Arc::ptr_eq(&store.get_state(), &before));
    assert!(!store.can_undo());
}

#[test]
fn test_empty_discount_code_rejected() {
    let store = Store::new(StoreConfig::default());
    let result = store.dispatch(Action::ApplyDiscount {
        code: "  ".into(),
        amount: 10,
    });
    assert!(result.is_err());
    assert!(store.get_state().pricing.discount.is_none());
}

// --- Middleware Errors ---

/// Forwards, then fails if the action is a step change.
struct RejectSteps;

impl Middleware for RejectSteps {
    fn name(&self) -> &'static str {
        "reject-steps"
    }

    fn handle(&self, _store: &Store, action: Action, next: &Next<'_>) -> quote_store::Result<Arc<State>> {
        let kind = action.kind();
        let state = next(action)?;
        if kind == ActionKind::NextStep {
            return Err(StoreError::Middleware {
                middleware: self.name(),
                message: "steps are frozen".into(),
            });
        }
        Ok(state)
    }
}

#[test]
fn test_middleware_error_discards_reducer_result() {
    let store = Store::builder(StoreConfig::default())
        .with(RejectSteps)
        .build()
        .unwrap();
    let notified = count_notifications(&store);

    let result = store.dispatch(Action::NextStep);
    assert!(matches!(result, Err(StoreError::Middleware { .. })));
    assert_eq!(store.get_state().progress.current_step, 1);
    assert_eq!(notified.load(Ordering::SeqCst), 0);

    // The store keeps working.
    store.dispatch(Action::toggle_feature("a")).unwrap();
    assert_eq!(notified.load(Ordering::SeqCst), 1);
}

#[test]
fn test_reported_error_reaches_ui() {
    let store = Store::builder(StoreConfig::default())
        .with(ErrorReporter::new())
        .with(ValidationMiddleware::new())
        .build()
        .unwrap();

    let result = store.dispatch(Action::toggle_feature(" "));
    assert!(matches!(result, Err(StoreError::InvalidAction(_))));

    let state = store.get_state();
    assert!(state.selections.features.is_empty());
    let message = state.ui.error.as_deref().unwrap();
    assert!(message.starts_with("Invalid action: TOGGLE_FEATURE"), "{message}");
}

// --- Unknown And Malformed Actions ---

#[test]
fn test_unknown_kind_is_a_no_op() {
    let store = Store::new(StoreConfig::default());
    let notified = count_notifications(&store);
    let before = store.get_state();

    let state = store
        .dispatch_kind("TELEPORT", serde_json::json!({ "to": "mars" }))
        .unwrap();
    assert!(Arc::ptr_eq(&state, &before));
    assert_eq!(notified.load(Ordering::SeqCst), 0);
    assert_eq!(store.history_len(), 1);
}

#[test]
fn test_malformed_payload_rejected() {
    let store = Store::new(StoreConfig::default());

    let result = store.dispatch_kind("TOGGLE_ADDON", serde_json::json!({ "identifier": 3 }));
    match result {
        Err(StoreError::InvalidPayload { kind, .. }) => assert_eq!(kind, "TOGGLE_ADDON"),
        other => panic!("expected InvalidPayload, got {other:?}"),
    }
    assert_eq!(store.revision().0, 0);
}

// --- History Boundaries ---

#[test]
fn test_history_boundaries_are_not_errors() {
    let store = Store::new(StoreConfig::default());
    let notified = count_notifications(&store);

    assert!(!store.undo());
    store.dispatch(Action::toggle_feature("a")).unwrap();
    assert!(!store.redo());
    assert!(store.undo());
    assert!(!store.undo());

    assert_eq!(notified.load(Ordering::SeqCst), 2);
}

// --- Queued Dispatch Errors ---

#[test]
fn test_queued_failure_reaches_caller_through_ui_error() {
    let store = Arc::new(
        Store::builder(StoreConfig::default())
            .with(ErrorReporter::new())
            .with(ValidationMiddleware::new())
            .build()
            .unwrap(),
    );
    let weak = Arc::downgrade(&store);
    let queued = Arc::new(std::sync::Mutex::new(None));

    let outcome = Arc::clone(&queued);
    let fired = AtomicBool::new(false);
    store.subscribe(move |state: &Arc<State>| {
        if state.progress.current_step != 2 || fired.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(store) = weak.upgrade() {
            *outcome.lock().unwrap() = Some(store.dispatch(Action::SetStep { step: 0 }).is_ok());
        }
    });

    let state = store.dispatch(Action::NextStep).unwrap();
    assert_eq!(state.progress.current_step, 2);

    // Queued behind NextStep: accepted at enqueue time, rejected later.
    assert_eq!(*queued.lock().unwrap(), Some(true));
    let state = store.get_state();
    assert_eq!(state.progress.current_step, 2);
    assert!(state.ui.error.as_deref().unwrap().contains("SET_STEP"));
}
