//! Integration tests for the quote store.

use parking_lot::Mutex;
use quote_store::{
    Action, ActionKind, Catalog, CatalogItem, ChangeCause, Package, Selectors, ServiceArea,
    State, Store, StoreConfig, StoreEvent, SubscriptionConfig, SubscriptionFilter,
};
use std::sync::Arc;
use std::time::Duration;

fn catalog() -> Catalog {
    Catalog {
        packages: vec![
            Package::new("growth", "Growth", 1200),
            Package::new("scale", "Scale", 2400),
        ],
        features: vec![
            CatalogItem::new("extra-seo", "Extra SEO", 300),
            CatalogItem::new("analytics", "Analytics", 150),
        ],
        addons: vec![CatalogItem::new("copywriting", "Copywriting", 200)],
        emergency_tiers: vec![CatalogItem::new("priority", "Priority", 500)],
        service_areas: vec![ServiceArea::new("metro", "Metro", 0), ServiceArea::new("rural", "Rural", 80)],
        ..Default::default()
    }
}

fn loaded_store() -> Store {
    let store = Store::new(StoreConfig::default());
    store
        .dispatch(Action::LoadDataSuccess {
            catalog: catalog(),
            replace: true,
        })
        .unwrap();
    store
}

// --- Realistic Workflow Tests ---

#[test]
fn test_feature_price_scenario() {
    let store = loaded_store();
    store.dispatch(Action::select_package("growth")).unwrap();
    let state = store.dispatch(Action::CalculatePrice).unwrap();
    assert!(state.selections.features.is_empty());
    assert_eq!(state.pricing.total_price, 1200);

    let state = store.dispatch(Action::toggle_feature("extra-seo")).unwrap();
    assert_eq!(
        state.selections.features.iter().collect::<Vec<_>>(),
        vec!["extra-seo"]
    );
    let state = store.dispatch(Action::CalculatePrice).unwrap();
    assert_eq!(state.pricing.total_price, 1500);

    let state = store.dispatch(Action::toggle_feature("extra-seo")).unwrap();
    assert!(state.selections.features.is_empty());
    let state = store.dispatch(Action::CalculatePrice).unwrap();
    assert_eq!(state.pricing.total_price, 1200);
}

#[test]
fn test_full_configurator_flow() {
    let store = loaded_store();
    let selectors = Selectors::new();

    store.dispatch(Action::select_package("scale")).unwrap();
    store.dispatch(Action::NextStep).unwrap();
    assert!(!*selectors.can_proceed.select(&store.get_state()));

    store
        .dispatch(Action::SetServiceArea {
            area_id: "rural".into(),
        })
        .unwrap();
    store
        .dispatch(Action::ToggleEmergency {
            tier_id: "priority".into(),
        })
        .unwrap();
    store
        .dispatch(Action::ToggleAddon {
            id: "copywriting".into(),
        })
        .unwrap();
    store
        .dispatch(Action::ApplyDiscount {
            code: "SPRING".into(),
            amount: 180,
        })
        .unwrap();
    let state = store.dispatch(Action::CalculatePrice).unwrap();

    assert_eq!(state.pricing.total_price, 2400 + 80 + 500 + 200);
    assert_eq!(*selectors.final_price.select(&state), 3180 - 180);
    assert!(*selectors.can_proceed.select(&state));

    let summary = selectors.quote_summary.select(&state);
    assert_eq!(summary.package.as_deref(), Some("scale"));
    assert_eq!(summary.subtotal, 3180);
    assert_eq!(summary.item_count, 3);
    assert_eq!(summary.progress_percentage, 40);

    let value = selectors.evaluate("final_price", &state).unwrap();
    assert_eq!(value, serde_json::json!(3000));
}

#[test]
fn test_string_keyed_dispatch() {
    let store = loaded_store();
    store
        .dispatch_kind("SELECT_PACKAGE", serde_json::json!({ "package_id": "growth" }))
        .unwrap();
    store
        .dispatch_kind("TOGGLE_FEATURE", serde_json::json!({ "id": "analytics" }))
        .unwrap();
    let state = store.dispatch_kind("CALCULATE_PRICE", serde_json::Value::Null).unwrap();
    assert_eq!(state.pricing.total_price, 1350);

    let before = store.get_state();
    let after = store
        .dispatch_kind("SPIN_THE_WHEEL", serde_json::json!({}))
        .unwrap();
    assert!(Arc::ptr_eq(&before, &after));

    assert!(store
        .dispatch_kind("SET_STEP", serde_json::json!({ "step": "two" }))
        .is_err());
}

// --- History ---

#[test]
fn test_undo_redo_round_trip() {
    let store = loaded_store();
    store.dispatch(Action::toggle_feature("extra-seo")).unwrap();
    let after_b = store.dispatch(Action::select_package("growth")).unwrap();

    assert!(store.undo());
    assert!(store.get_state().selections.package.is_none());
    assert!(store.redo());

    let restored = store.get_state();
    assert_eq!(*restored, *after_b);
    assert!(!Arc::ptr_eq(&restored, &after_b));
}

#[test]
fn test_new_action_truncates_redo() {
    let store = loaded_store();
    store.dispatch(Action::toggle_feature("extra-seo")).unwrap();
    store.dispatch(Action::toggle_feature("analytics")).unwrap();

    assert!(store.undo());
    store.dispatch(Action::select_package("growth")).unwrap();

    assert!(!store.can_redo());
    assert!(!store.redo());
    let state = store.get_state();
    assert!(!state.selections.features.contains("analytics"));
    assert!(state.selections.features.contains("extra-seo"));
}

#[test]
fn test_history_is_bounded() {
    let store = Store::new(StoreConfig {
        max_history_size: 4,
        ..Default::default()
    });
    for i in 0..20 {
        store.dispatch(Action::toggle_feature(format!("f{i}"))).unwrap();
    }
    assert_eq!(store.history_len(), 4);

    let mut undos = 0;
    while store.undo() {
        undos += 1;
    }
    assert_eq!(undos, 3);
    assert_eq!(store.get_state().selections.features.len(), 17);
}

#[test]
fn test_undo_at_boundary_returns_false() {
    let store = Store::new(StoreConfig::default());
    assert!(!store.undo());
    assert!(!store.redo());
    assert_eq!(store.revision().0, 0);
}

#[test]
fn test_undo_does_not_touch_catalog_or_ui() {
    let store = loaded_store();
    store.dispatch(Action::toggle_feature("extra-seo")).unwrap();
    store
        .dispatch(Action::OpenModal {
            id: "summary".into(),
        })
        .unwrap();

    let catalog = Arc::clone(&store.get_state().catalog);
    assert!(store.undo());
    let state = store.get_state();
    assert!(state.selections.features.is_empty());
    assert!(state.ui.is_modal_open("summary"));
    assert!(Arc::ptr_eq(&state.catalog, &catalog));
}

// --- Subscriptions ---

#[test]
fn test_subscribers_notified_in_order_once_per_change() {
    let store = Store::new(StoreConfig::default());
    let calls = Arc::new(Mutex::new(Vec::new()));
    for label in ["first", "second"] {
        let calls = Arc::clone(&calls);
        store.subscribe(move |_| calls.lock().push(label));
    }

    store.dispatch(Action::toggle_feature("a")).unwrap();
    store.dispatch(Action::PreviousStep).unwrap();
    store.undo();

    assert_eq!(*calls.lock(), vec!["first", "second", "first", "second"]);
}

#[test]
fn test_unsubscribe_stops_notifications() {
    let store = Store::new(StoreConfig::default());
    let count = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&count);
    let id = store.subscribe(move |_| *counter.lock() += 1);

    store.dispatch(Action::NextStep).unwrap();
    assert!(store.unsubscribe(id));
    store.dispatch(Action::NextStep).unwrap();
    assert_eq!(*count.lock(), 1);
}

#[test]
fn test_channel_subscription_sees_causes() {
    let store = Store::new(StoreConfig::default());
    let handle = store.subscribe_channel(SubscriptionConfig::default());
    let prices = store.subscribe_channel(SubscriptionConfig {
        filter: SubscriptionFilter::kinds(vec![ActionKind::ToggleFeature]),
        ..Default::default()
    });

    store.dispatch(Action::toggle_feature("a")).unwrap();
    store.dispatch(Action::NextStep).unwrap();
    store.undo();

    let causes: Vec<ChangeCause> = handle
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            StoreEvent::StateChanged { cause, .. } => Some(cause),
            StoreEvent::Dropped { .. } => None,
        })
        .collect();
    assert_eq!(
        causes,
        vec![
            ChangeCause::Action(ActionKind::ToggleFeature),
            ChangeCause::Action(ActionKind::NextStep),
            ChangeCause::Undo,
        ]
    );

    assert!(prices.recv_timeout(Duration::from_millis(100)).is_ok());
    assert!(prices.try_recv().is_err());
}

#[test]
fn test_reentrant_dispatch_preserves_order() {
    let store = Arc::new(Store::new(StoreConfig::default()));
    let weak = Arc::downgrade(&store);
    let observed = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&observed);
    store.subscribe(move |state: &Arc<State>| {
        let features: Vec<String> = state.selections.features.iter().cloned().collect();
        log.lock().push(features.clone());
        if features == ["w"] {
            let store = weak.upgrade().unwrap();
            // W is committed and visible before X runs.
            assert!(store.get_state().selections.features.contains("w"));
            store.dispatch(Action::toggle_feature("x")).unwrap();
            store.dispatch(Action::toggle_feature("y")).unwrap();
            assert!(!store.get_state().selections.features.contains("x"));
        }
    });

    store.dispatch(Action::toggle_feature("w")).unwrap();

    assert_eq!(
        *observed.lock(),
        vec![
            vec!["w".to_string()],
            vec!["w".to_string(), "x".to_string()],
            vec!["w".to_string(), "x".to_string(), "y".to_string()],
        ]
    );
    assert_eq!(store.history_len(), 4);
}

#[test]
fn test_reset_system() {
    let store = loaded_store();
    store.dispatch(Action::select_package("growth")).unwrap();
    store.dispatch(Action::NextStep).unwrap();

    let state = store.dispatch(Action::ResetSystem).unwrap();
    assert_eq!(*state, State::initial(5));
    assert!(!store.can_undo());
}

// --- Selectors ---

#[test]
fn test_selectors_recompute_only_on_relevant_change() {
    let store = loaded_store();
    let selectors = Selectors::new();
    store.dispatch(Action::select_package("growth")).unwrap();

    let total = selectors.subtotal.select(&store.get_state());
    assert_eq!(*total, 1200);
    assert_eq!(selectors.subtotal.recomputations(), 1);

    // UI changes replace the root but not the regions the subtotal reads.
    store
        .dispatch(Action::OpenModal {
            id: "help".into(),
        })
        .unwrap();
    let again = selectors.subtotal.select(&store.get_state());
    assert!(Arc::ptr_eq(&total, &again));
    assert_eq!(selectors.subtotal.recomputations(), 1);

    store.dispatch(Action::toggle_feature("extra-seo")).unwrap();
    assert_eq!(*selectors.subtotal.select(&store.get_state()), 1500);
    assert_eq!(selectors.subtotal.recomputations(), 2);
}
