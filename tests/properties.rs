//! Property tests for reducers and history.

use proptest::prelude::*;
use quote_store::{reduce, Action, State, Store, StoreConfig};
use std::sync::Arc;

// -- Strategy helpers --

fn arb_id() -> impl Strategy<Value = String> {
    "[a-z]{1,6}(-[a-z]{1,4})?"
}

fn arb_toggle() -> impl Strategy<Value = Action> {
    arb_id().prop_flat_map(|id| {
        prop_oneof![
            Just(Action::ToggleFeature { id: id.clone() }),
            Just(Action::ToggleAddon { id: id.clone() }),
            Just(Action::ToggleComponent { id: id.clone() }),
            Just(Action::ToggleHvac { id: id.clone() }),
            Just(Action::ToggleAppliance { id: id.clone() }),
            Just(Action::ToggleContact { id }),
        ]
    })
}

/// Actions that always succeed against an empty catalog.
fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => arb_toggle(),
        1 => arb_id().prop_map(|package_id| Action::SelectPackage { package_id }),
        1 => Just(Action::NextStep),
        1 => Just(Action::PreviousStep),
        1 => Just(Action::CalculatePrice),
        1 => arb_id().prop_map(|id| Action::OpenModal { id }),
    ]
}

proptest! {
    /// Toggling the same id twice restores the original set contents.
    #[test]
    fn toggle_twice_is_identity(
        seed in prop::collection::vec(arb_toggle(), 0..8),
        toggle in arb_toggle(),
    ) {
        let mut state = Arc::new(State::initial(5));
        for action in &seed {
            state = reduce(&state, action).unwrap();
        }

        let once = reduce(&state, &toggle).unwrap();
        let twice = reduce(&once, &toggle).unwrap();
        prop_assert_eq!(&twice.selections, &state.selections);
        prop_assert_ne!(&once.selections, &state.selections);
    }

    /// Undoing every recorded step and redoing them lands on an equal slice.
    #[test]
    fn undo_all_then_redo_all_round_trips(actions in prop::collection::vec(arb_action(), 1..20)) {
        let store = Store::new(StoreConfig {
            max_history_size: 64,
            ..Default::default()
        });
        let initial = store.get_state();
        for action in actions {
            store.dispatch(action).unwrap();
        }
        let last = store.get_state();

        let mut undone = 0;
        while store.undo() {
            undone += 1;
        }
        prop_assert_eq!(store.get_state().slice(), initial.slice());

        for _ in 0..undone {
            prop_assert!(store.redo());
        }
        prop_assert!(!store.can_redo());
        prop_assert_eq!(store.get_state().slice(), last.slice());
    }

    /// The history never grows past its bound.
    #[test]
    fn history_is_bounded(bound in 1usize..8, ids in prop::collection::vec(arb_id(), 0..30)) {
        let store = Store::new(StoreConfig {
            max_history_size: bound,
            ..Default::default()
        });
        for id in ids {
            store.dispatch(Action::toggle_feature(id)).unwrap();
            prop_assert!(store.history_len() <= bound);
        }
    }
}
