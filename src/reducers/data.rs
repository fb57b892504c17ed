//! Catalog loading cycle.

use super::derive;
use crate::actions::Action;
use crate::error::Result;
use crate::state::{State, UiState};
use std::sync::Arc;

pub(super) fn reduce(state: &Arc<State>, action: &Action) -> Result<Arc<State>> {
    match action {
        Action::LoadDataStart => {
            if state.ui.loading && state.ui.error.is_none() {
                return Ok(Arc::clone(state));
            }
            let ui = UiState {
                loading: true,
                error: None,
                ..(*state.ui).clone()
            };
            Ok(derive(state, |s| s.ui = Arc::new(ui)))
        }
        Action::LoadDataSuccess { catalog, replace } => {
            let next_catalog = if *replace {
                (*state.catalog != *catalog).then(|| catalog.clone())
            } else {
                state.catalog.merged(catalog)
            };
            if next_catalog.is_none() && !state.ui.loading {
                return Ok(Arc::clone(state));
            }

            tracing::debug!(
                replace,
                changed = next_catalog.is_some(),
                "catalog data loaded"
            );

            let ui = state.ui.loading.then(|| UiState {
                loading: false,
                ..(*state.ui).clone()
            });
            Ok(derive(state, |s| {
                if let Some(catalog) = next_catalog {
                    s.catalog = Arc::new(catalog);
                }
                if let Some(ui) = ui {
                    s.ui = Arc::new(ui);
                }
            }))
        }
        Action::LoadDataFailure { error } => {
            let ui = UiState {
                loading: false,
                error: Some(error.clone()),
                ..(*state.ui).clone()
            };
            if *state.ui == ui {
                return Ok(Arc::clone(state));
            }
            Ok(derive(state, |s| s.ui = Arc::new(ui)))
        }
        _ => Ok(Arc::clone(state)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Catalog, CatalogItem};

    fn catalog() -> Catalog {
        Catalog {
            features: vec![CatalogItem::new("seo", "SEO", 300)],
            ..Default::default()
        }
    }

    #[test]
    fn test_load_cycle_toggles_loading() {
        let state = Arc::new(State::initial(5));
        let loading = reduce(&state, &Action::LoadDataStart).unwrap();
        assert!(loading.ui.loading);

        let loaded = reduce(
            &loading,
            &Action::LoadDataSuccess {
                catalog: catalog(),
                replace: false,
            },
        )
        .unwrap();
        assert!(!loaded.ui.loading);
        assert_eq!(loaded.catalog.features.len(), 1);
        assert!(Arc::ptr_eq(&loading.selections, &loaded.selections));
    }

    #[test]
    fn test_reloading_same_catalog_is_noop() {
        let state = Arc::new(State::initial(5));
        let action = Action::LoadDataSuccess {
            catalog: catalog(),
            replace: false,
        };
        let loaded = reduce(&state, &action).unwrap();
        let again = reduce(&loaded, &action).unwrap();
        assert!(Arc::ptr_eq(&loaded, &again));
    }

    #[test]
    fn test_replace_swaps_catalog() {
        let state = Arc::new(State::initial(5));
        let loaded = reduce(
            &state,
            &Action::LoadDataSuccess {
                catalog: catalog(),
                replace: false,
            },
        )
        .unwrap();
        let replaced = reduce(
            &loaded,
            &Action::LoadDataSuccess {
                catalog: Catalog::default(),
                replace: true,
            },
        )
        .unwrap();
        assert!(replaced.catalog.is_empty());
    }

    #[test]
    fn test_failure_sets_error() {
        let state = Arc::new(State::initial(5));
        let failed = reduce(
            &state,
            &Action::LoadDataFailure {
                error: "timeout".into(),
            },
        )
        .unwrap();
        assert_eq!(failed.ui.error.as_deref(), Some("timeout"));
        assert!(!failed.ui.loading);
    }
}
