//! Package, set-valued selection, emergency tier and service area reducers.

use super::derive;
use crate::actions::Action;
use crate::error::{Result, StoreError};
use crate::state::{SelectionSet, Selections, State};
use std::sync::Arc;

pub(super) fn reduce(state: &Arc<State>, action: &Action) -> Result<Arc<State>> {
    if let Some((set, id)) = action.toggle_target() {
        if id.is_empty() {
            return Err(StoreError::reducer(action.kind(), "empty selection id"));
        }
        return Ok(toggle(state, set, id));
    }

    let selections = &state.selections;
    let next = match action {
        Action::SelectPackage { package_id } => {
            if package_id.is_empty() {
                return Err(StoreError::reducer(action.kind(), "empty package id"));
            }
            if selections.package.as_deref() == Some(package_id.as_str()) {
                return Ok(Arc::clone(state));
            }
            Selections {
                package: Some(package_id.clone()),
                ..(**selections).clone()
            }
        }
        Action::ClearPackage => {
            if selections.package.is_none() {
                return Ok(Arc::clone(state));
            }
            Selections {
                package: None,
                ..(**selections).clone()
            }
        }
        Action::ClearFeatures => {
            if selections.features.is_empty() {
                return Ok(Arc::clone(state));
            }
            selections.with_set(SelectionSet::Features, Default::default())
        }
        // Single-valued toggle: the selected tier clears, any other replaces it.
        Action::ToggleEmergency { tier_id } => {
            if tier_id.is_empty() {
                return Err(StoreError::reducer(action.kind(), "empty tier id"));
            }
            let emergency_tier = if selections.emergency_tier.as_deref() == Some(tier_id.as_str())
            {
                None
            } else {
                Some(tier_id.clone())
            };
            Selections {
                emergency_tier,
                ..(**selections).clone()
            }
        }
        Action::ClearEmergency => {
            if selections.emergency_tier.is_none() {
                return Ok(Arc::clone(state));
            }
            Selections {
                emergency_tier: None,
                ..(**selections).clone()
            }
        }
        Action::SetServiceArea { area_id } => {
            if area_id.is_empty() {
                return Err(StoreError::reducer(action.kind(), "empty service area id"));
            }
            if selections.service_area.as_deref() == Some(area_id.as_str()) {
                return Ok(Arc::clone(state));
            }
            Selections {
                service_area: Some(area_id.clone()),
                ..(**selections).clone()
            }
        }
        Action::ClearServiceArea => {
            if selections.service_area.is_none() {
                return Ok(Arc::clone(state));
            }
            Selections {
                service_area: None,
                ..(**selections).clone()
            }
        }
        _ => return Ok(Arc::clone(state)),
    };

    Ok(derive(state, |s| s.selections = Arc::new(next)))
}

/// The toggle contract shared by every set-valued domain: present ids are
/// removed, absent ids are added. The set is copied, never mutated in place.
fn toggle(state: &State, set: SelectionSet, id: &str) -> Arc<State> {
    let mut ids = (**state.selections.set(set)).clone();
    let selected = if ids.remove(id) {
        false
    } else {
        ids.insert(id.to_string());
        true
    };

    tracing::trace!(set = %set, id, selected, "selection toggled");

    let selections = state.selections.with_set(set, Arc::new(ids));
    derive(state, |s| s.selections = Arc::new(selections))
}
