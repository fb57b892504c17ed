use super::{Middleware, Next};
use crate::actions::Action;
use crate::error::{Result, StoreError};
use crate::state::State;
use crate::store::Store;
use std::sync::Arc;

/// Rejects actions that cannot apply to the current state.
///
/// Checks are structural: step bounds, blank identifiers and discount codes,
/// and, once a catalog is loaded, that selected ids exist in it. Deselecting
/// an id that is already selected is always allowed.
#[derive(Debug, Default)]
pub struct ValidationMiddleware;

impl ValidationMiddleware {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(state: &State, action: &Action) -> Result<()> {
        let catalog = &state.catalog;
        let selections = &state.selections;

        if let Some((set, id)) = action.toggle_target() {
            if id.trim().is_empty() {
                return Err(invalid(action, format!("blank {set} id")));
            }
            let deselecting = selections.set(set).contains(id);
            if !deselecting && !catalog.is_empty() && catalog.item(set, id).is_none() {
                return Err(invalid(action, format!("unknown {set} id '{id}'")));
            }
            return Ok(());
        }

        match action {
            Action::SelectPackage { package_id } => {
                if !catalog.is_empty() && catalog.package(package_id).is_none() {
                    return Err(invalid(action, format!("unknown package '{package_id}'")));
                }
            }
            Action::ToggleEmergency { tier_id } => {
                let deselecting = selections.emergency_tier.as_deref() == Some(tier_id.as_str());
                if !deselecting && !catalog.is_empty() && catalog.emergency_tier(tier_id).is_none() {
                    return Err(invalid(action, format!("unknown emergency tier '{tier_id}'")));
                }
            }
            Action::SetServiceArea { area_id } => {
                if !catalog.is_empty() && catalog.service_area(area_id).is_none() {
                    return Err(invalid(action, format!("unknown service area '{area_id}'")));
                }
            }
            Action::SetStep { step } => {
                let total = state.progress.total_steps;
                if *step < 1 || *step > total {
                    return Err(invalid(action, format!("step {step} outside 1..={total}")));
                }
            }
            Action::RestoreState { slice } | Action::SyncFromPeer { slice, .. } => {
                if let Err(reason) = slice.progress.fits(state.progress.total_steps) {
                    return Err(invalid(action, format!("incoming progress: {reason}")));
                }
            }
            Action::ApplyDiscount { code, .. } if code.trim().is_empty() => {
                return Err(invalid(action, "blank discount code".to_string()));
            }
            Action::OpenModal { id } | Action::CloseModal { id } if id.trim().is_empty() => {
                return Err(invalid(action, "blank modal id".to_string()));
            }
            Action::Batch { actions } => {
                for member in actions {
                    Self::validate(state, member)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn invalid(action: &Action, reason: String) -> StoreError {
    StoreError::InvalidAction(format!("{}: {reason}", action.kind()))
}

impl Middleware for ValidationMiddleware {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn handle(&self, store: &Store, action: Action, next: &Next<'_>) -> Result<Arc<State>> {
        if let Err(e) = Self::validate(&store.working_state(), &action) {
            tracing::debug!(kind = %action.kind(), error = %e, "rejected");
            return Err(e);
        }
        next(action)
    }
}
