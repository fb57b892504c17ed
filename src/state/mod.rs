//! The state tree.
//!
//! Every region sits behind an [`Arc`] so reducers can replace one sub-tree
//! and share the rest with the previous version. The store always commits a
//! new root `Arc<State>` for an accepted change; selectors key their memo on
//! that root identity.

mod catalog;

pub use catalog::{Catalog, CatalogItem, Identified, Package, ServiceArea};

use crate::types::{Discount, Notification, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Default number of steps in the configurator flow.
pub const DEFAULT_TOTAL_STEPS: u32 = 5;

/// A set of opaque selection identifiers, shared copy-on-write.
pub type IdSet = Arc<BTreeSet<String>>;

/// The set-valued selection domains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionSet {
    Features,
    Addons,
    Components,
    Hvac,
    Appliances,
    Contacts,
}

impl SelectionSet {
    pub const ALL: [SelectionSet; 6] = [
        SelectionSet::Features,
        SelectionSet::Addons,
        SelectionSet::Components,
        SelectionSet::Hvac,
        SelectionSet::Appliances,
        SelectionSet::Contacts,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SelectionSet::Features => "features",
            SelectionSet::Addons => "addons",
            SelectionSet::Components => "components",
            SelectionSet::Hvac => "hvac",
            SelectionSet::Appliances => "appliances",
            SelectionSet::Contacts => "contacts",
        }
    }
}

impl fmt::Display for SelectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user has picked so far.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selections {
    pub package: Option<String>,
    pub emergency_tier: Option<String>,
    pub service_area: Option<String>,
    pub features: IdSet,
    pub addons: IdSet,
    pub components: IdSet,
    pub hvac: IdSet,
    pub appliances: IdSet,
    pub contacts: IdSet,
}

impl Selections {
    pub fn set(&self, which: SelectionSet) -> &IdSet {
        match which {
            SelectionSet::Features => &self.features,
            SelectionSet::Addons => &self.addons,
            SelectionSet::Components => &self.components,
            SelectionSet::Hvac => &self.hvac,
            SelectionSet::Appliances => &self.appliances,
            SelectionSet::Contacts => &self.contacts,
        }
    }

    /// Copy with one set replaced; the other sets stay shared.
    pub fn with_set(&self, which: SelectionSet, ids: IdSet) -> Selections {
        let mut next = self.clone();
        match which {
            SelectionSet::Features => next.features = ids,
            SelectionSet::Addons => next.addons = ids,
            SelectionSet::Components => next.components = ids,
            SelectionSet::Hvac => next.hvac = ids,
            SelectionSet::Appliances => next.appliances = ids,
            SelectionSet::Contacts => next.contacts = ids,
        }
        next
    }

    /// Number of selected set members across all domains.
    pub fn set_member_count(&self) -> usize {
        SelectionSet::ALL.iter().map(|s| self.set(*s).len()).sum()
    }
}

/// Derived pricing stored on the tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pricing {
    /// Price before discount, as of the last `CALCULATE_PRICE`.
    pub total_price: u64,
    pub discount: Option<Discount>,
}

/// Position in the step flow. `current_step` is in `[1, total_steps]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub current_step: u32,
    pub total_steps: u32,
}

impl Progress {
    pub fn new(total_steps: u32) -> Self {
        Self {
            current_step: 1,
            total_steps: total_steps.max(1),
        }
    }

    /// Check that `self` can stand in for progress through `total_steps`
    /// steps, e.g. when it comes from storage or another tab.
    pub fn fits(&self, total_steps: u32) -> std::result::Result<(), String> {
        if self.total_steps != total_steps {
            return Err(format!("{} steps, expected {total_steps}", self.total_steps));
        }
        if self.current_step < 1 || self.current_step > self.total_steps {
            return Err(format!("step {} outside 1..={}", self.current_step, self.total_steps));
        }
        Ok(())
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(DEFAULT_TOTAL_STEPS)
    }
}

/// Transient UI state. Never recorded in history, never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiState {
    pub loading: bool,
    pub error: Option<String>,
    pub notification: Option<Notification>,
    pub modals: BTreeMap<String, bool>,
}

impl UiState {
    pub fn is_modal_open(&self, id: &str) -> bool {
        self.modals.get(id).copied().unwrap_or(false)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemState {
    pub initialized: bool,
    /// Timestamp of the last peer update applied through cross-tab sync.
    pub last_remote_sync: Option<Timestamp>,
}

/// The whole state tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub selections: Arc<Selections>,
    pub pricing: Arc<Pricing>,
    pub progress: Arc<Progress>,
    pub catalog: Arc<Catalog>,
    pub ui: Arc<UiState>,
    pub system: Arc<SystemState>,
}

impl State {
    /// Fresh initial state for a flow of `total_steps` steps.
    pub fn initial(total_steps: u32) -> Self {
        Self {
            progress: Arc::new(Progress::new(total_steps)),
            ..Default::default()
        }
    }

    /// Copy of this tree carrying `ui` instead of its own UI region.
    pub fn with_ui(&self, ui: Arc<UiState>) -> State {
        State { ui, ..self.clone() }
    }

    /// The persistable, syncable part of the tree.
    pub fn slice(&self) -> StateSlice {
        StateSlice {
            selections: Arc::clone(&self.selections),
            pricing: Arc::clone(&self.pricing),
            progress: Arc::clone(&self.progress),
        }
    }

    /// Copy of this tree with the regions of `slice` spliced in.
    pub fn with_slice(&self, slice: &StateSlice) -> State {
        State {
            selections: Arc::clone(&slice.selections),
            pricing: Arc::clone(&slice.pricing),
            progress: Arc::clone(&slice.progress),
            ..self.clone()
        }
    }

    /// True when every non-UI region is reference-identical.
    pub fn same_data_as(&self, other: &State) -> bool {
        Arc::ptr_eq(&self.selections, &other.selections)
            && Arc::ptr_eq(&self.pricing, &other.pricing)
            && Arc::ptr_eq(&self.progress, &other.progress)
            && Arc::ptr_eq(&self.catalog, &other.catalog)
            && Arc::ptr_eq(&self.system, &other.system)
    }
}

/// User selections, pricing and progress: what gets persisted and synced.
///
/// UI state and the catalog are deliberately absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSlice {
    pub selections: Arc<Selections>,
    pub pricing: Arc<Pricing>,
    pub progress: Arc<Progress>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_starts_at_step_one() {
        let state = State::initial(4);
        assert_eq!(state.progress.current_step, 1);
        assert_eq!(state.progress.total_steps, 4);
        assert!(!state.system.initialized);
    }

    #[test]
    fn test_with_set_shares_untouched_sets() {
        let selections = Selections::default();
        let ids: IdSet = Arc::new(["seo".to_string()].into_iter().collect());
        let next = selections.with_set(SelectionSet::Features, ids);

        assert!(next.features.contains("seo"));
        assert!(Arc::ptr_eq(&selections.addons, &next.addons));
        assert!(Arc::ptr_eq(&selections.hvac, &next.hvac));
    }

    #[test]
    fn test_slice_excludes_ui() {
        let mut state = State::initial(5);
        state.ui = Arc::new(UiState {
            loading: true,
            ..Default::default()
        });
        let json = serde_json::to_value(state.slice()).unwrap();
        assert!(json.get("ui").is_none());
        assert!(json.get("selections").is_some());
    }

    #[test]
    fn test_with_slice_keeps_catalog_and_ui() {
        let state = State::initial(5);
        let other = State::initial(7);
        let spliced = state.with_slice(&other.slice());

        assert_eq!(spliced.progress.total_steps, 7);
        assert!(Arc::ptr_eq(&spliced.catalog, &state.catalog));
        assert!(Arc::ptr_eq(&spliced.ui, &state.ui));
    }
}
