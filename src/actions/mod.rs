//! Actions: data-only descriptions of an intended state change.
//!
//! [`Action`] is a closed sum type. On the wire it is adjacently tagged as
//! `{ "kind": "TOGGLE_FEATURE", "payload": { "id": "extra-seo" } }`, so the
//! payload shape is determined by the kind alone. Kinds that are not part of
//! the enumeration map to [`Action::Unknown`], which every reducer treats as
//! a no-op.

mod kind;

pub use kind::{ActionCategory, ActionKind, HistoryPolicy};

use crate::error::{Result, StoreError};
use crate::state::{Catalog, SelectionSet, StateSlice};
use crate::types::{Notification, Timestamp};
use serde::{Deserialize, Serialize};

/// An intended change to the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    // --- Package ---
    SelectPackage { package_id: String },
    ClearPackage,

    // --- Set-valued selections ---
    ToggleFeature { id: String },
    ClearFeatures,
    ToggleAddon { id: String },
    ToggleComponent { id: String },
    ToggleHvac { id: String },
    ToggleAppliance { id: String },
    ToggleContact { id: String },

    // --- Emergency tier ---
    ToggleEmergency { tier_id: String },
    ClearEmergency,

    // --- Service area ---
    SetServiceArea { area_id: String },
    ClearServiceArea,

    // --- Price ---
    CalculatePrice,
    ApplyDiscount { code: String, amount: u64 },
    RemoveDiscount,

    // --- Progress ---
    SetStep { step: u32 },
    NextStep,
    PreviousStep,

    // --- Catalog data ---
    LoadDataStart,
    LoadDataSuccess {
        catalog: Catalog,
        #[serde(default)]
        replace: bool,
    },
    LoadDataFailure { error: String },

    // --- UI ---
    SetLoading { loading: bool },
    SetError { message: String },
    ClearError,
    ShowNotification(Notification),
    DismissNotification,
    OpenModal { id: String },
    CloseModal { id: String },

    // --- Storage ---
    RestoreState { slice: StateSlice },
    SyncFromPeer { slice: StateSlice, timestamp: Timestamp },

    // --- System ---
    Initialize,
    ResetSystem,
    Batch { actions: Vec<Action> },
    FlushBatch,

    /// A kind outside the enumeration, kept so the string-keyed surface can
    /// accept it and reduce it to nothing.
    #[serde(skip)]
    Unknown {
        kind: String,
        payload: serde_json::Value,
    },
}

impl Action {
    /// Build an action from a string kind and a JSON payload.
    ///
    /// Unknown kinds become [`Action::Unknown`]. A known kind with a payload of
    /// the wrong shape is rejected.
    pub fn from_parts(kind: &str, payload: serde_json::Value) -> Result<Action> {
        if kind.parse::<ActionKind>().is_err() {
            return Ok(Action::Unknown {
                kind: kind.to_string(),
                payload,
            });
        }

        let mut envelope = serde_json::Map::new();
        envelope.insert("kind".into(), serde_json::Value::String(kind.to_string()));
        if !payload.is_null() {
            envelope.insert("payload".into(), payload);
        }

        serde_json::from_value(serde_json::Value::Object(envelope)).map_err(|e| {
            StoreError::InvalidPayload {
                kind: kind.to_string(),
                message: e.to_string(),
            }
        })
    }

    pub fn batch(actions: impl IntoIterator<Item = Action>) -> Action {
        Action::Batch {
            actions: actions.into_iter().collect(),
        }
    }

    pub fn toggle_feature(id: impl Into<String>) -> Action {
        Action::ToggleFeature { id: id.into() }
    }

    pub fn select_package(package_id: impl Into<String>) -> Action {
        Action::SelectPackage {
            package_id: package_id.into(),
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::SelectPackage { .. } => ActionKind::SelectPackage,
            Action::ClearPackage => ActionKind::ClearPackage,
            Action::ToggleFeature { .. } => ActionKind::ToggleFeature,
            Action::ClearFeatures => ActionKind::ClearFeatures,
            Action::ToggleAddon { .. } => ActionKind::ToggleAddon,
            Action::ToggleComponent { .. } => ActionKind::ToggleComponent,
            Action::ToggleHvac { .. } => ActionKind::ToggleHvac,
            Action::ToggleAppliance { .. } => ActionKind::ToggleAppliance,
            Action::ToggleContact { .. } => ActionKind::ToggleContact,
            Action::ToggleEmergency { .. } => ActionKind::ToggleEmergency,
            Action::ClearEmergency => ActionKind::ClearEmergency,
            Action::SetServiceArea { .. } => ActionKind::SetServiceArea,
            Action::ClearServiceArea => ActionKind::ClearServiceArea,
            Action::CalculatePrice => ActionKind::CalculatePrice,
            Action::ApplyDiscount { .. } => ActionKind::ApplyDiscount,
            Action::RemoveDiscount => ActionKind::RemoveDiscount,
            Action::SetStep { .. } => ActionKind::SetStep,
            Action::NextStep => ActionKind::NextStep,
            Action::PreviousStep => ActionKind::PreviousStep,
            Action::LoadDataStart => ActionKind::LoadDataStart,
            Action::LoadDataSuccess { .. } => ActionKind::LoadDataSuccess,
            Action::LoadDataFailure { .. } => ActionKind::LoadDataFailure,
            Action::SetLoading { .. } => ActionKind::SetLoading,
            Action::SetError { .. } => ActionKind::SetError,
            Action::ClearError => ActionKind::ClearError,
            Action::ShowNotification(_) => ActionKind::ShowNotification,
            Action::DismissNotification => ActionKind::DismissNotification,
            Action::OpenModal { .. } => ActionKind::OpenModal,
            Action::CloseModal { .. } => ActionKind::CloseModal,
            Action::RestoreState { .. } => ActionKind::RestoreState,
            Action::SyncFromPeer { .. } => ActionKind::SyncFromPeer,
            Action::Initialize => ActionKind::Initialize,
            Action::ResetSystem => ActionKind::ResetSystem,
            Action::Batch { .. } => ActionKind::Batch,
            Action::FlushBatch => ActionKind::FlushBatch,
            Action::Unknown { .. } => ActionKind::Unknown,
        }
    }

    /// Set and identifier targeted by a set-valued toggle.
    pub fn toggle_target(&self) -> Option<(SelectionSet, &str)> {
        match self {
            Action::ToggleFeature { id } => Some((SelectionSet::Features, id)),
            Action::ToggleAddon { id } => Some((SelectionSet::Addons, id)),
            Action::ToggleComponent { id } => Some((SelectionSet::Components, id)),
            Action::ToggleHvac { id } => Some((SelectionSet::Hvac, id)),
            Action::ToggleAppliance { id } => Some((SelectionSet::Appliances, id)),
            Action::ToggleContact { id } => Some((SelectionSet::Contacts, id)),
            _ => None,
        }
    }

    /// How committing this action affects undo/redo history.
    ///
    /// A batch rebases if any member rebases, records if any member records,
    /// and is skipped otherwise.
    pub fn history_policy(&self) -> HistoryPolicy {
        match self {
            Action::Batch { actions } => actions
                .iter()
                .map(Action::history_policy)
                .max()
                .unwrap_or(HistoryPolicy::Skip),
            other => other.kind().history_policy(),
        }
    }

    /// Stable byte encoding used for fingerprinting.
    pub fn to_fingerprint_bytes(&self) -> Vec<u8> {
        match self {
            Action::Unknown { kind, payload } => format!("{kind}:{payload}").into_bytes(),
            other => serde_json::to_vec(other).unwrap_or_else(|_| other.kind().as_str().into()),
        }
    }
}
