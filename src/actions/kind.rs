//! Action kinds, categories and history policy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discriminant of an [`Action`](super::Action).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    SelectPackage,
    ClearPackage,
    ToggleFeature,
    ClearFeatures,
    ToggleAddon,
    ToggleComponent,
    ToggleHvac,
    ToggleAppliance,
    ToggleContact,
    ToggleEmergency,
    ClearEmergency,
    SetServiceArea,
    ClearServiceArea,
    CalculatePrice,
    ApplyDiscount,
    RemoveDiscount,
    SetStep,
    NextStep,
    PreviousStep,
    LoadDataStart,
    LoadDataSuccess,
    LoadDataFailure,
    SetLoading,
    SetError,
    ClearError,
    ShowNotification,
    DismissNotification,
    OpenModal,
    CloseModal,
    RestoreState,
    SyncFromPeer,
    Initialize,
    ResetSystem,
    Batch,
    FlushBatch,
    Unknown,
}

/// Broad grouping of action kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Package,
    Feature,
    Addon,
    Component,
    Emergency,
    ServiceArea,
    Price,
    Progress,
    Data,
    Ui,
    Storage,
    System,
}

/// Effect of a committed action on undo/redo history.
///
/// Ordered by precedence: a batch takes the strongest policy of its members.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum HistoryPolicy {
    /// Transient: no history entry.
    Skip,
    /// Append an entry, truncating any redo tail.
    Record,
    /// Clear history; the resulting state becomes the new baseline.
    Rebase,
}

impl ActionKind {
    /// Every kind except [`ActionKind::Unknown`].
    pub const KNOWN: [ActionKind; 35] = [
        ActionKind::SelectPackage,
        ActionKind::ClearPackage,
        ActionKind::ToggleFeature,
        ActionKind::ClearFeatures,
        ActionKind::ToggleAddon,
        ActionKind::ToggleComponent,
        ActionKind::ToggleHvac,
        ActionKind::ToggleAppliance,
        ActionKind::ToggleContact,
        ActionKind::ToggleEmergency,
        ActionKind::ClearEmergency,
        ActionKind::SetServiceArea,
        ActionKind::ClearServiceArea,
        ActionKind::CalculatePrice,
        ActionKind::ApplyDiscount,
        ActionKind::RemoveDiscount,
        ActionKind::SetStep,
        ActionKind::NextStep,
        ActionKind::PreviousStep,
        ActionKind::LoadDataStart,
        ActionKind::LoadDataSuccess,
        ActionKind::LoadDataFailure,
        ActionKind::SetLoading,
        ActionKind::SetError,
        ActionKind::ClearError,
        ActionKind::ShowNotification,
        ActionKind::DismissNotification,
        ActionKind::OpenModal,
        ActionKind::CloseModal,
        ActionKind::RestoreState,
        ActionKind::SyncFromPeer,
        ActionKind::Initialize,
        ActionKind::ResetSystem,
        ActionKind::Batch,
        ActionKind::FlushBatch,
    ];

    /// The set-valued toggles, which are the batching middleware's default set.
    pub const SET_TOGGLES: [ActionKind; 6] = [
        ActionKind::ToggleFeature,
        ActionKind::ToggleAddon,
        ActionKind::ToggleComponent,
        ActionKind::ToggleHvac,
        ActionKind::ToggleAppliance,
        ActionKind::ToggleContact,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::SelectPackage => "SELECT_PACKAGE",
            ActionKind::ClearPackage => "CLEAR_PACKAGE",
            ActionKind::ToggleFeature => "TOGGLE_FEATURE",
            ActionKind::ClearFeatures => "CLEAR_FEATURES",
            ActionKind::ToggleAddon => "TOGGLE_ADDON",
            ActionKind::ToggleComponent => "TOGGLE_COMPONENT",
            ActionKind::ToggleHvac => "TOGGLE_HVAC",
            ActionKind::ToggleAppliance => "TOGGLE_APPLIANCE",
            ActionKind::ToggleContact => "TOGGLE_CONTACT",
            ActionKind::ToggleEmergency => "TOGGLE_EMERGENCY",
            ActionKind::ClearEmergency => "CLEAR_EMERGENCY",
            ActionKind::SetServiceArea => "SET_SERVICE_AREA",
            ActionKind::ClearServiceArea => "CLEAR_SERVICE_AREA",
            ActionKind::CalculatePrice => "CALCULATE_PRICE",
            ActionKind::ApplyDiscount => "APPLY_DISCOUNT",
            ActionKind::RemoveDiscount => "REMOVE_DISCOUNT",
            ActionKind::SetStep => "SET_STEP",
            ActionKind::NextStep => "NEXT_STEP",
            ActionKind::PreviousStep => "PREVIOUS_STEP",
            ActionKind::LoadDataStart => "LOAD_DATA_START",
            ActionKind::LoadDataSuccess => "LOAD_DATA_SUCCESS",
            ActionKind::LoadDataFailure => "LOAD_DATA_FAILURE",
            ActionKind::SetLoading => "SET_LOADING",
            ActionKind::SetError => "SET_ERROR",
            ActionKind::ClearError => "CLEAR_ERROR",
            ActionKind::ShowNotification => "SHOW_NOTIFICATION",
            ActionKind::DismissNotification => "DISMISS_NOTIFICATION",
            ActionKind::OpenModal => "OPEN_MODAL",
            ActionKind::CloseModal => "CLOSE_MODAL",
            ActionKind::RestoreState => "RESTORE_STATE",
            ActionKind::SyncFromPeer => "SYNC_FROM_PEER",
            ActionKind::Initialize => "INITIALIZE",
            ActionKind::ResetSystem => "RESET_SYSTEM",
            ActionKind::Batch => "BATCH",
            ActionKind::FlushBatch => "FLUSH_BATCH",
            ActionKind::Unknown => "UNKNOWN",
        }
    }

    pub fn category(self) -> ActionCategory {
        match self {
            ActionKind::SelectPackage | ActionKind::ClearPackage => ActionCategory::Package,
            ActionKind::ToggleFeature | ActionKind::ClearFeatures => ActionCategory::Feature,
            ActionKind::ToggleAddon => ActionCategory::Addon,
            ActionKind::ToggleComponent
            | ActionKind::ToggleHvac
            | ActionKind::ToggleAppliance
            | ActionKind::ToggleContact => ActionCategory::Component,
            ActionKind::ToggleEmergency | ActionKind::ClearEmergency => ActionCategory::Emergency,
            ActionKind::SetServiceArea | ActionKind::ClearServiceArea => {
                ActionCategory::ServiceArea
            }
            ActionKind::CalculatePrice | ActionKind::ApplyDiscount | ActionKind::RemoveDiscount => {
                ActionCategory::Price
            }
            ActionKind::SetStep | ActionKind::NextStep | ActionKind::PreviousStep => {
                ActionCategory::Progress
            }
            ActionKind::LoadDataStart
            | ActionKind::LoadDataSuccess
            | ActionKind::LoadDataFailure => ActionCategory::Data,
            ActionKind::SetLoading
            | ActionKind::SetError
            | ActionKind::ClearError
            | ActionKind::ShowNotification
            | ActionKind::DismissNotification
            | ActionKind::OpenModal
            | ActionKind::CloseModal => ActionCategory::Ui,
            ActionKind::RestoreState | ActionKind::SyncFromPeer => ActionCategory::Storage,
            ActionKind::Initialize
            | ActionKind::ResetSystem
            | ActionKind::Batch
            | ActionKind::FlushBatch
            | ActionKind::Unknown => ActionCategory::System,
        }
    }

    /// History policy of a single action of this kind.
    ///
    /// UI and catalog-data actions are transient. A batch's policy depends on
    /// its members, see [`Action::history_policy`](super::Action::history_policy).
    pub fn history_policy(self) -> HistoryPolicy {
        match self {
            ActionKind::RestoreState | ActionKind::ResetSystem => HistoryPolicy::Rebase,
            ActionKind::Initialize | ActionKind::FlushBatch | ActionKind::Unknown => {
                HistoryPolicy::Skip
            }
            kind if kind.is_transient() => HistoryPolicy::Skip,
            _ => HistoryPolicy::Record,
        }
    }

    /// UI-only and loading-cycle kinds: excluded from history, persistence and sync.
    pub fn is_transient(self) -> bool {
        matches!(self.category(), ActionCategory::Ui | ActionCategory::Data)
    }

    pub fn is_set_toggle(self) -> bool {
        Self::SET_TOGGLES.contains(&self)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    /// Parses known kinds only; `"UNKNOWN"` itself is not a dispatchable kind.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::KNOWN
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown action kind: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str_roundtrips_through_from_str() {
        for kind in ActionKind::KNOWN {
            assert_eq!(kind.as_str().parse::<ActionKind>(), Ok(kind));
        }
        assert!("UNKNOWN".parse::<ActionKind>().is_err());
    }

    #[test]
    fn test_as_str_matches_serde_name() {
        for kind in ActionKind::KNOWN {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::Value::String(kind.as_str().to_string()));
        }
    }

    #[test]
    fn test_ui_kinds_are_skipped_by_history() {
        assert_eq!(ActionKind::SetLoading.history_policy(), HistoryPolicy::Skip);
        assert_eq!(ActionKind::OpenModal.history_policy(), HistoryPolicy::Skip);
        assert_eq!(ActionKind::LoadDataSuccess.history_policy(), HistoryPolicy::Skip);
        assert_eq!(ActionKind::ToggleFeature.history_policy(), HistoryPolicy::Record);
        assert_eq!(ActionKind::ResetSystem.history_policy(), HistoryPolicy::Rebase);
    }

    #[test]
    fn test_categories() {
        assert_eq!(ActionKind::ToggleHvac.category(), ActionCategory::Component);
        assert_eq!(ActionKind::SetServiceArea.category(), ActionCategory::ServiceArea);
        assert_eq!(ActionKind::SyncFromPeer.category(), ActionCategory::Storage);
    }
}
