use super::derive;
use crate::actions::Action;
use crate::error::Result;
use crate::state::State;
use std::sync::Arc;

pub(super) fn reduce(state: &Arc<State>, action: &Action) -> Result<Arc<State>> {
    let mut ui = (*state.ui).clone();
    match action {
        Action::SetLoading { loading } => ui.loading = *loading,
        Action::SetError { message } => ui.error = Some(message.clone()),
        Action::ClearError => ui.error = None,
        Action::ShowNotification(notification) => ui.notification = Some(notification.clone()),
        Action::DismissNotification => ui.notification = None,
        Action::OpenModal { id } => {
            ui.modals.insert(id.clone(), true);
        }
        Action::CloseModal { id } => {
            ui.modals.remove(id);
        }
        _ => return Ok(Arc::clone(state)),
    }

    if ui == *state.ui {
        return Ok(Arc::clone(state));
    }
    Ok(derive(state, |s| s.ui = Arc::new(ui)))
}
