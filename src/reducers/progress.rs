use super::derive;
use crate::actions::Action;
use crate::error::{Result, StoreError};
use crate::state::{Progress, State};
use std::sync::Arc;

pub(super) fn reduce(state: &Arc<State>, action: &Action) -> Result<Arc<State>> {
    let progress = &state.progress;
    let target = match action {
        Action::SetStep { step } => {
            if *step < 1 || *step > progress.total_steps {
                return Err(StoreError::reducer(
                    action.kind(),
                    format!("step {} outside 1..={}", step, progress.total_steps),
                ));
            }
            *step
        }
        Action::NextStep => (progress.current_step + 1).min(progress.total_steps),
        Action::PreviousStep => progress.current_step.saturating_sub(1).max(1),
        _ => return Ok(Arc::clone(state)),
    };

    if target == progress.current_step {
        return Ok(Arc::clone(state));
    }

    let next = Progress {
        current_step: target,
        total_steps: progress.total_steps,
    };
    Ok(derive(state, |s| s.progress = Arc::new(next)))
}
