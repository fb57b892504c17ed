//! Bounded, linear undo/redo history.
//!
//! Entries hold `Arc<State>` snapshots, so a snapshot costs one pointer plus
//! whatever regions the recorded action replaced. The cursor always indexes
//! the entry that represents the current state; `entries[0]` is the oldest
//! retained baseline.

use crate::actions::{Action, ActionKind};
use crate::state::State;
use crate::types::Timestamp;
use std::collections::VecDeque;
use std::sync::Arc;

/// Default number of entries retained.
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// A recorded state.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    /// The action that produced this state (`None` for a baseline).
    pub action: Option<Action>,
    pub timestamp: Timestamp,
    pub snapshot: Arc<State>,
}

impl HistoryEntry {
    pub fn kind(&self) -> Option<ActionKind> {
        self.action.as_ref().map(Action::kind)
    }
}

/// Ring of snapshots with a cursor.
#[derive(Debug)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    cursor: usize,
    max_size: usize,
}

impl History {
    /// Start a history whose baseline is `initial`.
    ///
    /// `max_size` counts the baseline and is at least 1.
    pub fn new(initial: Arc<State>, max_size: usize) -> Self {
        let mut history = Self {
            entries: VecDeque::new(),
            cursor: 0,
            max_size: max_size.max(1),
        };
        history.rebase(initial);
        history
    }

    /// Append a state produced by `action`.
    ///
    /// Any redo tail beyond the cursor is discarded first; the oldest entry is
    /// evicted once the ring is full, shifting the cursor with it.
    pub fn record(&mut self, action: Action, snapshot: Arc<State>) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push_back(HistoryEntry {
            action: Some(action),
            timestamp: Timestamp::now(),
            snapshot,
        });

        while self.entries.len() > self.max_size {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Drop everything and make `baseline` the only entry.
    pub fn rebase(&mut self, baseline: Arc<State>) {
        self.entries.clear();
        self.entries.push_back(HistoryEntry {
            action: None,
            timestamp: Timestamp::now(),
            snapshot: baseline,
        });
        self.cursor = 0;
    }

    /// Step back; returns the snapshot to restore, or `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<Arc<State>> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(Arc::clone(&self.entries[self.cursor].snapshot))
    }

    /// Step forward; returns the snapshot to restore, or `None` at the tail.
    pub fn redo(&mut self) -> Option<Arc<State>> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(Arc::clone(&self.entries[self.cursor].snapshot))
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn current(&self) -> &HistoryEntry {
        &self.entries[self.cursor]
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }
}
