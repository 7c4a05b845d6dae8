//! # Undo Slot
//!
//! Holds the one deletion that can still be taken back.
//!
//! ```text
//!            stash(x)                 take() → Some(x)
//!   Idle ───────────────► Pending(x) ──────────────────► Idle
//!    ▲                      │   │
//!    │      abort() → x     │   │ stash(y) → Some(x)   (x is displaced)
//!    └──────────────────────┘   └──────► Pending(y)
//! ```
//!
//! The slot only stores the snapshot. Re-inserting it, or cleaning up after
//! a displaced category, is the view model's job.

use std::sync::Mutex;

use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
enum SlotState<T> {
    Idle,
    Pending(T),
}

/// Single pending undo for one list.
#[derive(Debug)]
pub struct UndoSlot<T> {
    state: Mutex<SlotState<T>>,
}

impl<T> Default for UndoSlot<T> {
    fn default() -> Self {
        UndoSlot {
            state: Mutex::new(SlotState::Idle),
        }
    }
}

impl<T: Clone> UndoSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers a deleted row. Returns whatever was pending before.
    pub fn stash(&self, deleted: T) -> Option<T> {
        let mut state = self.lock();
        let displaced = match std::mem::replace(&mut *state, SlotState::Pending(deleted)) {
            SlotState::Pending(previous) => Some(previous),
            SlotState::Idle => None,
        };
        debug!(displaced = displaced.is_some(), "Undo slot filled");
        displaced
    }

    /// Empties the slot for a restore. `None` if nothing was pending.
    pub fn take(&self) -> Option<T> {
        match std::mem::replace(&mut *self.lock(), SlotState::Idle) {
            SlotState::Pending(deleted) => Some(deleted),
            SlotState::Idle => None,
        }
    }

    /// Drops the pending row for good. Same as `take`, but named for intent.
    pub fn abort(&self) -> Option<T> {
        let discarded = self.take();
        if discarded.is_some() {
            debug!("Undo discarded");
        }
        discarded
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.lock(), SlotState::Pending(_))
    }

    /// Copy of the pending row, slot unchanged.
    pub fn peek(&self) -> Option<T> {
        match &*self.lock() {
            SlotState::Pending(deleted) => Some(deleted.clone()),
            SlotState::Idle => None,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState<T>> {
        // The state is always valid, even after a panic mid-update
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_once() {
        let slot = UndoSlot::new();
        slot.stash("Milk");

        assert!(slot.is_pending());
        assert_eq!(slot.take(), Some("Milk"));
        assert_eq!(slot.take(), None);
        assert!(!slot.is_pending());
    }

    #[test]
    fn test_second_delete_overwrites() {
        let slot = UndoSlot::new();

        assert_eq!(slot.stash("Milk"), None);
        assert_eq!(slot.stash("Eggs"), Some("Milk"));
        assert_eq!(slot.peek(), Some("Eggs"));
        assert_eq!(slot.take(), Some("Eggs"));
    }

    #[test]
    fn test_abort_empties() {
        let slot = UndoSlot::new();
        assert_eq!(slot.abort(), None);

        slot.stash(3);
        assert_eq!(slot.abort(), Some(3));
        assert_eq!(slot.take(), None);
    }
}
