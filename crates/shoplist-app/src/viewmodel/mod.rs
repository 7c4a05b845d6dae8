//! # View Models
//!
//! One command handler per screen. Each is `Clone + Send + Sync` and cheap to
//! clone: clones share the database, the sort settings, the undo slot and
//! the projection.
//!
//! ## Screens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ShoppingListViewModel   shopping items   undo: UndoSlot<ShoppingItem>  │
//! │  UsualListViewModel      usual items      undo: UndoSlot<UsualItem>     │
//! │  CategoryViewModel       categories       undo: UndoSlot<Category>      │
//! │                                                                         │
//! │  open()          attach the projection to a live query                  │
//! │  update_sorting  persist the mode, re-attach with the new ordering      │
//! │  delete/undo/abort_undo   single-slot undo                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod categories;
pub mod items;
pub mod usual;

pub use categories::CategoryViewModel;
pub use items::ShoppingListViewModel;
pub use usual::{ToggleNotice, UsualListViewModel};

use crate::error::AppResult;

/// Hands exported list text to whatever sends it (SMS, share sheet, ...).
pub trait MessageComposer: Send + Sync {
    fn compose(&self, body: &str) -> AppResult<()>;
}
