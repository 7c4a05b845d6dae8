//! # shoplist-core: Pure Logic for the Shopping List
//!
//! Entities and the rules that keep them consistent, as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shoplist Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    UI host (any toolkit)                        │   │
//! │  │     Shopping list ──► Usual items ──► Categories ──► Export     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 shoplist-app (view models)                      │   │
//! │  │     create_or_update, delete + undo, move_category, export     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ shoplist-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌──────────┐ ┌──────┐ ┌───────────┐ ┌────────┐   │   │
//! │  │   │  types  │ │validation│ │ rank │ │ reconcile │ │ export │   │   │
//! │  │   └─────────┘ └──────────┘ └──────┘ └───────────┘ └────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • PURE FUNCTIONS                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 shoplist-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities, sort modes and orderings
//! - [`error`] - Domain error types
//! - [`validation`] - Name/category checks, quantity parsing
//! - [`rank`] - Category rank move planning
//! - [`reconcile`] - Create/update decisions for both item tables
//! - [`export`] - Plain-text list shaping
//! - [`grouping`] - Row refresh hints for category-grouped lists
//!
//! ## Example Usage
//!
//! ```rust
//! use shoplist_core::rank::RankMove;
//!
//! let mut ranks = vec![1, 2, 3, 4, 5];
//! RankMove::plan(2, 5).unwrap().apply_to(&mut ranks);
//! assert_eq!(ranks, vec![1, 5, 2, 3, 4]);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod export;
pub mod grouping;
pub mod rank;
pub mod reconcile;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use export::shape_export;
pub use grouping::{GroupedChangeNotifier, RowRefresh};
pub use reconcile::{EditOutcome, UsualUpdatePlan};
pub use types::*;
pub use validation::{ItemInput, Quantity};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Category assigned to a blank item draft.
///
/// The application config can override it; this is the fallback.
pub const DEFAULT_CATEGORY: &str = "Misc.";

/// First line of an exported list.
pub const EXPORT_HEADER: &str = "Shopping List:";

/// Quantity given to a blank item draft.
pub const DEFAULT_QUANTITY: &str = "1";

/// Rank parked on a category while the others shift around it.
///
/// Never visible outside the move transaction.
pub const RANK_SENTINEL: i32 = -1;

/// Maximum length of an item or category name.
pub const MAX_NAME_LENGTH: usize = 200;
