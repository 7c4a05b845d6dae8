//! # shoplist-db: Database Layer for the Shopping List
//!
//! SQLite storage for categories, shopping items and usual items, using sqlx
//! for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shoplist Data Flow                               │
//! │                                                                         │
//! │  Command handler (ShoppingListViewModel::create_or_update)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    shoplist-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ CategoryRepo  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ ShoppingRepo  │    │ 001_initial  │  │   │
//! │  │   │ ChangeNotifier│    │ UsualRepo     │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │                                                     │   │
//! │  │           ▼                                                     │   │
//! │  │   LiveQuery<T> (notify.rs) ── re-runs on committed changes     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   <config dir>/shoplist.db                                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`notify`] - Change notification and live queries
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shoplist_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("shoplist.db")).await?;
//!
//! db.shopping_items().insert(&ShoppingItem::new("Milk", "Dairy", "2")).await?;
//! let mut live = db.shopping_items().watch(ItemOrdering::ByCategoryRank).await?;
//! while let Some(rows) = live.next().await { /* render */ }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod notify;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use notify::{ChangeNotifier, LiveQuery, TableSet};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::category::CategoryRepository;
pub use repository::shopping_item::ShoppingItemRepository;
pub use repository::usual_item::UsualItemRepository;
