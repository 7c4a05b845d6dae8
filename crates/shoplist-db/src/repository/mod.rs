//! # Repository Module
//!
//! One repository per table. All three share the pool and the change
//! notifier handed out by [`Database`](crate::Database).
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  command handler (shoplist-app)                                        │
//! │       │                                                                 │
//! │       │  db.categories().move_category(&dairy, &bakery)                │
//! │       ▼                                                                 │
//! │  CategoryRepository ──┐                                                 │
//! │  ShoppingItemRepository ├── SQL, one transaction per compound write    │
//! │  UsualItemRepository ──┘        │                                       │
//! │                                 ▼ commit                                │
//! │                      ChangeNotifier::notify(TableSet)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Connection-level helpers (`pub(crate)` functions taking a
//! `&mut SqliteConnection`) let one repository's transaction touch another
//! table, e.g. a shopping item insert creating its category.
//!
//! ## Available Repositories
//!
//! - [`CategoryRepository`](category::CategoryRepository) - Categories and the rank protocol
//! - [`ShoppingItemRepository`](shopping_item::ShoppingItemRepository) - The shopping list
//! - [`UsualItemRepository`](usual_item::UsualItemRepository) - The usual items catalog

pub mod category;
pub mod shopping_item;
pub mod usual_item;
