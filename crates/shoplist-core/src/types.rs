//! # Domain Types
//!
//! Entities and sort modes used throughout the shopping list.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌──────────────────┐     │
//! │  │    Category     │   │   ShoppingItem   │   │    UsualItem     │     │
//! │  │  ─────────────  │   │  ──────────────  │   │  ──────────────  │     │
//! │  │  id (UUID)      │◄──│  category (FK)   │   │  category (FK)   │──►  │
//! │  │  category_id    │   │  name            │   │  name            │     │
//! │  │  rank (1..N)    │   │  quantity        │   │  quantity        │     │
//! │  └─────────────────┘   │  in_cart         │   │  in_shopping_list│     │
//! │                        └──────────────────┘   └──────────────────┘     │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌──────────────────┐     │
//! │  │    ItemSort     │   │   CategorySort   │   │    ListEntry     │     │
//! │  │  ByCategory     │   │  Custom          │   │  Category | Item │     │
//! │  │  ByName         │   │  Alphabetical    │   │  | UsualItem     │     │
//! │  └─────────────────┘   └──────────────────┘   └──────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4, immutable, used for keyed updates and deletes
//! - Business key: `category_id` for categories, `(name, category)` for items
//!
//! Items reference their category by *name*, so renaming a category cascades
//! to both item tables.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

// =============================================================================
// Category
// =============================================================================

/// A user-defined category with a position in the custom order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, unique across categories.
    pub category_id: String,

    /// Position in the custom order, `1..=N`.
    pub rank: i32,
}

impl Category {
    /// Creates a category with a fresh id.
    pub fn new(category_id: impl Into<String>, rank: i32) -> Self {
        Category {
            id: Uuid::new_v4().to_string(),
            category_id: category_id.into(),
            rank,
        }
    }
}

// =============================================================================
// Shopping Item
// =============================================================================

/// An entry on the live shopping list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ShoppingItem {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Item name, trimmed.
    pub name: String,

    /// Category name (foreign key to `categories.category_id`).
    pub category: String,

    /// Free text starting with a number, optionally followed by a unit.
    pub quantity: String,

    /// Checked off while shopping.
    pub in_cart: bool,
}

impl ShoppingItem {
    /// Creates an unchecked item with a fresh id.
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        quantity: impl Into<String>,
    ) -> Self {
        ShoppingItem {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            category: category.into(),
            quantity: quantity.into(),
            in_cart: false,
        }
    }

    /// Copy of this item under a fresh id (undo re-insert).
    pub fn with_fresh_id(&self) -> Self {
        ShoppingItem {
            id: Uuid::new_v4().to_string(),
            ..self.clone()
        }
    }
}

// =============================================================================
// Usual Item
// =============================================================================

/// A reusable catalog entry that can be pushed onto the shopping list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct UsualItem {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub name: String,

    /// Category name (foreign key to `categories.category_id`).
    pub category: String,

    pub quantity: String,

    /// Cached: a shopping item with the same (name, category) exists.
    pub in_shopping_list: bool,
}

impl UsualItem {
    /// Creates a catalog entry with a fresh id and the flag cleared.
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        quantity: impl Into<String>,
    ) -> Self {
        UsualItem {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            category: category.into(),
            quantity: quantity.into(),
            in_shopping_list: false,
        }
    }

    /// Copy of this item under a fresh id (undo re-insert).
    pub fn with_fresh_id(&self) -> Self {
        UsualItem {
            id: Uuid::new_v4().to_string(),
            ..self.clone()
        }
    }

    /// The shopping list entry this catalog item turns into.
    pub fn to_shopping_item(&self) -> ShoppingItem {
        ShoppingItem::new(&self.name, &self.category, &self.quantity)
    }
}

// =============================================================================
// List Rows
// =============================================================================

/// Shared view of anything displayed as a row in one of the lists.
///
/// `group` is the header a row sits under when the list is grouped by
/// category. Categories are their own group, so they never share a header.
pub trait ListRow {
    fn key(&self) -> &str;
    fn group(&self) -> &str;
}

impl ListRow for Category {
    fn key(&self) -> &str {
        &self.id
    }

    fn group(&self) -> &str {
        &self.category_id
    }
}

impl ListRow for ShoppingItem {
    fn key(&self) -> &str {
        &self.id
    }

    fn group(&self) -> &str {
        &self.category
    }
}

impl ListRow for UsualItem {
    fn key(&self) -> &str {
        &self.id
    }

    fn group(&self) -> &str {
        &self.category
    }
}

/// A row picked for deletion, whichever list it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "entry", rename_all = "snake_case")]
#[ts(export)]
pub enum ListEntry {
    Category(Category),
    ShoppingItem(ShoppingItem),
    UsualItem(UsualItem),
}

// =============================================================================
// Sort Modes
// =============================================================================

/// How item lists are ordered.
///
/// Persisted as an integer preference (`0` by category, `1` by name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ItemSort {
    #[default]
    ByCategory,
    ByName,
}

impl ItemSort {
    pub fn as_index(&self) -> i64 {
        match self {
            ItemSort::ByCategory => 0,
            ItemSort::ByName => 1,
        }
    }

    /// Unknown values fall back to the default.
    pub fn from_index(index: i64) -> Self {
        match index {
            1 => ItemSort::ByName,
            _ => ItemSort::ByCategory,
        }
    }
}

/// How categories are ordered, both in their own list and as item groups.
///
/// Persisted as an integer preference (`0` custom, `1` alphabetical).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum CategorySort {
    #[default]
    Custom,
    Alphabetical,
}

impl CategorySort {
    pub fn as_index(&self) -> i64 {
        match self {
            CategorySort::Custom => 0,
            CategorySort::Alphabetical => 1,
        }
    }

    pub fn from_index(index: i64) -> Self {
        match index {
            1 => CategorySort::Alphabetical,
            _ => CategorySort::Custom,
        }
    }

    /// Drag-to-reorder only makes sense when the custom rank is shown.
    pub fn can_reorder(&self) -> bool {
        matches!(self, CategorySort::Custom)
    }
}

/// Row order for item queries, derived from both sort axes.
///
/// ```text
/// ItemSort::ByCategory + CategorySort::Custom       → ByCategoryRank
/// ItemSort::ByCategory + CategorySort::Alphabetical → ByCategoryName
/// ItemSort::ByName     + (any)                      → ByName
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemOrdering {
    /// Category rank, then item name.
    ByCategoryRank,
    /// Category name, then item name.
    ByCategoryName,
    /// Item name, then category name.
    ByName,
}

impl ItemOrdering {
    pub fn select(item_sort: ItemSort, category_sort: CategorySort) -> Self {
        match (item_sort, category_sort) {
            (ItemSort::ByName, _) => ItemOrdering::ByName,
            (ItemSort::ByCategory, CategorySort::Custom) => ItemOrdering::ByCategoryRank,
            (ItemSort::ByCategory, CategorySort::Alphabetical) => ItemOrdering::ByCategoryName,
        }
    }

    /// Whether rows of the same category end up adjacent.
    pub fn is_grouped(&self) -> bool {
        !matches!(self, ItemOrdering::ByName)
    }
}

/// Row order for the category list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryOrdering {
    ByRank,
    ByName,
}

impl From<CategorySort> for CategoryOrdering {
    fn from(sort: CategorySort) -> Self {
        match sort {
            CategorySort::Custom => CategoryOrdering::ByRank,
            CategorySort::Alphabetical => CategoryOrdering::ByName,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_selection() {
        assert_eq!(
            ItemOrdering::select(ItemSort::ByCategory, CategorySort::Custom),
            ItemOrdering::ByCategoryRank
        );
        assert_eq!(
            ItemOrdering::select(ItemSort::ByCategory, CategorySort::Alphabetical),
            ItemOrdering::ByCategoryName
        );
        assert_eq!(
            ItemOrdering::select(ItemSort::ByName, CategorySort::Custom),
            ItemOrdering::ByName
        );
        assert!(!ItemOrdering::ByName.is_grouped());
    }

    #[test]
    fn test_sort_index_fallback() {
        assert_eq!(ItemSort::from_index(1), ItemSort::ByName);
        assert_eq!(ItemSort::from_index(42), ItemSort::ByCategory);
        assert_eq!(CategorySort::from_index(CategorySort::Alphabetical.as_index()), CategorySort::Alphabetical);
        assert!(CategorySort::Custom.can_reorder());
        assert!(!CategorySort::Alphabetical.can_reorder());
    }

    #[test]
    fn test_fresh_id_keeps_fields() {
        let mut item = ShoppingItem::new("Milk", "Dairy", "2");
        item.in_cart = true;
        let copy = item.with_fresh_id();

        assert_ne!(copy.id, item.id);
        assert_eq!(copy.name, "Milk");
        assert!(copy.in_cart);
    }

    #[test]
    fn test_list_entry_serialization() {
        let entry = ListEntry::Category(Category::new("Dairy", 1));
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["kind"], "category");
        assert_eq!(json["entry"]["category_id"], "Dairy");
    }
}
