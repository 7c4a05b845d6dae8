//! # Shopping Item Repository
//!
//! Database operations for the live shopping list.
//!
//! ## Side Effects of Every Write
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert / update / delete (one transaction)                             │
//! │       │                                                                 │
//! │       ├── category missing? create it at the end of the custom order   │
//! │       ├── write the shopping item                                       │
//! │       └── refresh usual_items.in_shopping_list for the touched labels  │
//! │       │                                                                 │
//! │       ▼ commit                                                          │
//! │  notify(SHOPPING_ITEMS | USUAL_ITEMS [| CATEGORIES])                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::notify::{ChangeNotifier, LiveQuery, TableSet};
use crate::repository::category;
use crate::repository::usual_item::{refresh_all_flags, refresh_flag_for_label};
use shoplist_core::{ItemOrdering, ShoppingItem};

const COLUMNS: &str = "s.id, s.name, s.category, s.quantity, s.in_cart";

/// Builds the list query for an ordering.
fn list_sql(ordering: ItemOrdering, uncarted_only: bool) -> String {
    let filter = if uncarted_only { "WHERE s.in_cart = 0" } else { "" };
    match ordering {
        ItemOrdering::ByCategoryRank => format!(
            "SELECT {COLUMNS} FROM shopping_items s \
             JOIN categories c ON s.category = c.category_id \
             {filter} ORDER BY c.rank, s.name"
        ),
        ItemOrdering::ByCategoryName => {
            format!("SELECT {COLUMNS} FROM shopping_items s {filter} ORDER BY s.category, s.name")
        }
        ItemOrdering::ByName => {
            format!("SELECT {COLUMNS} FROM shopping_items s {filter} ORDER BY s.name, s.category")
        }
    }
}

/// Maps a UNIQUE failure on the label index to the label that collided.
fn label_conflict<'a>(
    name: &'a str,
    category: &'a str,
) -> impl FnOnce(sqlx::Error) -> DbError + 'a {
    move |e| match DbError::from(e) {
        DbError::UniqueViolation { .. } => {
            DbError::duplicate("shopping item", format!("{} ({})", name, category))
        }
        other => other,
    }
}

pub(crate) async fn find_by_label(
    conn: &mut SqliteConnection,
    name: &str,
    category: &str,
) -> DbResult<Option<ShoppingItem>> {
    let item = sqlx::query_as::<_, ShoppingItem>(&format!(
        "SELECT {COLUMNS} FROM shopping_items s WHERE s.name = ?1 AND s.category = ?2"
    ))
    .bind(name)
    .bind(category)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(item)
}

/// Inserts a row as given. The category must exist.
pub(crate) async fn insert_row(conn: &mut SqliteConnection, item: &ShoppingItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO shopping_items (id, name, category, quantity, in_cart)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&item.id)
    .bind(&item.name)
    .bind(&item.category)
    .bind(&item.quantity)
    .bind(item.in_cart)
    .execute(&mut *conn)
    .await
    .map_err(label_conflict(&item.name, &item.category))?;
    Ok(())
}

/// Repository for shopping item database operations.
#[derive(Debug, Clone)]
pub struct ShoppingItemRepository {
    pool: SqlitePool,
    notifier: ChangeNotifier,
}

impl ShoppingItemRepository {
    /// Creates a new ShoppingItemRepository.
    pub fn new(pool: SqlitePool, notifier: ChangeNotifier) -> Self {
        ShoppingItemRepository { pool, notifier }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ShoppingItem>> {
        let item = sqlx::query_as::<_, ShoppingItem>(&format!(
            "SELECT {COLUMNS} FROM shopping_items s WHERE s.id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    /// Gets the item with this (name, category).
    pub async fn find(&self, name: &str, category: &str) -> DbResult<Option<ShoppingItem>> {
        let mut conn = self.pool.acquire().await?;
        find_by_label(&mut conn, name, category).await
    }

    /// Gets the item matching all three fields exactly.
    pub async fn find_exact(
        &self,
        name: &str,
        category: &str,
        quantity: &str,
    ) -> DbResult<Option<ShoppingItem>> {
        let item = sqlx::query_as::<_, ShoppingItem>(&format!(
            "SELECT {COLUMNS} FROM shopping_items s \
             WHERE s.name = ?1 AND s.category = ?2 AND s.quantity = ?3"
        ))
        .bind(name)
        .bind(category)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    /// Any one item in `category`, if there is one.
    pub async fn find_by_category(&self, category: &str) -> DbResult<Option<ShoppingItem>> {
        let item = sqlx::query_as::<_, ShoppingItem>(&format!(
            "SELECT {COLUMNS} FROM shopping_items s WHERE s.category = ?1 LIMIT 1"
        ))
        .bind(category)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    pub async fn list(&self, ordering: ItemOrdering) -> DbResult<Vec<ShoppingItem>> {
        let items = sqlx::query_as::<_, ShoppingItem>(&list_sql(ordering, false))
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// Non-live snapshot of the items not yet in the cart, for export.
    pub async fn uncarted(&self, ordering: ItemOrdering) -> DbResult<Vec<ShoppingItem>> {
        let items = sqlx::query_as::<_, ShoppingItem>(&list_sql(ordering, true))
            .fetch_all(&self.pool)
            .await?;
        debug!(count = items.len(), "Uncarted items fetched");
        Ok(items)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shopping_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Live list. Category changes matter too: rank order and renames.
    pub async fn watch(&self, ordering: ItemOrdering) -> DbResult<LiveQuery<ShoppingItem>> {
        let repo = self.clone();
        LiveQuery::spawn(
            &self.notifier,
            TableSet::SHOPPING_ITEMS | TableSet::CATEGORIES,
            move || {
                let repo = repo.clone();
                async move { repo.list(ordering).await }
            },
        )
        .await
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Inserts an item, creating its category if unseen.
    ///
    /// ## Errors
    /// `UniqueViolation` if (name, category) is already on the list.
    pub async fn insert(&self, item: &ShoppingItem) -> DbResult<()> {
        debug!(name = %item.name, category = %item.category, "Inserting shopping item");

        let mut tx = self.pool.begin().await?;
        let created = category::ensure_exists(&mut tx, &item.category).await?;
        insert_row(&mut tx, item).await?;
        refresh_flag_for_label(&mut tx, &item.name, &item.category).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        self.notify_write(created);
        Ok(())
    }

    /// Updates name, category, quantity and cart state by id.
    pub async fn update(&self, item: &ShoppingItem) -> DbResult<()> {
        debug!(id = %item.id, name = %item.name, "Updating shopping item");

        let mut tx = self.pool.begin().await?;

        let old: Option<(String, String)> =
            sqlx::query_as("SELECT name, category FROM shopping_items WHERE id = ?1")
                .bind(&item.id)
                .fetch_optional(&mut *tx)
                .await?;
        let (old_name, old_category) =
            old.ok_or_else(|| DbError::not_found("Shopping item", &item.id))?;

        let created = category::ensure_exists(&mut tx, &item.category).await?;
        sqlx::query(
            r#"
            UPDATE shopping_items
            SET name = ?2, category = ?3, quantity = ?4, in_cart = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.category)
        .bind(&item.quantity)
        .bind(item.in_cart)
        .execute(&mut *tx)
        .await
        .map_err(label_conflict(&item.name, &item.category))?;

        refresh_flag_for_label(&mut tx, &old_name, &old_category).await?;
        refresh_flag_for_label(&mut tx, &item.name, &item.category).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        self.notify_write(created);
        Ok(())
    }

    /// Checks or unchecks an item.
    pub async fn set_in_cart(&self, id: &str, in_cart: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE shopping_items SET in_cart = ?2 WHERE id = ?1")
            .bind(id)
            .bind(in_cart)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Shopping item", id));
        }

        self.notifier.notify(TableSet::SHOPPING_ITEMS);
        Ok(())
    }

    /// Deletes an item by id.
    pub async fn delete(&self, item: &ShoppingItem) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM shopping_items WHERE id = ?1")
            .bind(&item.id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Shopping item", &item.id));
        }

        refresh_flag_for_label(&mut tx, &item.name, &item.category).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(name = %item.name, "Shopping item deleted");
        self.notify_write(false);
        Ok(())
    }

    /// Deletes the item with this (name, category). Returns rows removed.
    pub async fn delete_by_label(&self, name: &str, category: &str) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query("DELETE FROM shopping_items WHERE name = ?1 AND category = ?2")
            .bind(name)
            .bind(category)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        refresh_flag_for_label(&mut tx, name, category).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        if removed > 0 {
            self.notify_write(false);
        }
        Ok(removed)
    }

    /// Clears every checked item. Returns rows removed.
    pub async fn delete_in_cart(&self) -> DbResult<u64> {
        self.bulk_delete("DELETE FROM shopping_items WHERE in_cart = 1").await
    }

    /// Empties the shopping list. Returns rows removed.
    pub async fn delete_all(&self) -> DbResult<u64> {
        self.bulk_delete("DELETE FROM shopping_items").await
    }

    async fn bulk_delete(&self, sql: &str) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query(sql).execute(&mut *tx).await?.rows_affected();
        refresh_all_flags(&mut tx).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(removed, "Shopping items cleared");
        if removed > 0 {
            self.notify_write(false);
        }
        Ok(removed)
    }

    fn notify_write(&self, category_created: bool) {
        let mut tables = TableSet::SHOPPING_ITEMS | TableSet::USUAL_ITEMS;
        if category_created {
            tables = tables | TableSet::CATEGORIES;
        }
        self.notifier.notify(tables);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
