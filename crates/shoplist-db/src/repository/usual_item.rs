//! # Usual Item Repository
//!
//! The catalog of items bought regularly, and the operations that move them
//! onto the shopping list.
//!
//! ## The `in_shopping_list` Cache
//! ```text
//! usual_items.in_shopping_list == EXISTS(shopping_items with same name+category)
//!
//! refreshed in bulk    : refresh_in_shopping_list_flags() (usual list opened)
//! refreshed per label  : every shopping item write, same transaction
//! set directly         : toggle, transfer, linked update
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::notify::{ChangeNotifier, LiveQuery, TableSet};
use crate::repository::category;
use crate::repository::shopping_item::{find_by_label, insert_row};
use shoplist_core::{ItemOrdering, ShoppingItem, UsualItem};

const COLUMNS: &str = "u.id, u.name, u.category, u.quantity, u.in_shopping_list";

const ON_LIST: &str = "EXISTS(SELECT 1 FROM shopping_items s \
     WHERE s.name = usual_items.name AND s.category = usual_items.category)";

fn list_sql(ordering: ItemOrdering) -> String {
    match ordering {
        ItemOrdering::ByCategoryRank => format!(
            "SELECT {COLUMNS} FROM usual_items u \
             JOIN categories c ON u.category = c.category_id \
             ORDER BY c.rank, u.name"
        ),
        ItemOrdering::ByCategoryName => {
            format!("SELECT {COLUMNS} FROM usual_items u ORDER BY u.category, u.name")
        }
        ItemOrdering::ByName => {
            format!("SELECT {COLUMNS} FROM usual_items u ORDER BY u.name, u.category")
        }
    }
}

fn label_conflict<'a>(
    name: &'a str,
    category: &'a str,
) -> impl FnOnce(sqlx::Error) -> DbError + 'a {
    move |e| match DbError::from(e) {
        DbError::UniqueViolation { .. } => {
            DbError::duplicate("usual item", format!("{} ({})", name, category))
        }
        other => other,
    }
}

// =============================================================================
// Flag maintenance (shared with the shopping item repository)
// =============================================================================

/// Recomputes the flag of the usual item with this label, if any.
pub(crate) async fn refresh_flag_for_label(
    conn: &mut SqliteConnection,
    name: &str,
    category: &str,
) -> DbResult<()> {
    sqlx::query(&format!(
        "UPDATE usual_items SET in_shopping_list = {ON_LIST} WHERE name = ?1 AND category = ?2"
    ))
    .bind(name)
    .bind(category)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Recomputes every flag. Returns how many flipped.
pub(crate) async fn refresh_all_flags(conn: &mut SqliteConnection) -> DbResult<u64> {
    let result = sqlx::query(&format!(
        "UPDATE usual_items SET in_shopping_list = {ON_LIST} WHERE in_shopping_list != {ON_LIST}"
    ))
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

async fn write_fields(
    conn: &mut SqliteConnection,
    id: &str,
    name: &str,
    category: &str,
    quantity: &str,
    in_shopping_list: bool,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE usual_items
        SET name = ?2, category = ?3, quantity = ?4, in_shopping_list = ?5
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(category)
    .bind(quantity)
    .bind(in_shopping_list)
    .execute(&mut *conn)
    .await
    .map_err(label_conflict(name, category))?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Usual item", id));
    }
    Ok(())
}

/// Repository for usual item database operations.
#[derive(Debug, Clone)]
pub struct UsualItemRepository {
    pool: SqlitePool,
    notifier: ChangeNotifier,
}

impl UsualItemRepository {
    /// Creates a new UsualItemRepository.
    pub fn new(pool: SqlitePool, notifier: ChangeNotifier) -> Self {
        UsualItemRepository { pool, notifier }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<UsualItem>> {
        let item = sqlx::query_as::<_, UsualItem>(&format!(
            "SELECT {COLUMNS} FROM usual_items u WHERE u.id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    pub async fn find(&self, name: &str, category: &str) -> DbResult<Option<UsualItem>> {
        let item = sqlx::query_as::<_, UsualItem>(&format!(
            "SELECT {COLUMNS} FROM usual_items u WHERE u.name = ?1 AND u.category = ?2"
        ))
        .bind(name)
        .bind(category)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    pub async fn find_exact(
        &self,
        name: &str,
        category: &str,
        quantity: &str,
    ) -> DbResult<Option<UsualItem>> {
        let item = sqlx::query_as::<_, UsualItem>(&format!(
            "SELECT {COLUMNS} FROM usual_items u \
             WHERE u.name = ?1 AND u.category = ?2 AND u.quantity = ?3"
        ))
        .bind(name)
        .bind(category)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    pub async fn list(&self, ordering: ItemOrdering) -> DbResult<Vec<UsualItem>> {
        let items = sqlx::query_as::<_, UsualItem>(&list_sql(ordering))
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM usual_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Live catalog. Shopping writes also publish `USUAL_ITEMS` when they
    /// flip a flag.
    pub async fn watch(&self, ordering: ItemOrdering) -> DbResult<LiveQuery<UsualItem>> {
        let repo = self.clone();
        LiveQuery::spawn(
            &self.notifier,
            TableSet::USUAL_ITEMS | TableSet::CATEGORIES,
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

    /// Inserts a usual item. Its flag is computed from the shopping list,
    /// whatever the given value; the stored row is returned.
    pub async fn insert(&self, item: &UsualItem) -> DbResult<UsualItem> {
        debug!(name = %item.name, category = %item.category, "Inserting usual item");

        let mut tx = self.pool.begin().await?;
        let created = category::ensure_exists(&mut tx, &item.category).await?;
        let stored = sqlx::query_as::<_, UsualItem>(
            r#"
            INSERT INTO usual_items (id, name, category, quantity, in_shopping_list)
            VALUES (?1, ?2, ?3, ?4,
                    EXISTS(SELECT 1 FROM shopping_items WHERE name = ?2 AND category = ?3))
            RETURNING id, name, category, quantity, in_shopping_list
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.category)
        .bind(&item.quantity)
        .fetch_one(&mut *tx)
        .await
        .map_err(label_conflict(&item.name, &item.category))?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        self.notify_write(TableSet::USUAL_ITEMS, created);
        Ok(stored)
    }

    /// Writes all fields as given, flag included.
    pub async fn update(&self, item: &UsualItem) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let created = category::ensure_exists(&mut tx, &item.category).await?;
        write_fields(
            &mut tx,
            &item.id,
            &item.name,
            &item.category,
            &item.quantity,
            item.in_shopping_list,
        )
        .await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        self.notify_write(TableSet::USUAL_ITEMS, created);
        Ok(())
    }

    /// Writes name, category and quantity, then recomputes the flag.
    pub async fn update_recomputing_flag(&self, item: &UsualItem) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let created = category::ensure_exists(&mut tx, &item.category).await?;
        write_fields(
            &mut tx,
            &item.id,
            &item.name,
            &item.category,
            &item.quantity,
            false,
        )
        .await?;
        refresh_flag_for_label(&mut tx, &item.name, &item.category).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        self.notify_write(TableSet::USUAL_ITEMS, created);
        Ok(())
    }

    pub async fn set_in_shopping_list(&self, id: &str, in_shopping_list: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE usual_items SET in_shopping_list = ?2 WHERE id = ?1")
            .bind(id)
            .bind(in_shopping_list)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Usual item", id));
        }

        self.notifier.notify(TableSet::USUAL_ITEMS);
        Ok(())
    }

    /// Brings every flag in line with the shopping list. Returns how many flipped.
    pub async fn refresh_in_shopping_list_flags(&self) -> DbResult<u64> {
        let mut conn = self.pool.acquire().await?;
        let flipped = refresh_all_flags(&mut conn).await?;
        drop(conn);

        debug!(flipped, "Usual item flags refreshed");
        if flipped > 0 {
            self.notifier.notify(TableSet::USUAL_ITEMS);
        }
        Ok(flipped)
    }

    pub async fn delete(&self, item: &UsualItem) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM usual_items WHERE id = ?1")
            .bind(&item.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Usual item", &item.id));
        }

        debug!(name = %item.name, "Usual item deleted");
        self.notifier.notify(TableSet::USUAL_ITEMS);
        Ok(())
    }

    /// Empties the catalog. Returns rows removed.
    pub async fn delete_all(&self) -> DbResult<u64> {
        let removed = sqlx::query("DELETE FROM usual_items")
            .execute(&self.pool)
            .await?
            .rows_affected();

        info!(removed, "Usual items cleared");
        if removed > 0 {
            self.notifier.notify(TableSet::USUAL_ITEMS);
        }
        Ok(removed)
    }

    // -------------------------------------------------------------------------
    // Cross-table operations
    // -------------------------------------------------------------------------

    /// Puts the item on the shopping list (unless its label already is) and
    /// flags it.
    pub async fn add_to_shopping_list(&self, item: &UsualItem) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        if find_by_label(&mut tx, &item.name, &item.category).await?.is_none() {
            insert_row(&mut tx, &item.to_shopping_item()).await?;
        }
        sqlx::query("UPDATE usual_items SET in_shopping_list = 1 WHERE id = ?1")
            .bind(&item.id)
            .execute(&mut *tx)
            .await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(name = %item.name, "Usual item added to shopping list");
        self.notify_write(TableSet::SHOPPING_ITEMS, false);
        Ok(())
    }

    /// Takes the item's label off the shopping list and clears the flag.
    pub async fn remove_from_shopping_list(&self, item: &UsualItem) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM shopping_items WHERE name = ?1 AND category = ?2")
            .bind(&item.name)
            .bind(&item.category)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE usual_items SET in_shopping_list = 0 WHERE id = ?1")
            .bind(&item.id)
            .execute(&mut *tx)
            .await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(name = %item.name, "Usual item removed from shopping list");
        self.notify_write(TableSet::SHOPPING_ITEMS, false);
        Ok(())
    }

    /// Copies every unflagged usual item onto the shopping list, then flags
    /// the whole catalog. Returns the number of shopping items created.
    pub async fn transfer_remaining(&self) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;

        let pending = sqlx::query_as::<_, UsualItem>(&format!(
            "SELECT {COLUMNS} FROM usual_items u \
             WHERE u.in_shopping_list = 0 AND NOT EXISTS( \
                 SELECT 1 FROM shopping_items s \
                 WHERE s.name = u.name AND s.category = u.category)"
        ))
        .fetch_all(&mut *tx)
        .await?;

        for usual in &pending {
            let item = ShoppingItem {
                id: Uuid::new_v4().to_string(),
                name: usual.name.clone(),
                category: usual.category.clone(),
                quantity: usual.quantity.clone(),
                in_cart: false,
            };
            insert_row(&mut tx, &item).await?;
        }

        sqlx::query("UPDATE usual_items SET in_shopping_list = 1 WHERE in_shopping_list = 0")
            .execute(&mut *tx)
            .await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let transferred = pending.len() as u64;
        info!(transferred, "Usual items transferred to shopping list");
        self.notify_write(TableSet::SHOPPING_ITEMS, false);
        Ok(transferred)
    }

    /// Updates the usual item and the shopping item carrying its old label,
    /// all or nothing.
    ///
    /// ## Errors
    /// - `NotFound` if the usual item is gone
    /// - `UniqueViolation` if either table already holds the new label;
    ///   nothing is written in that case
    pub async fn update_with_linked_item(
        &self,
        old: &UsualItem,
        name: &str,
        category: &str,
        quantity: &str,
    ) -> DbResult<()> {
        debug!(
            id = %old.id,
            from = %old.name,
            to = %name,
            "Updating usual item with linked shopping item"
        );

        let mut tx = self.pool.begin().await?;
        let created = category::ensure_exists(&mut tx, category).await?;
        write_fields(&mut tx, &old.id, name, category, quantity, true).await?;

        let linked = sqlx::query(
            r#"
            UPDATE shopping_items
            SET name = ?1, category = ?2, quantity = ?3
            WHERE name = ?4 AND category = ?5
            "#,
        )
        .bind(name)
        .bind(category)
        .bind(quantity)
        .bind(&old.name)
        .bind(&old.category)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("shopping item", format!("{} ({})", name, category))
            }
            other => other,
        })?
        .rows_affected();

        // The linked row may have been removed behind a stale flag
        if linked == 0 {
            refresh_flag_for_label(&mut tx, name, category).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        self.notify_write(TableSet::SHOPPING_ITEMS, created);
        Ok(())
    }

    fn notify_write(&self, tables: TableSet, category_created: bool) {
        let mut tables = tables | TableSet::USUAL_ITEMS;
        if category_created {
            tables = tables | TableSet::CATEGORIES;
        }
        self.notifier.notify(tables);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use shoplist_core::{ItemOrdering, ShoppingItem, UsualItem};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_computes_flag() {
        let db = setup().await;
        db.shopping_items()
            .insert(&ShoppingItem::new("Milk", "Dairy", "1"))
            .await
            .unwrap();

        let mut draft = UsualItem::new("Milk", "Dairy", "2");
        draft.in_shopping_list = false;
        let milk = db.usual_items().insert(&draft).await.unwrap();
        let eggs = db
            .usual_items()
            .insert(&UsualItem::new("Eggs", "Dairy", "12"))
            .await
            .unwrap();

        assert!(milk.in_shopping_list);
        assert!(!eggs.in_shopping_list);
    }

    #[tokio::test]
    async fn test_duplicate_label_rejected() {
        let db = setup().await;
        let repo = db.usual_items();
        repo.insert(&UsualItem::new("Milk", "Dairy", "1")).await.unwrap();

        let err = repo.insert(&UsualItem::new("Milk", "Dairy", "3")).await.unwrap_err();
        assert!(err.is_unique_violation());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_refresh_flags() {
        let db = setup().await;
        let milk = db
            .usual_items()
            .insert(&UsualItem::new("Milk", "Dairy", "1"))
            .await
            .unwrap();
        let eggs = db
            .usual_items()
            .insert(&UsualItem::new("Eggs", "Dairy", "12"))
            .await
            .unwrap();
        db.usual_items().set_in_shopping_list(&eggs.id, true).await.unwrap();
        db.shopping_items()
            .insert(&ShoppingItem::new("Milk", "Dairy", "1"))
            .await
            .unwrap();

        // Milk was fixed by the insert, Eggs is stale
        let flipped = db.usual_items().refresh_in_shopping_list_flags().await.unwrap();
        assert_eq!(flipped, 1);

        let milk = db.usual_items().get_by_id(&milk.id).await.unwrap().unwrap();
        let eggs = db.usual_items().get_by_id(&eggs.id).await.unwrap().unwrap();
        assert!(milk.in_shopping_list);
        assert!(!eggs.in_shopping_list);
    }

    #[tokio::test]
    async fn test_toggle_shopping_list() {
        let db = setup().await;
        let milk = db
            .usual_items()
            .insert(&UsualItem::new("Milk", "Dairy", "2"))
            .await
            .unwrap();

        db.usual_items().add_to_shopping_list(&milk).await.unwrap();
        let item = db.shopping_items().find("Milk", "Dairy").await.unwrap().unwrap();
        assert_eq!(item.quantity, "2");
        assert!(!item.in_cart);
        assert!(db.usual_items().get_by_id(&milk.id).await.unwrap().unwrap().in_shopping_list);

        // Adding twice keeps a single row
        db.usual_items().add_to_shopping_list(&milk).await.unwrap();
        assert_eq!(db.shopping_items().count().await.unwrap(), 1);

        db.usual_items().remove_from_shopping_list(&milk).await.unwrap();
        assert_eq!(db.shopping_items().count().await.unwrap(), 0);
        assert!(!db.usual_items().get_by_id(&milk.id).await.unwrap().unwrap().in_shopping_list);
    }

    #[tokio::test]
    async fn test_transfer_remaining() {
        let db = setup().await;
        let usual = db.usual_items();
        usual.insert(&UsualItem::new("Milk", "Dairy", "1")).await.unwrap();
        usual.insert(&UsualItem::new("Bread", "Bakery", "1")).await.unwrap();
        let eggs = usual.insert(&UsualItem::new("Eggs", "Dairy", "12")).await.unwrap();
        usual.add_to_shopping_list(&eggs).await.unwrap();

        let transferred = usual.transfer_remaining().await.unwrap();
        assert_eq!(transferred, 2);
        assert_eq!(db.shopping_items().count().await.unwrap(), 3);

        let all = usual.list(ItemOrdering::ByName).await.unwrap();
        assert!(all.iter().all(|u| u.in_shopping_list));

        // Nothing left to transfer
        assert_eq!(usual.transfer_remaining().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transfer_remaining_is_all_or_nothing() {
        let db = setup().await;
        let usual = db.usual_items();
        usual.insert(&UsualItem::new("Milk", "Dairy", "1")).await.unwrap();
        usual.insert(&UsualItem::new("Bread", "Bakery", "1")).await.unwrap();

        // A row whose category does not exist makes its shopping insert fail
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO usual_items (id, name, category, quantity, in_shopping_list) \
             VALUES ('ghost', 'Ghost', 'Nowhere', '1', 0)",
        )
        .execute(db.pool())
        .await
        .unwrap();
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(db.pool())
            .await
            .unwrap();

        let err = usual.transfer_remaining().await.unwrap_err();
        assert!(err.is_foreign_key_violation());

        assert_eq!(db.shopping_items().count().await.unwrap(), 0);
        let all = usual.list(ItemOrdering::ByName).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|u| !u.in_shopping_list));
    }

    #[tokio::test]
    async fn test_update_with_linked_item() {
        let db = setup().await;
        let milk = db
            .usual_items()
            .insert(&UsualItem::new("Milk", "Dairy", "1"))
            .await
            .unwrap();
        db.usual_items().add_to_shopping_list(&milk).await.unwrap();

        db.usual_items()
            .update_with_linked_item(&milk, "Milk", "Dairy", "3")
            .await
            .unwrap();

        let usual = db.usual_items().get_by_id(&milk.id).await.unwrap().unwrap();
        let item = db.shopping_items().find("Milk", "Dairy").await.unwrap().unwrap();
        assert_eq!(usual.quantity, "3");
        assert_eq!(item.quantity, "3");
        assert!(usual.in_shopping_list);
    }

    #[tokio::test]
    async fn test_linked_update_rolls_back_both() {
        let db = setup().await;
        let milk = db
            .usual_items()
            .insert(&UsualItem::new("Milk", "Dairy", "1"))
            .await
            .unwrap();
        db.usual_items().add_to_shopping_list(&milk).await.unwrap();
        // The shopping list already holds the target label
        db.shopping_items()
            .insert(&ShoppingItem::new("Milk", "Fridge", "2"))
            .await
            .unwrap();

        let err = db
            .usual_items()
            .update_with_linked_item(&milk, "Milk", "Fridge", "3")
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());

        // The usual item was written first, yet nothing survived
        let usual = db.usual_items().get_by_id(&milk.id).await.unwrap().unwrap();
        assert_eq!(usual.category, "Dairy");
        assert_eq!(usual.quantity, "1");
        let linked = db.shopping_items().find("Milk", "Dairy").await.unwrap().unwrap();
        assert_eq!(linked.quantity, "1");
    }

    #[tokio::test]
    async fn test_update_recomputing_flag() {
        let db = setup().await;
        let milk = db
            .usual_items()
            .insert(&UsualItem::new("Milk", "Dairy", "1"))
            .await
            .unwrap();
        db.usual_items().add_to_shopping_list(&milk).await.unwrap();

        let mut renamed = milk.clone();
        renamed.name = "Oat milk".to_string();
        db.usual_items().update_recomputing_flag(&renamed).await.unwrap();

        let stored = db.usual_items().get_by_id(&milk.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Oat milk");
        assert!(!stored.in_shopping_list);
        // the shopping item keeps its old label
        assert!(db.shopping_items().find("Milk", "Dairy").await.unwrap().is_some());
    }
}
