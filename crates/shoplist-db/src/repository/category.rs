//! # Category Repository
//!
//! Database operations for categories and their custom ranks.
//!
//! ## Key Operations
//! - Create by name (appended at `max(rank) + 1`)
//! - Rename (cascades to both item tables)
//! - Delete (refused while any item references the category)
//! - Move one category to another rank in a single transaction
//! - Re-insert a deleted category near its old rank (undo)
//!
//! ## Rank Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  After every committed move, rename, restore, compaction or bulk        │
//! │  delete, ranks are exactly 1..N.                                        │
//! │                                                                         │
//! │  A single delete leaves a gap on purpose: the undo slot may put the     │
//! │  category back. The gap closes on abort, restore or the next compact.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::notify::{ChangeNotifier, LiveQuery, TableSet};
use shoplist_core::rank::{self, RankMove};
use shoplist_core::{Category, CategoryOrdering, RANK_SENTINEL};

const SELECT_CATEGORY: &str = "SELECT id, category_id, rank FROM categories";

fn order_clause(ordering: CategoryOrdering) -> &'static str {
    match ordering {
        CategoryOrdering::ByRank => "ORDER BY rank, category_id",
        CategoryOrdering::ByName => "ORDER BY category_id",
    }
}

// =============================================================================
// Connection-level helpers (shared with the item repositories)
// =============================================================================

pub(crate) async fn find_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> DbResult<Option<Category>> {
    let category = sqlx::query_as::<_, Category>(&format!("{SELECT_CATEGORY} WHERE category_id = ?1"))
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(category)
}

async fn find_by_rank(conn: &mut SqliteConnection, rank: i32) -> DbResult<Option<Category>> {
    let category = sqlx::query_as::<_, Category>(&format!("{SELECT_CATEGORY} WHERE rank = ?1 LIMIT 1"))
        .bind(rank)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(category)
}

/// Inserts `name` at the end of the custom order.
pub(crate) async fn insert_by_name(conn: &mut SqliteConnection, name: &str) -> DbResult<Category> {
    let id = Uuid::new_v4().to_string();

    let category = sqlx::query_as::<_, Category>(
        r#"
        INSERT INTO categories (id, category_id, rank)
        VALUES (?1, ?2, (SELECT coalesce(MAX(rank), 0) + 1 FROM categories))
        RETURNING id, category_id, rank
        "#,
    )
    .bind(&id)
    .bind(name)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } => DbError::duplicate(field, name),
        other => other,
    })?;

    debug!(category = %name, rank = category.rank, "Category created");
    Ok(category)
}

/// Creates the category if it does not exist yet. Returns true when created.
pub(crate) async fn ensure_exists(conn: &mut SqliteConnection, name: &str) -> DbResult<bool> {
    if find_by_name(conn, name).await?.is_some() {
        return Ok(false);
    }
    insert_by_name(conn, name).await?;
    Ok(true)
}

/// Renumbers ranks to `1..N`, keeping the order. Returns rows changed.
pub(crate) async fn compact(conn: &mut SqliteConnection) -> DbResult<u64> {
    let ranks: Vec<(String, i32)> =
        sqlx::query_as("SELECT id, rank FROM categories ORDER BY rank, category_id")
            .fetch_all(&mut *conn)
            .await?;

    let mut changed = 0;
    for (index, (id, current)) in ranks.iter().enumerate() {
        let wanted = index as i32 + 1;
        if *current != wanted {
            sqlx::query("UPDATE categories SET rank = ?1 WHERE id = ?2")
                .bind(wanted)
                .bind(id)
                .execute(&mut *conn)
                .await?;
            changed += 1;
        }
    }
    Ok(changed)
}

/// Renumbers ranks to `1..N` but leaves one hole where a row deleted from
/// `deleted_rank` would sit now. Returns the rank of that hole.
pub(crate) async fn compact_leaving_gap(
    conn: &mut SqliteConnection,
    deleted_rank: i32,
) -> DbResult<i32> {
    let ranks: Vec<(String, i32)> =
        sqlx::query_as("SELECT id, rank FROM categories ORDER BY rank, category_id")
            .fetch_all(&mut *conn)
            .await?;

    let gap = ranks.iter().filter(|(_, rank)| *rank < deleted_rank).count() as i32 + 1;
    for (index, (id, current)) in ranks.iter().enumerate() {
        let mut wanted = index as i32 + 1;
        if wanted >= gap {
            wanted += 1;
        }
        if *current != wanted {
            sqlx::query("UPDATE categories SET rank = ?1 WHERE id = ?2")
                .bind(wanted)
                .bind(id)
                .execute(&mut *conn)
                .await?;
        }
    }
    Ok(gap)
}

/// Park, shift, land. Runs inside the caller's transaction.
async fn apply_move(conn: &mut SqliteConnection, mover_id: &str, plan: RankMove) -> DbResult<()> {
    sqlx::query("UPDATE categories SET rank = ?1 WHERE id = ?2")
        .bind(RANK_SENTINEL)
        .bind(mover_id)
        .execute(&mut *conn)
        .await?;

    let shift = plan.shift();
    sqlx::query("UPDATE categories SET rank = rank + ?1 WHERE rank >= ?2 AND rank <= ?3")
        .bind(shift.delta)
        .bind(shift.lower)
        .bind(shift.upper)
        .execute(&mut *conn)
        .await?;

    sqlx::query("UPDATE categories SET rank = ?1 WHERE id = ?2")
        .bind(plan.to)
        .bind(mover_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for category database operations.
///
/// ```rust,ignore
/// let repo = db.categories();
/// let dairy = repo.insert_by_name("Dairy").await?;
/// repo.move_category(&dairy, &bakery).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
    notifier: ChangeNotifier,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool, notifier: ChangeNotifier) -> Self {
        CategoryRepository { pool, notifier }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!("{SELECT_CATEGORY} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    /// Gets a category by its display name.
    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Category>> {
        let mut conn = self.pool.acquire().await?;
        find_by_name(&mut conn, name).await
    }

    /// Gets the category holding `rank`, if any.
    pub async fn get_by_rank(&self, rank: i32) -> DbResult<Option<Category>> {
        let mut conn = self.pool.acquire().await?;
        find_by_rank(&mut conn, rank).await
    }

    /// Non-live snapshot, e.g. for a category picker.
    pub async fn list(&self, ordering: CategoryOrdering) -> DbResult<Vec<Category>> {
        let sql = format!("{SELECT_CATEGORY} {}", order_clause(ordering));
        let categories = sqlx::query_as::<_, Category>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    pub async fn list_by_rank(&self) -> DbResult<Vec<Category>> {
        self.list(CategoryOrdering::ByRank).await
    }

    pub async fn list_by_name(&self) -> DbResult<Vec<Category>> {
        self.list(CategoryOrdering::ByName).await
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Live list, refreshed after every category write.
    pub async fn watch(&self, ordering: CategoryOrdering) -> DbResult<LiveQuery<Category>> {
        let repo = self.clone();
        LiveQuery::spawn(&self.notifier, TableSet::CATEGORIES, move || {
            let repo = repo.clone();
            async move { repo.list(ordering).await }
        })
        .await
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Creates a category at the end of the custom order.
    ///
    /// ## Errors
    /// `UniqueViolation` if the name is taken.
    pub async fn insert_by_name(&self, name: &str) -> DbResult<Category> {
        let mut conn = self.pool.acquire().await?;
        let category = insert_by_name(&mut conn, name).await?;
        drop(conn);

        self.notifier.notify(TableSet::CATEGORIES);
        Ok(category)
    }

    /// Inserts the exact entity, rank included. Used when restoring.
    pub async fn insert_exact(&self, category: &Category) -> DbResult<()> {
        debug!(category = %category.category_id, rank = category.rank, "Inserting category");

        sqlx::query("INSERT INTO categories (id, category_id, rank) VALUES (?1, ?2, ?3)")
            .bind(&category.id)
            .bind(&category.category_id)
            .bind(category.rank)
            .execute(&self.pool)
            .await?;

        self.notifier.notify(TableSet::CATEGORIES);
        Ok(())
    }

    /// Returns the category named `name`, creating it if needed.
    pub async fn ensure_exists(&self, name: &str) -> DbResult<Category> {
        let mut tx = self.pool.begin().await?;
        let category = match find_by_name(&mut tx, name).await? {
            Some(existing) => existing,
            None => insert_by_name(&mut tx, name).await?,
        };
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        self.notifier.notify(TableSet::CATEGORIES);
        Ok(category)
    }

    /// Renames a category. Items follow through `ON UPDATE CASCADE`.
    ///
    /// ## Errors
    /// - `NotFound` if `old` does not exist
    /// - `UniqueViolation` if `new` is taken
    pub async fn rename(&self, old: &str, new: &str) -> DbResult<()> {
        debug!(old = %old, new = %new, "Renaming category");

        let result = sqlx::query("UPDATE categories SET category_id = ?2 WHERE category_id = ?1")
            .bind(old)
            .bind(new)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => DbError::duplicate(field, new),
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", old));
        }

        self.notifier.notify(TableSet::ALL);
        Ok(())
    }

    /// Deletes a category. Leaves its rank free until compaction.
    ///
    /// ## Errors
    /// - `ForeignKeyViolation` while an item references it
    /// - `NotFound` if it was already gone
    pub async fn delete(&self, category: &Category) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(&category.id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                let err = DbError::from(e);
                if err.is_foreign_key_violation() {
                    warn!(category = %category.category_id, "Category still in use");
                }
                err
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", &category.category_id));
        }

        debug!(category = %category.category_id, "Category deleted");
        self.notifier.notify(TableSet::CATEGORIES);
        Ok(())
    }

    /// Deletes every category no item references, then closes the gaps.
    ///
    /// ## Returns
    /// Number of categories removed; 0 means all are in use.
    pub async fn delete_unused(&self) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(
            r#"
            DELETE FROM categories
            WHERE category_id NOT IN (SELECT category FROM shopping_items)
            AND category_id NOT IN (SELECT category FROM usual_items)
            "#,
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if removed > 0 {
            compact(&mut tx).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(removed, "Unused categories deleted");
        if removed > 0 {
            self.notifier.notify(TableSet::CATEGORIES);
        }
        Ok(removed)
    }

    /// Renumbers ranks to `1..N`. Returns how many categories changed rank.
    pub async fn compact_ranks(&self) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;
        let changed = compact(&mut tx).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        if changed > 0 {
            info!(changed, "Category ranks compacted");
            self.notifier.notify(TableSet::CATEGORIES);
        }
        Ok(changed)
    }

    /// Closes every rank gap except the one for a category just deleted from
    /// `deleted_rank`. Returns the rank that category should be restored to.
    ///
    /// ## When This Occurs
    /// A second delete while an earlier one is still undoable: the earlier
    /// gap goes away, the new one stays open for its undo.
    pub async fn compact_ranks_around(&self, deleted_rank: i32) -> DbResult<i32> {
        let mut tx = self.pool.begin().await?;
        let gap = compact_leaving_gap(&mut tx, deleted_rank).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(deleted_rank, gap, "Category ranks compacted around pending undo");
        self.notifier.notify(TableSet::CATEGORIES);
        Ok(gap)
    }

    // -------------------------------------------------------------------------
    // Rank protocol
    // -------------------------------------------------------------------------

    /// Moves `category` to the rank currently held by `target`.
    ///
    /// Both ranks are re-read inside the transaction, so a stale drag result
    /// still lands where `target` is now. Returns false for a no-op.
    pub async fn move_category(&self, category: &Category, target: &Category) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let from = self.current_rank(&mut tx, category).await?;
        let to = self.current_rank(&mut tx, target).await?;

        let moved = self.move_within(&mut tx, from, to).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        if moved {
            self.notifier.notify(TableSet::CATEGORIES);
        }
        Ok(moved)
    }

    /// Moves the category at `from_rank` to `to_rank`.
    ///
    /// ## Errors
    /// `Domain(RankOutOfRange)` if either rank is outside `1..=N`.
    pub async fn move_rank(&self, from_rank: i32, to_rank: i32) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;
        let moved = self.move_within(&mut tx, from_rank, to_rank).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        if moved {
            self.notifier.notify(TableSet::CATEGORIES);
        }
        Ok(moved)
    }

    async fn current_rank(&self, conn: &mut SqliteConnection, category: &Category) -> DbResult<i32> {
        sqlx::query_scalar::<_, i32>("SELECT rank FROM categories WHERE id = ?1")
            .bind(&category.id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("Category", &category.category_id))
    }

    async fn move_within(&self, conn: &mut SqliteConnection, from: i32, to: i32) -> DbResult<bool> {
        // MAX rather than COUNT: a pending undo may leave a gap
        let max_rank: i32 = sqlx::query_scalar("SELECT coalesce(MAX(rank), 0) FROM categories")
            .fetch_one(&mut *conn)
            .await?;

        let Some(plan) = RankMove::plan_checked(from, to, max_rank)? else {
            return Ok(false);
        };

        let mover = find_by_rank(conn, plan.from)
            .await?
            .ok_or_else(|| DbError::not_found("Category at rank", plan.from.to_string()))?;

        debug!(category = %mover.category_id, from = plan.from, to = plan.to, "Moving category");
        apply_move(conn, &mover.id, plan).await?;
        Ok(true)
    }

    /// Puts a deleted category back.
    ///
    /// Tries its old rank, then the rank above, then the rank below; if all
    /// three are taken it is appended. Ranks are compacted afterwards.
    /// Returns the restored category as stored.
    pub async fn reinsert(&self, category: &Category) -> DbResult<Category> {
        let mut tx = self.pool.begin().await?;

        let mut chosen = None;
        for candidate in rank::reinsert_candidates(category.rank) {
            if find_by_rank(&mut tx, candidate).await?.is_none() {
                chosen = Some(candidate);
                break;
            }
        }

        match chosen {
            Some(rank) => {
                sqlx::query("INSERT INTO categories (id, category_id, rank) VALUES (?1, ?2, ?3)")
                    .bind(&category.id)
                    .bind(&category.category_id)
                    .bind(rank)
                    .execute(&mut *tx)
                    .await?;
            }
            None => {
                insert_by_name(&mut tx, &category.category_id).await?;
            }
        }

        compact(&mut tx).await?;
        let restored = find_by_name(&mut tx, &category.category_id)
            .await?
            .ok_or_else(|| DbError::Internal("restored category vanished".to_string()))?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(category = %restored.category_id, rank = restored.rank, "Category restored");
        self.notifier.notify(TableSet::CATEGORIES);
        Ok(restored)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
