//! # Category View Model
//!
//! Commands for the category screen: create, rename, reorder, delete.
//!
//! ## Rank Gaps and Undo
//! ```text
//!   ranks   1 2 3 4            delete B (rank 2)
//!           A B C D   ──────►  A _ C D     gap kept while B can come back
//!
//!   undo     ─► reinsert B at 2 (or 1, or 3, or the end), compact
//!   abort    ─► compact: A C D = 1 2 3
//!   delete C ─► B is displaced: compact, C pending
//! ```

use std::sync::Arc;

use shoplist_core::validation::validate_category_name;
use shoplist_core::{Category, CategorySort};
use shoplist_db::{Database, DbError};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, ErrorCode};
use crate::projection::{Projection, Snapshot};
use crate::settings::SortSettings;
use crate::undo::UndoSlot;

/// Handler for the category screen.
#[derive(Clone)]
pub struct CategoryViewModel {
    db: Database,
    settings: SortSettings,
    undo: Arc<UndoSlot<Category>>,
    projection: Arc<Projection<Category>>,
}

impl CategoryViewModel {
    pub fn new(db: Database, settings: SortSettings) -> Self {
        CategoryViewModel {
            db,
            settings,
            undo: Arc::new(UndoSlot::new()),
            projection: Arc::new(Projection::new()),
        }
    }

    // -------------------------------------------------------------------------
    // Projection
    // -------------------------------------------------------------------------

    pub async fn open(&self) -> AppResult<()> {
        let live = self
            .db
            .categories()
            .watch(self.settings.category_ordering())
            .await?;
        self.projection.attach(live, false);
        Ok(())
    }

    pub fn close(&self) {
        self.projection.detach();
    }

    pub fn categories(&self) -> watch::Receiver<Snapshot<Category>> {
        self.projection.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot<Category> {
        self.projection.current()
    }

    /// Persists the category sort mode and re-attaches the list.
    pub async fn update_sorting(&self, sort: CategorySort) -> AppResult<()> {
        self.settings.set_category_sort(sort)?;
        debug!(?sort, "Category sort changed");
        self.open().await
    }

    pub fn can_reorder(&self) -> bool {
        self.settings.can_reorder()
    }

    /// Non-live list by name, for category pickers.
    pub async fn all_categories(&self) -> AppResult<Vec<Category>> {
        Ok(self.db.categories().list_by_name().await?)
    }

    // -------------------------------------------------------------------------
    // Editing
    // -------------------------------------------------------------------------

    /// Creates a category (`old` is `None`) or renames `old`.
    ///
    /// Returns `false` when the name is already taken by another category.
    /// Renaming a category to its own name is accepted (`true`) and writes
    /// nothing. A rename carries over to every item in the category.
    pub async fn create_or_update(&self, old: Option<&Category>, name: &str) -> AppResult<bool> {
        let name = validate_category_name(name)?;
        let repo = self.db.categories();

        if let Some(old) = old {
            if old.category_id == name {
                return Ok(true);
            }
        }
        if repo.get_by_name(&name).await?.is_some() {
            debug!(category = %name, "Category name taken");
            return Ok(false);
        }

        match old {
            Some(old) => repo.rename(&old.category_id, &name).await?,
            None => {
                repo.insert_by_name(&name).await?;
            }
        }
        Ok(true)
    }

    /// Moves `category` to the position of `target`.
    ///
    /// Does nothing (and returns `false`) unless the custom order is shown.
    pub async fn move_category(&self, category: &Category, target: &Category) -> AppResult<bool> {
        if !self.can_reorder() {
            return Ok(false);
        }
        Ok(self.db.categories().move_category(category, target).await?)
    }

    /// Rank-based move for drag-and-drop hosts. Same guard as `move_category`.
    pub async fn move_rank(&self, from_rank: i32, to_rank: i32) -> AppResult<bool> {
        if !self.can_reorder() {
            return Ok(false);
        }
        Ok(self.db.categories().move_rank(from_rank, to_rank).await?)
    }

    /// Deletes every category no item uses. Returns how many; zero means
    /// all are in use.
    pub async fn delete_unused(&self) -> AppResult<u64> {
        Ok(self.db.categories().delete_unused().await?)
    }

    // -------------------------------------------------------------------------
    // Delete & Undo
    // -------------------------------------------------------------------------

    /// Deletes `category` and keeps it for one undo.
    ///
    /// ## Errors
    /// `ConstraintViolation` when items still use it. The pending undo, if
    /// any, is left alone.
    pub async fn delete(&self, category: &Category) -> AppResult<()> {
        let repo = self.db.categories();
        match repo.delete(category).await {
            Ok(()) => {}
            Err(e @ DbError::ForeignKeyViolation { .. }) => {
                warn!(category = %category.category_id, error = %e, "Category in use");
                return Err(AppError::new(
                    ErrorCode::ConstraintViolation,
                    format!("Cannot delete '{}': category in use", category.category_id),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        // Displacing an earlier delete closes its gap; this one's stays open.
        let snapshot = if self.undo.is_pending() {
            let rank = repo.compact_ranks_around(category.rank).await?;
            Category {
                rank,
                ..category.clone()
            }
        } else {
            category.clone()
        };

        if let Some(displaced) = self.undo.stash(snapshot) {
            debug!(category = %displaced.category_id, "Pending category undo displaced");
        }
        Ok(())
    }

    /// Restores the last deleted category as close to its old rank as
    /// possible. Returns the restored row, `None` if nothing was pending.
    pub async fn undo(&self) -> AppResult<Option<Category>> {
        let Some(deleted) = self.undo.take() else {
            return Ok(None);
        };

        let restored = self.db.categories().reinsert(&deleted).await?;
        debug!(
            category = %restored.category_id,
            wanted = deleted.rank,
            got = restored.rank,
            "Category restored"
        );
        Ok(Some(restored))
    }

    /// Forgets the pending undo and closes its rank gap.
    pub async fn abort_undo(&self) -> AppResult<bool> {
        if self.undo.abort().is_none() {
            return Ok(false);
        }
        self.db.categories().compact_ranks().await?;
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        self.undo.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoplist_core::ShoppingItem;
    use shoplist_db::DbConfig;

    async fn setup(names: &[&str]) -> CategoryViewModel {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for name in names {
            db.categories().insert_by_name(name).await.unwrap();
        }
        CategoryViewModel::new(db, SortSettings::in_memory())
    }

    async fn order(vm: &CategoryViewModel) -> Vec<(String, i32)> {
        vm.db
            .categories()
            .list_by_rank()
            .await
            .unwrap()
            .into_iter()
            .map(|c| (c.category_id, c.rank))
            .collect()
    }

    fn pairs(names: &[(&str, i32)]) -> Vec<(String, i32)> {
        names.iter().map(|(n, r)| (n.to_string(), *r)).collect()
    }

    #[tokio::test]
    async fn test_create_and_rename() {
        let vm = setup(&["Dairy"]).await;

        assert!(vm.create_or_update(None, "Bakery").await.unwrap());
        assert!(!vm.create_or_update(None, " Dairy ").await.unwrap());

        let bakery = vm.db.categories().get_by_name("Bakery").await.unwrap().unwrap();
        assert!(!vm.create_or_update(Some(&bakery), "Dairy").await.unwrap());
        assert!(vm.create_or_update(Some(&bakery), "Bread").await.unwrap());
        assert_eq!(order(&vm).await, pairs(&[("Dairy", 1), ("Bread", 2)]));
    }

    #[tokio::test]
    async fn test_delete_in_use_keeps_slot() {
        let vm = setup(&["Dairy", "Bakery"]).await;
        let bakery = vm.db.categories().get_by_name("Bakery").await.unwrap().unwrap();
        vm.delete(&bakery).await.unwrap();

        vm.db
            .shopping_items()
            .insert(&ShoppingItem::new("Milk", "Dairy", "1"))
            .await
            .unwrap();
        let dairy = vm.db.categories().get_by_name("Dairy").await.unwrap().unwrap();

        let err = vm.delete(&dairy).await.unwrap_err();
        assert!(err.is_constraint_violation());

        // Bakery is still the pending undo
        let restored = vm.undo().await.unwrap().unwrap();
        assert_eq!(restored.category_id, "Bakery");
    }

    #[tokio::test]
    async fn test_undo_restores_rank() {
        let vm = setup(&["A", "B", "C", "D"]).await;
        let b = vm.db.categories().get_by_name("B").await.unwrap().unwrap();

        vm.delete(&b).await.unwrap();
        assert_eq!(order(&vm).await, pairs(&[("A", 1), ("C", 3), ("D", 4)]));

        let restored = vm.undo().await.unwrap().unwrap();
        assert_eq!(restored.rank, 2);
        assert_eq!(
            order(&vm).await,
            pairs(&[("A", 1), ("B", 2), ("C", 3), ("D", 4)])
        );
        assert!(vm.undo().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_abort_compacts() {
        let vm = setup(&["A", "B", "C"]).await;
        let a = vm.db.categories().get_by_name("A").await.unwrap().unwrap();

        vm.delete(&a).await.unwrap();
        assert!(vm.abort_undo().await.unwrap());
        assert_eq!(order(&vm).await, pairs(&[("B", 1), ("C", 2)]));
        assert!(!vm.abort_undo().await.unwrap());
    }

    #[tokio::test]
    async fn test_second_delete_compacts_displaced_gap() {
        let vm = setup(&["A", "B", "C", "D"]).await;
        let b = vm.db.categories().get_by_name("B").await.unwrap().unwrap();
        let d = vm.db.categories().get_by_name("D").await.unwrap().unwrap();

        vm.delete(&b).await.unwrap();
        vm.delete(&d).await.unwrap();

        assert_eq!(order(&vm).await, pairs(&[("A", 1), ("C", 2)]));
        let restored = vm.undo().await.unwrap().unwrap();
        assert_eq!(restored.category_id, "D");
        assert_eq!(order(&vm).await, pairs(&[("A", 1), ("C", 2), ("D", 3)]));
    }

    #[tokio::test]
    async fn test_second_middle_delete_undoes_in_place() {
        let vm = setup(&["A", "B", "C", "D"]).await;
        let b = vm.db.categories().get_by_name("B").await.unwrap().unwrap();
        let c = vm.db.categories().get_by_name("C").await.unwrap().unwrap();

        vm.delete(&b).await.unwrap();
        vm.delete(&c).await.unwrap();

        let restored = vm.undo().await.unwrap().unwrap();
        assert_eq!(restored.category_id, "C");
        assert_eq!(restored.rank, 2);
        assert_eq!(
            order(&vm).await,
            pairs(&[("A", 1), ("C", 2), ("D", 3)])
        );
    }

    #[tokio::test]
    async fn test_rename_to_own_name_is_accepted() {
        let vm = setup(&["Dairy"]).await;
        let dairy = vm.db.categories().get_by_name("Dairy").await.unwrap().unwrap();

        assert!(vm.create_or_update(Some(&dairy), " Dairy ").await.unwrap());
        assert_eq!(order(&vm).await, pairs(&[("Dairy", 1)]));
    }

    #[tokio::test]
    async fn test_move_only_in_custom_mode() {
        let vm = setup(&["A", "B", "C"]).await;
        let a = vm.db.categories().get_by_name("A").await.unwrap().unwrap();
        let c = vm.db.categories().get_by_name("C").await.unwrap().unwrap();

        assert!(vm.move_category(&a, &c).await.unwrap());
        assert_eq!(order(&vm).await, pairs(&[("B", 1), ("C", 2), ("A", 3)]));

        vm.update_sorting(CategorySort::Alphabetical).await.unwrap();
        assert!(!vm.can_reorder());
        assert!(!vm.move_rank(1, 3).await.unwrap());
        assert_eq!(order(&vm).await, pairs(&[("B", 1), ("C", 2), ("A", 3)]));
    }

    #[tokio::test]
    async fn test_delete_unused() {
        let vm = setup(&["A", "B", "C"]).await;
        vm.db
            .shopping_items()
            .insert(&ShoppingItem::new("Milk", "B", "1"))
            .await
            .unwrap();

        assert_eq!(vm.delete_unused().await.unwrap(), 2);
        assert_eq!(order(&vm).await, pairs(&[("B", 1)]));
        assert_eq!(vm.delete_unused().await.unwrap(), 0);
    }
}
