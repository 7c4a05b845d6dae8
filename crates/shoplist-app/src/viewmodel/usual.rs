//! # Usual List View Model
//!
//! Commands for the usual items screen, including the edits that may carry
//! over to the shopping list.
//!
//! ## Edit Round Trip
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UI                          UsualListViewModel                         │
//! │                                                                         │
//! │  save form ───────────────► create_or_update(old, fields)               │
//! │                                   │                                     │
//! │          ◄── Rejected ────────────┤ label taken                         │
//! │          ◄── Updated ─────────────┤ not on the shopping list            │
//! │          ◄── NeedsPropagationChoice (on the shopping list)              │
//! │                                                                         │
//! │  "also change the list?"                                                │
//! │  yes / no ────────────────► update_item(old, fields, Some(answer))      │
//! │          ◄── UsualUpdatePlan (cannot_propagate() → warn the user)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shoplist_core::reconcile::{
    decide_create_or_update, needs_collision_check, plan_usual_update, CreateDecision, EditKind,
    FlagRule,
};
use shoplist_core::validation::{validate_item_input, Quantity};
use shoplist_core::{
    EditOutcome, ItemSort, UsualItem, UsualUpdatePlan, ValidationError, DEFAULT_QUANTITY,
};
use shoplist_db::Database;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use ts_rs::TS;

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::projection::{Projection, Snapshot};
use crate::settings::SortSettings;
use crate::undo::UndoSlot;

/// What a toggle did, for the confirmation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ToggleNotice {
    Added,
    Removed,
}

/// Handler for the usual items screen.
#[derive(Clone)]
pub struct UsualListViewModel {
    db: Database,
    settings: SortSettings,
    config: Arc<AppConfig>,
    undo: Arc<UndoSlot<UsualItem>>,
    projection: Arc<Projection<UsualItem>>,
}

impl UsualListViewModel {
    pub fn new(db: Database, settings: SortSettings, config: Arc<AppConfig>) -> Self {
        UsualListViewModel {
            db,
            settings,
            config,
            undo: Arc::new(UndoSlot::new()),
            projection: Arc::new(Projection::new()),
        }
    }

    // -------------------------------------------------------------------------
    // Projection
    // -------------------------------------------------------------------------

    /// Brings every `in_shopping_list` flag up to date, then starts the live
    /// list.
    pub async fn open(&self) -> AppResult<()> {
        self.db.usual_items().refresh_in_shopping_list_flags().await?;
        self.attach().await
    }

    async fn attach(&self) -> AppResult<()> {
        let ordering = self.settings.item_ordering();
        let live = self.db.usual_items().watch(ordering).await?;
        self.projection.attach(live, ordering.is_grouped());
        Ok(())
    }

    pub fn close(&self) {
        self.projection.detach();
    }

    pub fn items(&self) -> watch::Receiver<Snapshot<UsualItem>> {
        self.projection.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot<UsualItem> {
        self.projection.current()
    }

    pub async fn update_sorting(&self, sort: ItemSort) -> AppResult<()> {
        self.settings.set_item_sort(sort)?;
        debug!(?sort, "Usual list sort changed");
        self.attach().await
    }

    // -------------------------------------------------------------------------
    // Shopping list link
    // -------------------------------------------------------------------------

    /// Puts the item on the shopping list, or takes it off.
    pub async fn toggle(&self, item: &UsualItem) -> AppResult<ToggleNotice> {
        let repo = self.db.usual_items();
        if item.in_shopping_list {
            repo.remove_from_shopping_list(item).await?;
            Ok(ToggleNotice::Removed)
        } else {
            repo.add_to_shopping_list(item).await?;
            Ok(ToggleNotice::Added)
        }
    }

    /// Copies every usual item not yet on the shopping list onto it.
    /// Returns how many were added.
    pub async fn transfer_remaining(&self) -> AppResult<u64> {
        Ok(self.db.usual_items().transfer_remaining().await?)
    }

    // -------------------------------------------------------------------------
    // Editing
    // -------------------------------------------------------------------------

    pub fn draft(&self) -> UsualItem {
        UsualItem::new("", self.config.default_category.clone(), DEFAULT_QUANTITY)
    }

    pub async fn check_input(
        &self,
        name: &str,
        category: &str,
        quantity: &str,
        unit: &str,
    ) -> AppResult<()> {
        let input = validate_item_input(name, category, &Quantity::compose(quantity, unit))?;

        let existing = self
            .db
            .usual_items()
            .find_exact(&input.name, &input.category, &input.quantity)
            .await?;
        if existing.is_some() {
            return Err(ValidationError::duplicate("usual item", input.name).into());
        }
        Ok(())
    }

    /// Creates a usual item (`old` is `None`) or starts editing `old`.
    ///
    /// An item currently on the shopping list is not written here: the
    /// caller gets `NeedsPropagationChoice` and finishes with
    /// [`update_item`](Self::update_item).
    pub async fn create_or_update(
        &self,
        old: Option<&UsualItem>,
        name: &str,
        category: &str,
        quantity: &str,
    ) -> AppResult<EditOutcome> {
        let input = validate_item_input(name, category, quantity)?;
        let repo = self.db.usual_items();

        let target_taken = repo.find(&input.name, &input.category).await?.is_some();
        let existing = old.map(|o| (o.name.as_str(), o.category.as_str()));
        let linked = old.map(|o| o.in_shopping_list).unwrap_or(false);

        match (decide_create_or_update(existing, &input, target_taken, linked), old) {
            (CreateDecision::Reject, _) => Ok(EditOutcome::Rejected),
            (CreateDecision::AskPropagation, _) => Ok(EditOutcome::NeedsPropagationChoice),
            (CreateDecision::Update, Some(old)) => {
                self.update_item(old, &input.name, &input.category, &input.quantity, None)
                    .await?;
                Ok(EditOutcome::Updated)
            }
            _ => {
                repo.insert(&UsualItem::new(input.name, input.category, input.quantity))
                    .await?;
                Ok(EditOutcome::Updated)
            }
        }
    }

    /// Applies an edit to `old`.
    ///
    /// `propagate` is `None` when the item is not on the shopping list, and
    /// the user's answer otherwise. Check
    /// [`cannot_propagate`](UsualUpdatePlan::cannot_propagate) on the result:
    /// when set, the shopping list already had the new label and the old
    /// shopping item was left as it was.
    pub async fn update_item(
        &self,
        old: &UsualItem,
        name: &str,
        category: &str,
        quantity: &str,
        propagate: Option<bool>,
    ) -> AppResult<UsualUpdatePlan> {
        let input = validate_item_input(name, category, quantity)?;
        let kind = EditKind::classify(&old.name, &old.category, &old.quantity, &input);

        let new_label_on_list = if needs_collision_check(kind, propagate) {
            self.db
                .shopping_items()
                .find(&input.name, &input.category)
                .await?
                .is_some()
        } else {
            false
        };

        let plan = plan_usual_update(kind, propagate, new_label_on_list);
        let repo = self.db.usual_items();
        let updated = UsualItem {
            id: old.id.clone(),
            name: input.name.clone(),
            category: input.category.clone(),
            quantity: input.quantity.clone(),
            in_shopping_list: true,
        };

        match plan {
            UsualUpdatePlan::Skip => {}
            UsualUpdatePlan::UsualOnly(FlagRule::KeepLinked) => repo.update(&updated).await?,
            UsualUpdatePlan::UsualOnly(FlagRule::Recompute) => {
                repo.update_recomputing_flag(&updated).await?
            }
            UsualUpdatePlan::CannotPropagate => {
                warn!(
                    name = %input.name,
                    category = %input.category,
                    "Shopping list already has the new label, updating usual item only"
                );
                repo.update_recomputing_flag(&updated).await?
            }
            UsualUpdatePlan::Linked => {
                repo.update_with_linked_item(old, &input.name, &input.category, &input.quantity)
                    .await?
            }
        }

        debug!(?plan, id = %old.id, "Usual item edit applied");
        Ok(plan)
    }

    // -------------------------------------------------------------------------
    // Delete & Undo
    // -------------------------------------------------------------------------

    pub async fn delete(&self, item: &UsualItem) -> AppResult<()> {
        self.db.usual_items().delete(item).await?;
        self.undo.stash(item.clone());
        Ok(())
    }

    /// Restores the last deleted item under a fresh id. Its flag is
    /// recomputed from the shopping list as it is now.
    pub async fn undo(&self) -> AppResult<bool> {
        let Some(deleted) = self.undo.take() else {
            return Ok(false);
        };

        self.db.usual_items().insert(&deleted.with_fresh_id()).await?;
        debug!(name = %deleted.name, "Usual item restored");
        Ok(true)
    }

    pub fn abort_undo(&self) -> bool {
        self.undo.abort().is_some()
    }

    pub fn can_undo(&self) -> bool {
        self.undo.is_pending()
    }

    /// Empties the usual list. The shopping list is untouched.
    pub async fn empty(&self) -> AppResult<u64> {
        let removed = self.db.usual_items().delete_all().await?;
        info!(removed, "Usual list emptied");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoplist_core::ShoppingItem;
    use shoplist_db::DbConfig;

    async fn setup() -> UsualListViewModel {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        UsualListViewModel::new(db, SortSettings::in_memory(), Arc::new(AppConfig::default()))
    }

    async fn usual(vm: &UsualListViewModel, name: &str, category: &str) -> UsualItem {
        vm.db.usual_items().find(name, category).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_create_and_reject() {
        let vm = setup().await;

        assert_eq!(
            vm.create_or_update(None, "Milk", "Dairy", "1").await.unwrap(),
            EditOutcome::Updated
        );
        assert_eq!(
            vm.create_or_update(None, "Milk", "Dairy", "2").await.unwrap(),
            EditOutcome::Rejected
        );
    }

    #[tokio::test]
    async fn test_linked_item_asks_first() {
        let vm = setup().await;
        vm.create_or_update(None, "Milk", "Dairy", "1").await.unwrap();
        let milk = usual(&vm, "Milk", "Dairy").await;
        assert_eq!(vm.toggle(&milk).await.unwrap(), ToggleNotice::Added);
        let milk = usual(&vm, "Milk", "Dairy").await;

        let outcome = vm.create_or_update(Some(&milk), "Milk", "Dairy", "3").await.unwrap();
        assert_eq!(outcome, EditOutcome::NeedsPropagationChoice);
        // nothing written yet
        assert_eq!(usual(&vm, "Milk", "Dairy").await.quantity, "1");
    }

    #[tokio::test]
    async fn test_quantity_propagation() {
        let vm = setup().await;
        vm.create_or_update(None, "Milk", "Dairy", "1").await.unwrap();
        let milk = usual(&vm, "Milk", "Dairy").await;
        vm.toggle(&milk).await.unwrap();
        let milk = usual(&vm, "Milk", "Dairy").await;

        let plan = vm.update_item(&milk, "Milk", "Dairy", "3", Some(true)).await.unwrap();
        assert_eq!(plan, UsualUpdatePlan::Linked);
        let listed = vm.db.shopping_items().find("Milk", "Dairy").await.unwrap().unwrap();
        assert_eq!(listed.quantity, "3");

        let milk = usual(&vm, "Milk", "Dairy").await;
        vm.update_item(&milk, "Milk", "Dairy", "4", Some(false)).await.unwrap();
        let milk = usual(&vm, "Milk", "Dairy").await;
        let listed = vm.db.shopping_items().find("Milk", "Dairy").await.unwrap().unwrap();
        assert_eq!(milk.quantity, "4");
        assert!(milk.in_shopping_list);
        assert_eq!(listed.quantity, "3");
    }

    #[tokio::test]
    async fn test_relabel_collision_cannot_propagate() {
        let vm = setup().await;
        vm.create_or_update(None, "Milk", "Dairy", "1").await.unwrap();
        let milk = usual(&vm, "Milk", "Dairy").await;
        vm.toggle(&milk).await.unwrap();
        let milk = usual(&vm, "Milk", "Dairy").await;
        vm.db
            .shopping_items()
            .insert(&ShoppingItem::new("Oat milk", "Dairy", "2"))
            .await
            .unwrap();

        let plan = vm
            .update_item(&milk, "Oat milk", "Dairy", "1", Some(true))
            .await
            .unwrap();
        assert!(plan.cannot_propagate());

        // usual item renamed and flagged from the list; old shopping item untouched
        let renamed = vm.db.usual_items().get_by_id(&milk.id).await.unwrap().unwrap();
        assert_eq!(renamed.name, "Oat milk");
        assert!(renamed.in_shopping_list);
        assert!(vm.db.shopping_items().find("Milk", "Dairy").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_relabel_propagates() {
        let vm = setup().await;
        vm.create_or_update(None, "Milk", "Dairy", "1").await.unwrap();
        let milk = usual(&vm, "Milk", "Dairy").await;
        vm.toggle(&milk).await.unwrap();
        let milk = usual(&vm, "Milk", "Dairy").await;

        let plan = vm
            .update_item(&milk, "Milk", "Fridge", "1", Some(true))
            .await
            .unwrap();
        assert_eq!(plan, UsualUpdatePlan::Linked);
        assert!(vm.db.shopping_items().find("Milk", "Dairy").await.unwrap().is_none());
        assert!(vm.db.shopping_items().find("Milk", "Fridge").await.unwrap().is_some());
        assert!(vm.db.categories().get_by_name("Fridge").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unchanged_edit_is_skipped() {
        let vm = setup().await;
        vm.create_or_update(None, "Milk", "Dairy", "1").await.unwrap();
        let milk = usual(&vm, "Milk", "Dairy").await;

        let plan = vm.update_item(&milk, " Milk ", "Dairy", "1", None).await.unwrap();
        assert_eq!(plan, UsualUpdatePlan::Skip);
    }

    #[tokio::test]
    async fn test_toggle_round_trip() {
        let vm = setup().await;
        vm.create_or_update(None, "Eggs", "Dairy", "12").await.unwrap();
        let eggs = usual(&vm, "Eggs", "Dairy").await;

        assert_eq!(vm.toggle(&eggs).await.unwrap(), ToggleNotice::Added);
        let eggs = usual(&vm, "Eggs", "Dairy").await;
        assert_eq!(vm.toggle(&eggs).await.unwrap(), ToggleNotice::Removed);
        assert_eq!(vm.db.shopping_items().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_undo_recomputes_flag() {
        let vm = setup().await;
        vm.create_or_update(None, "Milk", "Dairy", "1").await.unwrap();
        let milk = usual(&vm, "Milk", "Dairy").await;
        vm.delete(&milk).await.unwrap();

        vm.db
            .shopping_items()
            .insert(&ShoppingItem::new("Milk", "Dairy", "1"))
            .await
            .unwrap();
        assert!(vm.undo().await.unwrap());

        let restored = usual(&vm, "Milk", "Dairy").await;
        assert_ne!(restored.id, milk.id);
        assert!(restored.in_shopping_list);
    }

    #[tokio::test]
    async fn test_transfer_and_empty() {
        let vm = setup().await;
        vm.create_or_update(None, "Milk", "Dairy", "1").await.unwrap();
        vm.create_or_update(None, "Bread", "Bakery", "1").await.unwrap();

        assert_eq!(vm.transfer_remaining().await.unwrap(), 2);
        assert_eq!(vm.empty().await.unwrap(), 2);
        assert_eq!(vm.db.shopping_items().count().await.unwrap(), 2);
    }
}
