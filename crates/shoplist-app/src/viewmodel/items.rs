//! # Shopping List View Model
//!
//! Commands for the shopping list screen.
//!
//! ## Create or Update
//! ```text
//! create_or_update(old?, name, category, quantity)
//!     │
//!     ├── validate (trim, non-empty, numeric quantity) ── Err(ValidationError)
//!     │
//!     ├── new label already on the list?
//!     │       new item            ──► false
//!     │       label changed       ──► false
//!     │
//!     └── insert / update (category created if unseen) ──► true
//! ```

use std::sync::Arc;

use shoplist_core::reconcile::{decide_create_or_update, CreateDecision};
use shoplist_core::validation::{validate_item_input, Quantity};
use shoplist_core::{shape_export, ItemSort, ShoppingItem, ValidationError, DEFAULT_QUANTITY};
use shoplist_db::Database;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::projection::{Projection, Snapshot};
use crate::settings::SortSettings;
use crate::undo::UndoSlot;
use crate::viewmodel::MessageComposer;

/// Handler for the shopping list screen.
#[derive(Clone)]
pub struct ShoppingListViewModel {
    db: Database,
    settings: SortSettings,
    config: Arc<AppConfig>,
    undo: Arc<UndoSlot<ShoppingItem>>,
    projection: Arc<Projection<ShoppingItem>>,
}

impl ShoppingListViewModel {
    pub fn new(db: Database, settings: SortSettings, config: Arc<AppConfig>) -> Self {
        ShoppingListViewModel {
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

    /// Starts (or restarts) the live list in the current sort mode.
    pub async fn open(&self) -> AppResult<()> {
        let ordering = self.settings.item_ordering();
        let live = self.db.shopping_items().watch(ordering).await?;
        self.projection.attach(live, ordering.is_grouped());
        Ok(())
    }

    pub fn close(&self) {
        self.projection.detach();
    }

    /// Rows for the UI, with re-render hints.
    pub fn items(&self) -> watch::Receiver<Snapshot<ShoppingItem>> {
        self.projection.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot<ShoppingItem> {
        self.projection.current()
    }

    /// Persists the item sort mode and re-attaches the list.
    pub async fn update_sorting(&self, sort: ItemSort) -> AppResult<()> {
        self.settings.set_item_sort(sort)?;
        debug!(?sort, "Shopping list sort changed");
        self.open().await
    }

    pub fn item_sort(&self) -> ItemSort {
        self.settings.item_sort()
    }

    // -------------------------------------------------------------------------
    // Editing
    // -------------------------------------------------------------------------

    /// Blank form: configured default category, quantity "1".
    pub fn draft(&self) -> ShoppingItem {
        ShoppingItem::new("", self.config.default_category.clone(), DEFAULT_QUANTITY)
    }

    /// Field-level feedback while the form is being filled in.
    ///
    /// Fails with the first problem: a missing field, a quantity that is not
    /// a number, or an identical item already on the list.
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
            .shopping_items()
            .find_exact(&input.name, &input.category, &input.quantity)
            .await?;
        if existing.is_some() {
            return Err(ValidationError::duplicate("item", input.name).into());
        }
        Ok(())
    }

    /// Creates an item (`old` is `None`) or edits `old`.
    ///
    /// Returns `false` when the target (name, category) is already on the
    /// list; nothing is written then.
    pub async fn create_or_update(
        &self,
        old: Option<&ShoppingItem>,
        name: &str,
        category: &str,
        quantity: &str,
    ) -> AppResult<bool> {
        let input = validate_item_input(name, category, quantity)?;
        let repo = self.db.shopping_items();

        let target_taken = repo.find(&input.name, &input.category).await?.is_some();
        let existing = old.map(|o| (o.name.as_str(), o.category.as_str()));

        match (decide_create_or_update(existing, &input, target_taken, false), old) {
            (CreateDecision::Reject, _) => {
                debug!(name = %input.name, category = %input.category, "Item already listed");
                Ok(false)
            }
            (CreateDecision::Update, Some(old)) => {
                let updated = ShoppingItem {
                    id: old.id.clone(),
                    name: input.name,
                    category: input.category,
                    quantity: input.quantity,
                    in_cart: old.in_cart,
                };
                repo.update(&updated).await?;
                Ok(true)
            }
            _ => {
                repo.insert(&ShoppingItem::new(input.name, input.category, input.quantity))
                    .await?;
                Ok(true)
            }
        }
    }

    pub async fn set_in_cart(&self, item: &ShoppingItem, in_cart: bool) -> AppResult<()> {
        self.db.shopping_items().set_in_cart(&item.id, in_cart).await?;
        Ok(())
    }

    /// Removes every checked item. Returns how many went.
    pub async fn clear_checked(&self) -> AppResult<u64> {
        Ok(self.db.shopping_items().delete_in_cart().await?)
    }

    pub async fn empty_list(&self) -> AppResult<u64> {
        Ok(self.db.shopping_items().delete_all().await?)
    }

    // -------------------------------------------------------------------------
    // Delete & Undo
    // -------------------------------------------------------------------------

    /// Deletes the item and keeps it for one undo.
    pub async fn delete(&self, item: &ShoppingItem) -> AppResult<()> {
        self.db.shopping_items().delete(item).await?;
        self.undo.stash(item.clone());
        Ok(())
    }

    /// Restores the last deleted item under a fresh id, cart state included.
    /// Returns `false` when there was nothing to undo.
    pub async fn undo(&self) -> AppResult<bool> {
        let Some(deleted) = self.undo.take() else {
            return Ok(false);
        };

        self.db.shopping_items().insert(&deleted.with_fresh_id()).await?;
        debug!(name = %deleted.name, "Shopping item restored");
        Ok(true)
    }

    /// Forgets the pending undo.
    pub fn abort_undo(&self) -> bool {
        self.undo.abort().is_some()
    }

    pub fn can_undo(&self) -> bool {
        self.undo.is_pending()
    }

    // -------------------------------------------------------------------------
    // Export
    // -------------------------------------------------------------------------

    /// Sends the items not yet in the cart to `composer`.
    ///
    /// Returns `false` without calling it when there is nothing to send.
    pub async fn export(&self, composer: &dyn MessageComposer) -> AppResult<bool> {
        let items = self
            .db
            .shopping_items()
            .uncarted(self.settings.item_ordering())
            .await?;

        let Some(text) = shape_export(&items, self.settings.item_sort(), &self.config.export_header)
        else {
            return Ok(false);
        };

        composer.compose(&text)?;
        info!(items = items.len(), "Shopping list exported");
        Ok(true)
    }
}
