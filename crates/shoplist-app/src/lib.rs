//! # Shoplist App Library
//!
//! Command handlers and view state for the shopping list. A UI host opens a
//! [`ShoppingApp`], then drives the three view models.
//!
//! ## Module Organization
//! ```text
//! shoplist_app/
//! ├── lib.rs          ◄─── You are here (startup, delete dispatch)
//! ├── config.rs       ◄─── AppConfig (TOML + env)
//! ├── settings.rs     ◄─── SortSettings over a PreferenceStore
//! ├── undo.rs         ◄─── UndoSlot<T>
//! ├── projection.rs   ◄─── Projection<T> (live query forwarding)
//! ├── viewmodel/
//! │   ├── items.rs    ◄─── Shopping list commands + export
//! │   ├── usual.rs    ◄─── Usual list commands + propagation
//! │   └── categories.rs ◄─ Category commands + rank protocol
//! └── error.rs        ◄─── AppError for handlers
//! ```
//!
//! ## Shared State
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          ShoppingApp                                    │
//! │                                                                         │
//! │  ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────────┐   │
//! │  │    Database      │ │   SortSettings   │ │   Arc<AppConfig>     │   │
//! │  │  • pool          │ │  • sortBy        │ │  • default category  │   │
//! │  │  • notifier      │ │  • catSortBy     │ │  • export header     │   │
//! │  └──────────────────┘ └──────────────────┘ └──────────────────────┘   │
//! │            shared by every view model (all clones)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod projection;
pub mod settings;
pub mod undo;
pub mod viewmodel;

use std::sync::Arc;

use shoplist_core::ListEntry;
use shoplist_db::{Database, DbConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub use config::{AppConfig, ConfigError};
pub use error::{AppError, AppResult, ErrorCode};
pub use projection::{Projection, Snapshot};
pub use settings::{MemoryPreferences, PreferenceStore, SortSettings, TomlPreferences};
pub use undo::UndoSlot;
pub use viewmodel::{
    CategoryViewModel, MessageComposer, ShoppingListViewModel, ToggleNotice, UsualListViewModel,
};

/// Everything a UI host needs, wired together.
#[derive(Clone)]
pub struct ShoppingApp {
    config: Arc<AppConfig>,
    db: Database,
    settings: SortSettings,
    shopping_list: ShoppingListViewModel,
    usual_list: UsualListViewModel,
    categories: CategoryViewModel,
}

impl ShoppingApp {
    /// Opens the configured database and preference store.
    ///
    /// ## Startup Sequence
    /// ```text
    /// 1. Resolve database path (config → platform data dir)
    /// 2. Connect, run migrations
    /// 3. Open preferences (TOML file or in-memory)
    /// 4. Seed categories if the database is empty
    /// ```
    pub async fn open(config: AppConfig) -> AppResult<Self> {
        let db_path = config.resolve_database_path()?;
        info!(path = %db_path.display(), "Opening shopping list");

        let db = Database::new(DbConfig::new(db_path)).await?;
        let store = settings::open_store(config.preferences_path.as_deref())?;
        Self::with_parts(config, db, SortSettings::new(store)).await
    }

    /// In-memory database and preferences.
    pub async fn in_memory(config: AppConfig) -> AppResult<Self> {
        let db = Database::new(DbConfig::in_memory()).await?;
        Self::with_parts(config, db, SortSettings::in_memory()).await
    }

    /// Wires the view models around an open database.
    pub async fn with_parts(
        config: AppConfig,
        db: Database,
        settings: SortSettings,
    ) -> AppResult<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let app = ShoppingApp {
            shopping_list: ShoppingListViewModel::new(
                db.clone(),
                settings.clone(),
                Arc::clone(&config),
            ),
            usual_list: UsualListViewModel::new(db.clone(), settings.clone(), Arc::clone(&config)),
            categories: CategoryViewModel::new(db.clone(), settings.clone()),
            config,
            db,
            settings,
        };

        app.seed_if_empty().await?;
        Ok(app)
    }

    /// Creates the configured seed categories on an empty database.
    /// Returns how many were created.
    pub async fn seed_if_empty(&self) -> AppResult<usize> {
        let repo = self.db.categories();
        if repo.count().await? > 0 {
            return Ok(0);
        }

        let mut created = 0;
        for name in &self.config.seed_categories {
            let name = name.trim();
            if repo.get_by_name(name).await?.is_none() {
                repo.insert_by_name(name).await?;
                created += 1;
            }
        }

        if created > 0 {
            info!(created, "Seed categories created");
        }
        Ok(created)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> &SortSettings {
        &self.settings
    }

    pub fn shopping_list(&self) -> &ShoppingListViewModel {
        &self.shopping_list
    }

    pub fn usual_list(&self) -> &UsualListViewModel {
        &self.usual_list
    }

    pub fn categories(&self) -> &CategoryViewModel {
        &self.categories
    }

    /// Deletes a row from whichever list it belongs to, filling that list's
    /// undo slot.
    pub async fn delete_entry(&self, entry: &ListEntry) -> AppResult<()> {
        match entry {
            ListEntry::Category(category) => self.categories.delete(category).await,
            ListEntry::ShoppingItem(item) => self.shopping_list.delete(item).await,
            ListEntry::UsualItem(item) => self.usual_list.delete(item).await,
        }
    }

    pub async fn close(&self) {
        self.shopping_list.close();
        self.usual_list.close();
        self.categories.close();
        self.db.close().await;
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=shoplist=trace` - Show trace for shoplist crates only
/// - Default: `info,shoplist=debug,sqlx=warn`
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,shoplist=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
