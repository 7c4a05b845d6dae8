//! # Sort Settings
//!
//! The two sort axes and the key-value store they persist to.
//!
//! ```text
//! ┌──────────────────┐   get/set    ┌───────────────────────────┐
//! │   SortSettings   │ ───────────► │  dyn PreferenceStore      │
//! │  item_sort()     │              │  ├── MemoryPreferences    │
//! │  category_sort() │              │  └── TomlPreferences      │
//! └──────────────────┘              └───────────────────────────┘
//!     "sortBy"    = 0 (by category) | 1 (by name)
//!     "catSortBy" = 0 (custom)      | 1 (alphabetical)
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use shoplist_core::{CategoryOrdering, CategorySort, ItemOrdering, ItemSort};
use tracing::{debug, warn};

use crate::config::ConfigError;

pub const ITEM_SORT_KEY: &str = "sortBy";
pub const CATEGORY_SORT_KEY: &str = "catSortBy";

// =============================================================================
// Preference Store
// =============================================================================

/// Integer preferences provided by the host.
pub trait PreferenceStore: Send + Sync {
    fn get_int(&self, key: &str) -> Option<i64>;

    fn set_int(&self, key: &str, value: i64) -> Result<(), ConfigError>;
}

/// Preferences that last as long as the process.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<BTreeMap<String, i64>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get_int(&self, key: &str) -> Option<i64> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.get(key).copied()
    }

    fn set_int(&self, key: &str, value: i64) -> Result<(), ConfigError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Preferences stored as a flat TOML table, rewritten on every change.
#[derive(Debug)]
pub struct TomlPreferences {
    path: PathBuf,
    values: Mutex<BTreeMap<String, i64>>,
}

impl TomlPreferences {
    /// Opens the file, starting empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let values = if path.exists() {
            let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), entries = values.len(), "Preferences opened");
        Ok(TomlPreferences {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, values: &BTreeMap<String, i64>) -> Result<(), ConfigError> {
        let io_error = |e: std::io::Error| ConfigError::Io {
            path: self.path.display().to_string(),
            message: e.to_string(),
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let text = toml::to_string(values).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(&self.path, text).map_err(io_error)
    }
}

impl PreferenceStore for TomlPreferences {
    fn get_int(&self, key: &str) -> Option<i64> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.get(key).copied()
    }

    fn set_int(&self, key: &str, value: i64) -> Result<(), ConfigError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value);
        self.write(&values)
    }
}

// =============================================================================
// Sort Settings
// =============================================================================

/// Current sort modes, read through to the preference store.
///
/// Cheap to clone; clones share the store.
#[derive(Clone)]
pub struct SortSettings {
    store: Arc<dyn PreferenceStore>,
}

impl std::fmt::Debug for SortSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SortSettings")
            .field("item_sort", &self.item_sort())
            .field("category_sort", &self.category_sort())
            .finish()
    }
}

impl SortSettings {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        SortSettings { store }
    }

    /// Settings over a fresh in-memory store.
    pub fn in_memory() -> Self {
        SortSettings::new(Arc::new(MemoryPreferences::new()))
    }

    pub fn item_sort(&self) -> ItemSort {
        self.store
            .get_int(ITEM_SORT_KEY)
            .map(ItemSort::from_index)
            .unwrap_or_default()
    }

    pub fn category_sort(&self) -> CategorySort {
        self.store
            .get_int(CATEGORY_SORT_KEY)
            .map(CategorySort::from_index)
            .unwrap_or_default()
    }

    pub fn set_item_sort(&self, sort: ItemSort) -> Result<(), ConfigError> {
        self.store.set_int(ITEM_SORT_KEY, sort.as_index())
    }

    pub fn set_category_sort(&self, sort: CategorySort) -> Result<(), ConfigError> {
        self.store.set_int(CATEGORY_SORT_KEY, sort.as_index())
    }

    /// Item query order for the current modes.
    pub fn item_ordering(&self) -> ItemOrdering {
        ItemOrdering::select(self.item_sort(), self.category_sort())
    }

    pub fn category_ordering(&self) -> CategoryOrdering {
        CategoryOrdering::from(self.category_sort())
    }

    /// True when categories may be dragged into a new order.
    pub fn can_reorder(&self) -> bool {
        self.category_sort().can_reorder()
    }
}

/// Opens the preference store named by the config, or an in-memory one.
pub fn open_store(path: Option<&Path>) -> Result<Arc<dyn PreferenceStore>, ConfigError> {
    match path {
        Some(path) => Ok(Arc::new(TomlPreferences::open(path)?)),
        None => {
            warn!("No preferences file configured, sort modes will not persist");
            Ok(Arc::new(MemoryPreferences::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("shoplist-prefs-{}.toml", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_defaults() {
        let settings = SortSettings::in_memory();

        assert_eq!(settings.item_sort(), ItemSort::ByCategory);
        assert_eq!(settings.category_sort(), CategorySort::Custom);
        assert_eq!(settings.item_ordering(), ItemOrdering::ByCategoryRank);
        assert!(settings.can_reorder());
    }

    #[test]
    fn test_orderings_follow_modes() {
        let settings = SortSettings::in_memory();

        settings.set_category_sort(CategorySort::Alphabetical).unwrap();
        assert_eq!(settings.item_ordering(), ItemOrdering::ByCategoryName);
        assert_eq!(settings.category_ordering(), CategoryOrdering::ByName);
        assert!(!settings.can_reorder());

        settings.set_item_sort(ItemSort::ByName).unwrap();
        assert_eq!(settings.item_ordering(), ItemOrdering::ByName);
    }

    #[test]
    fn test_toml_preferences_persist() {
        let path = temp_path();

        let settings = SortSettings::new(Arc::new(TomlPreferences::open(&path).unwrap()));
        settings.set_item_sort(ItemSort::ByName).unwrap();
        settings.set_category_sort(CategorySort::Alphabetical).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("sortBy = 1"));
        assert!(text.contains("catSortBy = 1"));

        let reopened = SortSettings::new(Arc::new(TomlPreferences::open(&path).unwrap()));
        assert_eq!(reopened.item_sort(), ItemSort::ByName);
        assert_eq!(reopened.category_sort(), CategorySort::Alphabetical);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_unknown_index_falls_back() {
        let store = Arc::new(MemoryPreferences::new());
        store.set_int(ITEM_SORT_KEY, 7).unwrap();

        let settings = SortSettings::new(store);
        assert_eq!(settings.item_sort(), ItemSort::ByCategory);
    }
}
