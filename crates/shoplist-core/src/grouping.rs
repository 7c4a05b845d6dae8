//! # Grouped List Change Notifier
//!
//! Item lists sorted by category show the category header only on the first
//! row of each group. When a row is inserted or removed, the row below it may
//! have to gain or lose its header, which a plain positional diff misses.
//!
//! ```text
//! before          after insert "Butter"     refresh
//! ─────────────   ──────────────────────    ─────────────────────────
//! [Dairy] Milk    [Dairy] Butter   (new)    row 1: Milk loses header
//!         Eggs            Milk
//!                         Eggs
//! ```
//!
//! One notifier serves every list type through [`ListRow`].

use crate::types::ListRow;

/// Which rows a UI should re-render after a list change, on top of the
/// inserted/removed row itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRefresh {
    None,
    All,
    Row(usize),
}

/// Tracks pending sort switches and computes [`RowRefresh`] hints.
#[derive(Debug, Clone, Default)]
pub struct GroupedChangeNotifier {
    full_refresh_pending: bool,
}

impl GroupedChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next change comes from a different ordering; refresh everything.
    pub fn sort_changing(&mut self) {
        self.full_refresh_pending = true;
    }

    pub fn is_full_refresh_pending(&self) -> bool {
        self.full_refresh_pending
    }

    /// Computes the hint for `previous` → `current`.
    ///
    /// `grouped` is false when the list is ordered by name, where no headers
    /// are shown and positional updates are enough.
    pub fn on_list_changed<T>(&mut self, previous: &[T], current: &[T], grouped: bool) -> RowRefresh
    where
        T: ListRow + PartialEq,
    {
        if self.full_refresh_pending {
            self.full_refresh_pending = false;
            return if current.is_empty() {
                RowRefresh::None
            } else {
                RowRefresh::All
            };
        }

        if current.is_empty() || !grouped {
            return RowRefresh::None;
        }

        if current.len() > previous.len() {
            first_difference(current, previous)
                .map(|index| row_below(current, index, 1))
                .unwrap_or(RowRefresh::None)
        } else if current.len() < previous.len() {
            first_difference(previous, current)
                .map(|index| row_below(previous, index, 0))
                .unwrap_or(RowRefresh::None)
        } else {
            RowRefresh::All
        }
    }
}

/// Whether the row at `index` shows its group header.
pub fn header_visible<T: ListRow>(rows: &[T], index: usize, grouped: bool) -> bool {
    if !grouped || index >= rows.len() {
        return false;
    }
    index == 0 || rows[index - 1].group() != rows[index].group()
}

/// First index of `longer` whose row is not at the same index in `shorter`.
fn first_difference<T: PartialEq>(longer: &[T], shorter: &[T]) -> Option<usize> {
    (0..longer.len()).find(|&index| shorter.get(index) != Some(&longer[index]))
}

/// `offset` is 1 after an insert (the neighbour moved down) and 0 after a
/// removal (the neighbour took the removed row's index).
fn row_below<T: ListRow>(rows: &[T], index: usize, offset: usize) -> RowRefresh {
    if index + 1 >= rows.len() {
        return RowRefresh::None;
    }
    let row = &rows[index];
    let heads_group = index == 0 || rows[index - 1].group() != row.group();
    if heads_group && rows[index + 1].group() == row.group() {
        RowRefresh::Row(index + offset)
    } else {
        RowRefresh::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ShoppingItem;

    fn item(name: &str, category: &str) -> ShoppingItem {
        ShoppingItem::new(name, category, "1")
    }

    #[test]
    fn test_insert_at_group_head_refreshes_old_head() {
        let milk = item("Milk", "Dairy");
        let eggs = item("Eggs", "Dairy");
        let butter = item("Butter", "Dairy");
        let previous = vec![milk.clone(), eggs.clone()];
        let current = vec![butter, milk, eggs];

        let mut notifier = GroupedChangeNotifier::new();
        assert_eq!(notifier.on_list_changed(&previous, &current, true), RowRefresh::Row(1));
    }

    #[test]
    fn test_remove_group_head_refreshes_next_row() {
        let milk = item("Milk", "Dairy");
        let eggs = item("Eggs", "Dairy");
        let previous = vec![milk, eggs.clone()];
        let current = vec![eggs];

        let mut notifier = GroupedChangeNotifier::new();
        assert_eq!(notifier.on_list_changed(&previous, &current, true), RowRefresh::Row(0));
    }

    #[test]
    fn test_insert_mid_group_needs_nothing() {
        let bread = item("Bread", "Bakery");
        let milk = item("Milk", "Dairy");
        let yogurt = item("Yogurt", "Dairy");
        let previous = vec![bread.clone(), milk.clone()];
        let current = vec![bread, milk, yogurt];

        let mut notifier = GroupedChangeNotifier::new();
        assert_eq!(notifier.on_list_changed(&previous, &current, true), RowRefresh::None);
    }

    #[test]
    fn test_same_size_is_full_refresh() {
        let previous = vec![item("Milk", "Dairy")];
        let mut updated = previous[0].clone();
        updated.quantity = "3".to_string();

        let mut notifier = GroupedChangeNotifier::new();
        assert_eq!(notifier.on_list_changed(&previous, &[updated], true), RowRefresh::All);
    }

    #[test]
    fn test_sort_switch_forces_one_full_refresh() {
        let rows = vec![item("Milk", "Dairy"), item("Bread", "Bakery")];
        let fewer = vec![rows[0].clone()];

        let mut notifier = GroupedChangeNotifier::new();
        notifier.sort_changing();
        assert_eq!(notifier.on_list_changed(&fewer, &rows, false), RowRefresh::All);
        assert!(!notifier.is_full_refresh_pending());
        assert_eq!(notifier.on_list_changed(&rows, &fewer, false), RowRefresh::None);
    }

    #[test]
    fn test_header_visibility() {
        let rows = vec![item("Eggs", "Dairy"), item("Milk", "Dairy"), item("Bread", "Bakery")];

        assert!(header_visible(&rows, 0, true));
        assert!(!header_visible(&rows, 1, true));
        assert!(header_visible(&rows, 2, true));
        assert!(!header_visible(&rows, 0, false));
    }
}
