//! # Export
//!
//! Plain-text rendering of the uncarted shopping list, handed to whatever
//! composes the outgoing message.
//!
//! ```text
//! Shopping List:          Shopping List:
//! ** Dairy **             Eggs x12
//! Milk x2                 Milk x2
//! Eggs x12                Bread x1
//! ** Bakery **
//! Bread x1
//!   (ByCategory)            (ByName)
//! ```
//!
//! Items keep the order they arrive in. Grouping collects each category's
//! items under the header of its first appearance.

use crate::types::{ItemSort, ShoppingItem};

/// Renders `items` as export text, or `None` when there is nothing to send.
pub fn shape_export(items: &[ShoppingItem], item_sort: ItemSort, header: &str) -> Option<String> {
    if items.is_empty() {
        return None;
    }

    let mut text = String::new();
    push_line(&mut text, header);

    match item_sort {
        ItemSort::ByCategory => {
            for (category, group) in group_by_first_appearance(items) {
                push_line(&mut text, &format!("** {} **", category));
                for item in group {
                    push_line(&mut text, &item_line(item));
                }
            }
        }
        ItemSort::ByName => {
            for item in items {
                push_line(&mut text, &item_line(item));
            }
        }
    }

    Some(text)
}

fn item_line(item: &ShoppingItem) -> String {
    format!("{} x{}", item.name, item.quantity)
}

fn push_line(text: &mut String, line: &str) {
    text.push_str(line);
    text.push('\n');
}

fn group_by_first_appearance(items: &[ShoppingItem]) -> Vec<(&str, Vec<&ShoppingItem>)> {
    let mut groups: Vec<(&str, Vec<&ShoppingItem>)> = Vec::new();
    for item in items {
        match groups.iter_mut().find(|(category, _)| *category == item.category) {
            Some((_, group)) => group.push(item),
            None => groups.push((item.category.as_str(), vec![item])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EXPORT_HEADER;

    fn item(name: &str, category: &str, quantity: &str) -> ShoppingItem {
        ShoppingItem::new(name, category, quantity)
    }

    #[test]
    fn test_export_by_category() {
        let items = vec![item("Milk", "Dairy", "2"), item("Eggs", "Dairy", "12")];

        let text = shape_export(&items, ItemSort::ByCategory, EXPORT_HEADER).unwrap();

        assert_eq!(text, "Shopping List:\n** Dairy **\nMilk x2\nEggs x12\n");
    }

    #[test]
    fn test_export_groups_by_first_appearance() {
        let items = vec![
            item("Milk", "Dairy", "2"),
            item("Bread", "Bakery", "1"),
            item("Butter", "Dairy", "250 g"),
        ];

        let text = shape_export(&items, ItemSort::ByCategory, "List").unwrap();

        assert_eq!(
            text,
            "List\n** Dairy **\nMilk x2\nButter x250 g\n** Bakery **\nBread x1\n"
        );
    }

    #[test]
    fn test_export_flat_by_name() {
        let items = vec![item("Bread", "Bakery", "1"), item("Milk", "Dairy", "2")];

        let text = shape_export(&items, ItemSort::ByName, EXPORT_HEADER).unwrap();

        assert_eq!(text, "Shopping List:\nBread x1\nMilk x2\n");
    }

    #[test]
    fn test_export_empty_list() {
        assert_eq!(shape_export(&[], ItemSort::ByCategory, EXPORT_HEADER), None);
    }
}
