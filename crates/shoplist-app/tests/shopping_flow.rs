//! End-to-end flows across the three screens, through `ShoppingApp`.

use std::time::Duration;

use shoplist_app::{AppConfig, ErrorCode, ShoppingApp, Snapshot, ToggleNotice};
use shoplist_core::{CategorySort, ItemSort, ListEntry, RowRefresh, ShoppingItem};
use tokio::sync::watch;

async fn app() -> ShoppingApp {
    ShoppingApp::in_memory(AppConfig::default()).await.unwrap()
}

/// Waits until the projection publishes rows matching `pred`.
async fn wait_for<T, F>(rx: &mut watch::Receiver<Snapshot<T>>, pred: F) -> Snapshot<T>
where
    T: Clone,
    F: Fn(&Snapshot<T>) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if pred(&*snapshot) {
                    return (*snapshot).clone();
                }
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .unwrap()
}

fn names(items: &[ShoppingItem]) -> Vec<&str> {
    items.iter().map(|i| i.name.as_str()).collect()
}

#[tokio::test]
async fn test_fresh_database_is_seeded() {
    let app = app().await;

    let categories = app.categories().all_categories().await.unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].category_id, "Misc.");
    assert_eq!(categories[0].rank, 1);

    // seeding runs only on an empty database
    assert_eq!(app.seed_if_empty().await.unwrap(), 0);
}

#[tokio::test]
async fn test_live_list_follows_writes_and_sorting() {
    let app = app().await;
    let list = app.shopping_list();
    let mut rx = list.items();
    list.open().await.unwrap();

    list.create_or_update(None, "Milk", "Dairy", "2").await.unwrap();
    list.create_or_update(None, "Bread", "Bakery", "1").await.unwrap();
    let snapshot = wait_for(&mut rx, |s| s.rows.len() == 2).await;
    // Misc. (seeded) ranks first, then Dairy, then Bakery
    assert_eq!(names(&snapshot.rows), vec!["Milk", "Bread"]);

    list.update_sorting(ItemSort::ByName).await.unwrap();
    let snapshot = wait_for(&mut rx, |s| names(&s.rows) == vec!["Bread", "Milk"]).await;
    assert_eq!(snapshot.refresh, RowRefresh::All);
}

#[tokio::test]
async fn test_category_move_reorders_grouped_items() {
    let app = app().await;
    let list = app.shopping_list();
    list.create_or_update(None, "Milk", "Dairy", "2").await.unwrap();
    list.create_or_update(None, "Bread", "Bakery", "1").await.unwrap();

    let mut rx = list.items();
    list.open().await.unwrap();
    wait_for(&mut rx, |s| names(&s.rows) == vec!["Milk", "Bread"]).await;

    let cats = app.database().categories();
    let bakery = cats.get_by_name("Bakery").await.unwrap().unwrap();
    let dairy = cats.get_by_name("Dairy").await.unwrap().unwrap();
    assert!(app.categories().move_category(&bakery, &dairy).await.unwrap());

    wait_for(&mut rx, |s| names(&s.rows) == vec!["Bread", "Milk"]).await;
}

#[tokio::test]
async fn test_usual_toggle_shows_on_shopping_list() {
    let app = app().await;
    let usual = app.usual_list();
    usual.open().await.unwrap();
    let list = app.shopping_list();
    let mut rx = list.items();
    list.open().await.unwrap();

    usual.create_or_update(None, "Eggs", "Dairy", "12").await.unwrap();
    let eggs = app
        .database()
        .usual_items()
        .find("Eggs", "Dairy")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(usual.toggle(&eggs).await.unwrap(), ToggleNotice::Added);

    let snapshot = wait_for(&mut rx, |s| s.rows.len() == 1).await;
    assert_eq!(snapshot.rows[0].quantity, "12");

    // Deleting from the shopping list clears the usual flag
    let mut usual_rx = usual.items();
    list.delete(&snapshot.rows[0]).await.unwrap();
    wait_for(&mut usual_rx, |s| s.rows.len() == 1 && !s.rows[0].in_shopping_list).await;
}

#[tokio::test]
async fn test_delete_entry_dispatch() {
    let app = app().await;
    app.shopping_list()
        .create_or_update(None, "Milk", "Dairy", "1")
        .await
        .unwrap();
    app.usual_list()
        .create_or_update(None, "Bread", "Bakery", "1")
        .await
        .unwrap();

    let db = app.database();
    let milk = db.shopping_items().find("Milk", "Dairy").await.unwrap().unwrap();
    let bread = db.usual_items().find("Bread", "Bakery").await.unwrap().unwrap();
    let dairy = db.categories().get_by_name("Dairy").await.unwrap().unwrap();

    // still referenced by Milk
    let err = app
        .delete_entry(&ListEntry::Category(dairy.clone()))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ConstraintViolation);
    assert!(!app.categories().can_undo());

    app.delete_entry(&ListEntry::ShoppingItem(milk)).await.unwrap();
    app.delete_entry(&ListEntry::UsualItem(bread)).await.unwrap();
    app.delete_entry(&ListEntry::Category(dairy)).await.unwrap();

    assert!(app.shopping_list().can_undo());
    assert!(app.usual_list().can_undo());
    assert!(app.categories().can_undo());

    // Dairy comes back first: Milk needs it
    assert!(app.categories().undo().await.unwrap().is_some());
    assert!(app.shopping_list().undo().await.unwrap());
    assert!(app.usual_list().undo().await.unwrap());
    assert_eq!(db.shopping_items().count().await.unwrap(), 1);
    assert_eq!(db.usual_items().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_alphabetical_categories_block_reorder() {
    let app = app().await;
    app.categories().create_or_update(None, "Dairy").await.unwrap();

    app.categories()
        .update_sorting(CategorySort::Alphabetical)
        .await
        .unwrap();
    assert!(!app.categories().can_reorder());
    assert!(!app.categories().move_rank(1, 2).await.unwrap());

    // The shopping list follows the category mode too
    assert_eq!(
        app.settings().item_ordering(),
        shoplist_core::ItemOrdering::ByCategoryName
    );
}
