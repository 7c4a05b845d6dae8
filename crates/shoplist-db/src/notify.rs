//! # Change Notification & Live Queries
//!
//! Every committed write publishes the set of tables it touched. A live query
//! re-runs its SQL when one of its tables shows up and pushes the fresh rows to
//! its observers.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  repository write ──commit──► ChangeNotifier::notify(TableSet)          │
//! │                                      │ broadcast                        │
//! │                  ┌───────────────────┼───────────────────┐              │
//! │                  ▼                   ▼                   ▼              │
//! │           LiveQuery<Category>  LiveQuery<ShoppingItem>  ...             │
//! │           (relevant? re-run)   (relevant? re-run)                       │
//! │                  │                   │                                  │
//! │                  ▼ watch             ▼ watch                            │
//! │              observers            observers                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A live query subscribes *before* its first fetch, so a write that commits
//! between the two is never missed. If the subscriber lags behind the channel
//! it simply re-runs once.

use std::future::Future;
use std::ops::BitOr;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::DbResult;

// =============================================================================
// Table Set
// =============================================================================

/// Bit set of the three tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableSet(u8);

impl TableSet {
    pub const NONE: TableSet = TableSet(0);
    pub const CATEGORIES: TableSet = TableSet(1);
    pub const SHOPPING_ITEMS: TableSet = TableSet(1 << 1);
    pub const USUAL_ITEMS: TableSet = TableSet(1 << 2);
    pub const ALL: TableSet = TableSet(0b111);

    pub fn intersects(&self, other: TableSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for TableSet {
    type Output = TableSet;

    fn bitor(self, rhs: TableSet) -> TableSet {
        TableSet(self.0 | rhs.0)
    }
}

// =============================================================================
// Change Notifier
// =============================================================================

/// Fan-out of committed table changes.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<TableSet>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        ChangeNotifier { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TableSet> {
        self.tx.subscribe()
    }

    /// Publishes a committed change. Call only after the commit succeeded.
    pub fn notify(&self, tables: TableSet) {
        if tables.is_empty() {
            return;
        }
        // No live query attached is fine
        let receivers = self.tx.send(tables).unwrap_or(0);
        debug!(?tables, receivers, "Tables changed");
    }
}

// =============================================================================
// Live Query
// =============================================================================

/// A query result kept current by a background task.
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct LiveQuery<T> {
    rows: watch::Receiver<Vec<T>>,
    task: JoinHandle<()>,
}

impl<T> LiveQuery<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Runs `fetch` once, then again after every change touching `tables`.
    pub async fn spawn<F, Fut>(notifier: &ChangeNotifier, tables: TableSet, fetch: F) -> DbResult<Self>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DbResult<Vec<T>>> + Send + 'static,
    {
        let mut changes = notifier.subscribe();
        let initial = fetch().await?;
        let (tx, rows) = watch::channel(initial);

        let task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(changed) if changed.intersects(tables) => {}
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Live query lagged, re-running");
                    }
                    Err(RecvError::Closed) => break,
                }

                match fetch().await {
                    Ok(fresh) => {
                        if tx.send(fresh).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "Live query refresh failed"),
                }
            }
        });

        Ok(LiveQuery { rows, task })
    }

    /// Latest rows.
    pub fn current(&self) -> Vec<T> {
        self.rows.borrow().clone()
    }

    /// A receiver observers can await on. Starts with the current rows seen.
    pub fn subscribe(&self) -> watch::Receiver<Vec<T>> {
        let mut rx = self.rows.clone();
        rx.mark_unchanged();
        rx
    }

    /// Waits for the next refresh and returns it. `None` once the task ended.
    pub async fn next(&mut self) -> Option<Vec<T>> {
        self.rows.changed().await.ok()?;
        Some(self.rows.borrow_and_update().clone())
    }
}

impl<T> Drop for LiveQuery<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_table_set() {
        let items = TableSet::SHOPPING_ITEMS | TableSet::USUAL_ITEMS;

        assert!(items.intersects(TableSet::USUAL_ITEMS));
        assert!(!items.intersects(TableSet::CATEGORIES));
        assert!(TableSet::ALL.intersects(TableSet::CATEGORIES));
        assert!(TableSet::NONE.is_empty());
    }

    #[tokio::test]
    async fn test_live_query_reruns_on_relevant_change() {
        let notifier = ChangeNotifier::new(8);
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();

        let mut live = LiveQuery::spawn(&notifier, TableSet::CATEGORIES, move || {
            let counter = counter.clone();
            async move { Ok(vec![counter.fetch_add(1, Ordering::SeqCst)]) }
        })
        .await
        .unwrap();
        assert_eq!(live.current(), vec![0]);

        notifier.notify(TableSet::USUAL_ITEMS);
        notifier.notify(TableSet::CATEGORIES);

        let rows = tokio::time::timeout(Duration::from_secs(2), live.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rows, vec![1]);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
