//! # Projection
//!
//! Forwards one live query at a time to the UI, tagging every delivery with
//! the rows it should re-render.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Inactive ──attach(src)──► Attached { generation: g, task }            │
//! │      ▲                          │                                       │
//! │      │ detach()                 │ attach(src')                          │
//! │      │ (abort task, g += 1)     ▼ (detach, then attach)                 │
//! │      └──────────────────── Attached { generation: g + 1, task' }        │
//! │                                                                         │
//! │   task: loop {                                                          │
//! │       rows = src.next().await                                           │
//! │       refresh = GroupedChangeNotifier::on_list_changed(prev, rows)      │
//! │       if generation still g: publish Snapshot { rows, refresh }         │
//! │   }                                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The forwarding task owns the live query, so aborting the task also stops
//! the query. The generation check runs inside the watch channel's write
//! lock, which covers a delivery already in flight when the abort lands.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use shoplist_core::{GroupedChangeNotifier, ListRow, RowRefresh};
use shoplist_db::LiveQuery;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// One delivery to the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub rows: Vec<T>,
    pub refresh: RowRefresh,
    /// Generation of the source that produced it. Zero before any attach.
    pub generation: u64,
}

enum ProjectionState {
    Inactive,
    Attached { generation: u64, task: JoinHandle<()> },
}

/// The last attached source wins.
pub struct Projection<T> {
    state: Mutex<ProjectionState>,
    generation: Arc<AtomicU64>,
    output: watch::Sender<Snapshot<T>>,
}

impl<T> Projection<T>
where
    T: ListRow + PartialEq + Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        let (output, _) = watch::channel(Snapshot {
            rows: Vec::new(),
            refresh: RowRefresh::None,
            generation: 0,
        });

        Projection {
            state: Mutex::new(ProjectionState::Inactive),
            generation: Arc::new(AtomicU64::new(1)),
            output,
        }
    }

    /// Switches to `source`. The first delivery from it asks for a full
    /// refresh. `grouped` says whether rows show category headers.
    pub fn attach(&self, mut source: LiveQuery<T>, grouped: bool) {
        let mut state = self.lock();
        Self::detach_locked(&mut state, &self.generation);

        let generation = self.generation.load(Ordering::SeqCst);
        let current = Arc::clone(&self.generation);
        let output = self.output.clone();

        let task = tokio::spawn(async move {
            let mut notifier = GroupedChangeNotifier::new();
            notifier.sort_changing();

            let mut previous: Vec<T> = Vec::new();
            let mut rows = source.current();
            loop {
                let refresh = notifier.on_list_changed(&previous, &rows, grouped);
                let snapshot = Snapshot {
                    rows: rows.clone(),
                    refresh,
                    generation,
                };
                // Checked under the channel's write lock, so a newer source
                // can never be overwritten by this one.
                let published = output.send_if_modified(|slot| {
                    if current.load(Ordering::SeqCst) != generation {
                        return false;
                    }
                    *slot = snapshot;
                    true
                });
                if !published {
                    break;
                }

                previous = rows;
                rows = match source.next().await {
                    Some(fresh) => fresh,
                    None => break,
                };
            }
        });

        debug!(generation, grouped, "Projection attached");
        *state = ProjectionState::Attached { generation, task };
    }

    /// Stops forwarding. The last snapshot stays readable.
    pub fn detach(&self) {
        let mut state = self.lock();
        Self::detach_locked(&mut state, &self.generation);
    }

    pub fn is_attached(&self) -> bool {
        matches!(*self.lock(), ProjectionState::Attached { .. })
    }

    /// Generation of the attached source, if any.
    pub fn generation(&self) -> Option<u64> {
        match &*self.lock() {
            ProjectionState::Attached { generation, .. } => Some(*generation),
            ProjectionState::Inactive => None,
        }
    }

    pub fn current(&self) -> Snapshot<T> {
        self.output.borrow().clone()
    }

    /// Receiver for UI observers.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.output.subscribe()
    }

    fn detach_locked(state: &mut ProjectionState, counter: &AtomicU64) {
        if let ProjectionState::Attached { task, generation } =
            std::mem::replace(state, ProjectionState::Inactive)
        {
            task.abort();
            counter.fetch_add(1, Ordering::SeqCst);
            debug!(generation, "Projection detached");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProjectionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T> Default for Projection<T>
where
    T: ListRow + PartialEq + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Projection<T> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|e| e.into_inner());
        if let ProjectionState::Attached { task, .. } = state {
            task.abort();
        }
    }
}
