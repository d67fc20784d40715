//! Bounded, subscribable log store.
//!
//! [`LogStore`] is the single source of truth for observed requests. It holds
//! at most `capacity` entries, newest first, and notifies subscribers after
//! every effective mutation.
//!
//! Two notification paths exist:
//! - synchronous callbacks registered with [`LogStore::subscribe`], invoked
//!   (without payload) on the mutating thread after the store lock is
//!   released, so a callback can read [`LogStore::snapshot`] and sees the
//!   post-mutation state;
//! - a `tokio::sync::broadcast` stream of [`StoreEvent`]s from
//!   [`LogStore::events`] for async consumers. Receivers that fall behind
//!   get `Lagged` and miss events.
//!
//! Reads go through copy-on-write snapshots: entries live in an
//! `Arc<Vec<LogEntry>>` that mutations update with `Arc::make_mut`, so a
//! snapshot handed out earlier never changes underneath its holder.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::defaults;
use crate::models::{EntryState, LogEntry, LogEntryPatch};

/// Immutable view of the store contents, newest first.
pub type Snapshot = Arc<Vec<LogEntry>>;

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Change notification for async consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum StoreEvent {
    /// A pending entry was recorded.
    Appended { id: Uuid },
    /// An entry moved to a terminal state.
    Updated { id: Uuid, state: EntryState },
    /// All entries were removed.
    Cleared,
}

struct StoreState {
    entries: Snapshot,
    paused: bool,
}

struct Inner {
    capacity: usize,
    state: Mutex<StoreState>,
    subscribers: Mutex<Vec<(u64, Callback)>>,
    next_subscriber: AtomicU64,
    events: broadcast::Sender<StoreEvent>,
}

/// Handle to a log store. Clones share the same underlying store.
#[derive(Clone)]
pub struct LogStore {
    inner: Arc<Inner>,
}

impl Default for LogStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for LogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStore")
            .field("capacity", &self.inner.capacity)
            .field("len", &self.len())
            .field("paused", &self.is_paused())
            .finish()
    }
}

impl LogStore {
    /// Create a store keeping at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(defaults::EVENT_BUFFER);
        Self {
            inner: Arc::new(Inner {
                capacity: capacity.max(1),
                state: Mutex::new(StoreState {
                    entries: Arc::new(Vec::new()),
                    paused: false,
                }),
                subscribers: Mutex::new(Vec::new()),
                next_subscriber: AtomicU64::new(0),
                events,
            }),
        }
    }

    /// Create a store with the default capacity of 100 entries.
    pub fn with_defaults() -> Self {
        Self::new(defaults::LOG_CAPACITY)
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Insert a new entry at the front.
    ///
    /// Dropped entirely while paused. Entries beyond the capacity are
    /// evicted oldest first. Returns whether the entry was recorded.
    pub fn append(&self, entry: LogEntry) -> bool {
        let id = entry.id;
        {
            let mut state = self.lock_state();
            if state.paused {
                debug!(
                    subsystem = "store",
                    component = "log_store",
                    entry_id = %id,
                    "Store paused, entry dropped"
                );
                return false;
            }
            let entries = Arc::make_mut(&mut state.entries);
            entries.insert(0, entry);
            entries.truncate(self.inner.capacity);
        }
        self.notify(StoreEvent::Appended { id });
        true
    }

    /// Merge `patch` into the entry with `id`.
    ///
    /// A missing entry (never recorded, or evicted) or one that is already
    /// terminal makes this a silent no-op that notifies nobody. Returns
    /// whether an entry changed.
    pub fn update(&self, id: Uuid, patch: LogEntryPatch) -> bool {
        let new_state = {
            let mut state = self.lock_state();
            let Some(pos) = state.entries.iter().position(|e| e.id == id) else {
                trace!(
                    subsystem = "store",
                    component = "log_store",
                    entry_id = %id,
                    "Update for unknown entry ignored"
                );
                return false;
            };
            if state.entries[pos].state.is_terminal() {
                return false;
            }
            let entry = &mut Arc::make_mut(&mut state.entries)[pos];
            if !entry.apply(&patch) {
                return false;
            }
            entry.state
        };
        self.notify(StoreEvent::Updated {
            id,
            state: new_state,
        });
        true
    }

    /// Remove every entry. Always notifies.
    pub fn clear_all(&self) {
        {
            let mut state = self.lock_state();
            state.entries = Arc::new(Vec::new());
        }
        info!(subsystem = "store", component = "log_store", "Log store cleared");
        self.notify(StoreEvent::Cleared);
    }

    /// Flip the pause flag and return its new value.
    ///
    /// Pausing only stops new entries; in-flight entries still complete.
    pub fn toggle_pause(&self) -> bool {
        let paused = {
            let mut state = self.lock_state();
            state.paused = !state.paused;
            state.paused
        };
        info!(subsystem = "store", component = "log_store", paused, "Pause toggled");
        paused
    }

    pub fn set_paused(&self, paused: bool) {
        self.lock_state().paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.lock_state().paused
    }

    /// Current contents, newest first. Later mutations do not affect it.
    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.lock_state().entries)
    }

    pub fn get(&self, id: Uuid) -> Option<LogEntry> {
        self.lock_state().entries.iter().find(|e| e.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a callback invoked after every append, update and clear.
    ///
    /// The registration lives until the returned [`Subscription`] is
    /// dropped or [`Subscription::unsubscribe`] is called.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.lock_subscribers().push((id, Arc::new(callback)));
        Subscription {
            store: Arc::downgrade(&self.inner),
            id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().len()
    }

    /// Subscribe to the broadcast stream of store events.
    pub fn events(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.events.subscribe()
    }

    fn notify(&self, event: StoreEvent) {
        // Clone the callback list so callbacks may (un)subscribe re-entrantly.
        let callbacks: Vec<Callback> = self
            .lock_subscribers()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        trace!(
            subsystem = "store",
            component = "log_store",
            subscriber_count = callbacks.len(),
            ?event,
            "Notifying subscribers"
        );
        for callback in callbacks {
            callback();
        }
        let _ = self.inner.events.send(event);
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        // Callbacks run outside this lock and every method mutates in one
        // step, so a poisoned state is still consistent.
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Vec<(u64, Callback)>> {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Registration handle returned by [`LogStore::subscribe`].
#[must_use = "dropping a Subscription unsubscribes the callback"]
pub struct Subscription {
    store: Weak<Inner>,
    id: u64,
}

impl Subscription {
    /// Remove the callback from the store.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.store.upgrade() {
            let mut subscribers = inner
                .subscribers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}
