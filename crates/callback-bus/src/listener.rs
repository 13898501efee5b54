//! # Listeners
//!
//! Synchronous callbacks attached to a role stream, and the guard that
//! detaches them.

use callback_types::{CallbackEvent, RoleId};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Listener callback signature.
pub type ListenerFn = dyn Fn(&CallbackEvent) + Send + Sync;

/// Identifier of an attached listener, unique per stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

struct ListenerEntry {
    id: ListenerId,
    callback: Arc<ListenerFn>,
}

/// Listener list owned by one stream.
pub(crate) struct ListenerTable {
    role: RoleId,
    next_id: AtomicU64,
    entries: RwLock<Vec<ListenerEntry>>,
}

impl ListenerTable {
    pub(crate) fn new(role: RoleId) -> Self {
        Self {
            role,
            next_id: AtomicU64::new(1),
            entries: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn insert(&self, callback: Arc<ListenerFn>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push(ListenerEntry { id, callback });
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }

    pub(crate) fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let removed = entries.len();
        entries.clear();
        removed
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Callbacks in attachment order. The lock is released before any of
    /// them run, so listeners may attach or detach from inside a callback.
    pub(crate) fn snapshot(&self) -> Vec<Arc<ListenerFn>> {
        self.entries
            .read()
            .iter()
            .map(|entry| Arc::clone(&entry.callback))
            .collect()
    }
}

/// Scope guard for an attached listener.
///
/// Dropping the guard detaches the listener. This also happens when a test
/// panics on a failed assertion while the guard is alive.
#[must_use = "dropping the guard detaches the listener immediately"]
pub struct ListenerGuard {
    table: Weak<ListenerTable>,
    id: ListenerId,
    armed: bool,
}

impl ListenerGuard {
    pub(crate) fn new(table: &Arc<ListenerTable>, id: ListenerId) -> Self {
        Self {
            table: Arc::downgrade(table),
            id,
            armed: true,
        }
    }

    /// Identifier of the guarded listener.
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Whether the listener is still attached to a live stream.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.table.upgrade().is_some_and(|table| {
            table
                .entries
                .read()
                .iter()
                .any(|entry| entry.id == self.id)
        })
    }

    /// Detach now. Returns `false` if it was already gone (for example after
    /// `remove_all_listeners`).
    pub fn detach(mut self) -> bool {
        self.armed = false;
        self.remove()
    }

    /// Keep the listener attached for the lifetime of the stream.
    pub fn leak(mut self) -> ListenerId {
        self.armed = false;
        self.id
    }

    fn remove(&self) -> bool {
        let Some(table) = self.table.upgrade() else {
            return false;
        };
        let removed = table.remove(self.id);
        if removed {
            debug!(role = %table.role, listener = %self.id, "Listener detached");
        }
        removed
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if self.armed {
            self.remove();
        }
    }
}

impl fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerGuard")
            .field("id", &self.id)
            .field("armed", &self.armed)
            .finish()
    }
}
