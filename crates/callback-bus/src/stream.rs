//! # Role Event Stream
//!
//! The publishing side: one stream per role, owning its listener list.

use crate::filter::CallbackFilter;
use crate::listener::{ListenerGuard, ListenerTable};
use crate::subscriber::{EventStream, Subscription};
use crate::{BusError, DEFAULT_CHANNEL_CAPACITY};
use callback_types::{CallbackEvent, RoleId};
use harness_telemetry::metrics;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, trace, warn};

/// Trait for publishing callback events.
///
/// Receivers depend on this rather than on the concrete stream so tests can
/// publish synthetic deliveries without HTTP.
pub trait EventPublisher: Send + Sync {
    /// Publish an event.
    ///
    /// # Returns
    ///
    /// The number of listeners and taps that were handed the event.
    fn publish(&self, event: CallbackEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// Publish/subscribe channel for one role.
///
/// Listeners run synchronously inside [`EventPublisher::publish`], in the
/// order they were attached. Tap subscribers get the event through a
/// `tokio::sync::broadcast` channel afterwards.
pub struct RoleEventStream {
    /// Role this stream carries deliveries for.
    role: RoleId,

    /// Synchronous listeners (correlators).
    listeners: Arc<ListenerTable>,

    /// Broadcast sender for taps.
    sender: broadcast::Sender<CallbackEvent>,

    /// Total events published.
    events_published: AtomicU64,

    /// Tap channel capacity.
    capacity: usize,
}

impl RoleEventStream {
    /// Create a stream with default tap capacity.
    #[must_use]
    pub fn new(role: RoleId) -> Self {
        Self::with_capacity(role, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a stream with a specific tap capacity.
    #[must_use]
    pub fn with_capacity(role: RoleId, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            role,
            listeners: Arc::new(ListenerTable::new(role)),
            sender,
            events_published: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Role of this stream.
    #[must_use]
    pub fn role(&self) -> RoleId {
        self.role
    }

    /// Attach a synchronous listener.
    ///
    /// The listener sees only events published after this call returns.
    pub fn attach<F>(&self, listener: F) -> ListenerGuard
    where
        F: Fn(&CallbackEvent) + Send + Sync + 'static,
    {
        let id = self.listeners.insert(Arc::new(listener));
        debug!(role = %self.role, listener = %id, "Listener attached");
        ListenerGuard::new(&self.listeners, id)
    }

    /// Detach every listener on this stream. Returns how many were removed.
    pub fn remove_all_listeners(&self) -> usize {
        let removed = self.listeners.clear();
        debug!(role = %self.role, removed = removed, "All listeners removed");
        removed
    }

    /// Publish, rejecting events tagged for a different role.
    pub fn try_publish(&self, event: CallbackEvent) -> Result<usize, BusError> {
        if event.role != self.role {
            return Err(BusError::RoleMismatch {
                expected: self.role,
                actual: event.role,
            });
        }
        Ok(self.dispatch(event))
    }

    /// Subscribe a tap to events matching a filter.
    #[must_use]
    pub fn subscribe(&self, filter: CallbackFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        debug!(role = %self.role, kinds = ?filter.kinds, "New tap subscription created");
        Subscription::new(self.role, receiver, filter)
    }

    /// Tap as a `Stream`.
    #[must_use]
    pub fn event_stream(&self, filter: CallbackFilter) -> EventStream {
        EventStream::new(self.role, self.sender.subscribe(), filter)
    }

    /// Number of attached listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Number of live tap subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Tap channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn dispatch(&self, event: CallbackEvent) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);

        let listeners = self.listeners.snapshot();
        let mut failed = 0;
        for listener in &listeners {
            // A panicking listener must not cost the others this event.
            if panic::catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                failed += 1;
                metrics::record_listener_panicked(&self.role.to_string());
                error!(role = %self.role, kind = %event.kind(), "Listener panicked");
            }
        }

        let kind = event.kind().clone();
        let taps = match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                trace!(role = %self.role, "No taps subscribed");
                0
            }
        };

        debug!(
            role = %self.role,
            kind = %kind,
            listeners = listeners.len(),
            failed = failed,
            taps = taps,
            "Event published"
        );
        let reached = listeners.len() - failed + taps;
        metrics::record_events_delivered(&self.role.to_string(), reached);
        reached
    }
}

impl EventPublisher for RoleEventStream {
    fn publish(&self, event: CallbackEvent) -> usize {
        match self.try_publish(event) {
            Ok(reached) => reached,
            Err(e) => {
                warn!(error = %e, "Event dropped");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
