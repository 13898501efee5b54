//! # Tap Subscriptions
//!
//! Asynchronous observers of a role stream. Used for delivery logging and
//! for tests that want to see every callback rather than wait for one.

use crate::filter::CallbackFilter;
use callback_types::{CallbackEvent, RoleId};
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The stream was dropped.
    #[error("role event stream closed")]
    Closed,
}

/// A tap handle for receiving events.
pub struct Subscription {
    role: RoleId,

    /// The broadcast receiver.
    receiver: broadcast::Receiver<CallbackEvent>,

    /// Filter for this subscription.
    filter: CallbackFilter,
}

impl Subscription {
    pub(crate) fn new(
        role: RoleId,
        receiver: broadcast::Receiver<CallbackEvent>,
        filter: CallbackFilter,
    ) -> Self {
        Self {
            role,
            receiver,
            filter,
        }
    }

    /// Receive the next event that matches the filter.
    ///
    /// # Returns
    ///
    /// - `Some(event)` - The next matching event
    /// - `None` - The stream was dropped
    pub async fn recv(&mut self) -> Option<CallbackEvent> {
        loop {
            let event = match self.receiver.recv().await {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(role = %self.role, lagged = count, "Tap lagged, some events dropped");
                    continue;
                }
            };

            if self.filter.matches_event(&event) {
                return Some(event);
            }
        }
    }

    /// Try to receive the next event without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(event))` - An event was available and matched
    /// - `Ok(None)` - No matching event available
    /// - `Err(SubscriptionError::Closed)` - The stream was dropped
    pub fn try_recv(&mut self) -> Result<Option<CallbackEvent>, SubscriptionError> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(e) => e,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };

            if self.filter.matches_event(&event) {
                return Ok(Some(event));
            }
        }
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &CallbackFilter {
        &self.filter
    }

    #[must_use]
    pub fn role(&self) -> RoleId {
        self.role
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!(role = %self.role, "Tap subscription dropped");
    }
}

/// A `Stream` over a filtered tap.
pub struct EventStream {
    role: RoleId,
    inner: BroadcastStream<CallbackEvent>,
    filter: CallbackFilter,
}

impl EventStream {
    pub(crate) fn new(
        role: RoleId,
        receiver: broadcast::Receiver<CallbackEvent>,
        filter: CallbackFilter,
    ) -> Self {
        Self {
            role,
            inner: BroadcastStream::new(receiver),
            filter,
        }
    }

    /// Get the filter for this stream.
    #[must_use]
    pub fn filter(&self) -> &CallbackFilter {
        &self.filter
    }
}

impl Stream for EventStream {
    type Item = CallbackEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => {
                    if self.filter.matches_event(&event) {
                        return Poll::Ready(Some(event));
                    }
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(count)))) => {
                    debug!(role = %self.role, lagged = count, "Tap stream lagged");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
