//! # Event Promise
//!
//! The single-resolution primitive: a `Resolver` (producer, held by a
//! listener) and an `EventPromise` (consumer, awaited by the test) joined by
//! a capacity-one `tokio::sync::oneshot` channel.
//!
//! At most one of `resolve`/`reject` ever takes effect. Later calls are
//! no-ops that return `false`.

use crate::error::CorrelatorError;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::trace;

type Outcome<T> = Result<T, CorrelatorError>;

struct Shared<T> {
    sender: Mutex<Option<oneshot::Sender<Outcome<T>>>>,
    settled: Arc<AtomicBool>,
}

impl<T> Shared<T> {
    fn settle(&self, outcome: Outcome<T>) -> bool {
        let Some(sender) = self.sender.lock().take() else {
            return false;
        };
        self.settled.store(true, Ordering::Release);
        if sender.send(outcome).is_err() {
            trace!("Promise dropped before settlement was observed");
        }
        true
    }
}

/// Create an unresolved correlator.
///
/// ```ignore
/// let (resolver, promise) = create_event_promise::<CallbackPayload>();
/// stream.attach(move |event| { if matches(event) { resolver.resolve(event.payload.clone()); } });
/// let payload = promise.await?;
/// ```
pub fn create_event_promise<T>() -> (Resolver<T>, EventPromise<T>) {
    let (sender, receiver) = oneshot::channel();
    let settled = Arc::new(AtomicBool::new(false));
    let resolver = Resolver {
        shared: Arc::new(Shared {
            sender: Mutex::new(Some(sender)),
            settled: Arc::clone(&settled),
        }),
    };
    (resolver, EventPromise { receiver, settled })
}

/// Producer half. Cloneable; all clones settle the same promise.
pub struct Resolver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Resolver<T> {
    /// Settle with a value. Returns `true` only for the call that settled.
    pub fn resolve(&self, value: T) -> bool {
        self.shared.settle(Ok(value))
    }

    /// Settle with a rejection. Returns `true` only for the call that settled.
    pub fn reject(&self, reason: impl Into<String>) -> bool {
        self.shared.settle(Err(CorrelatorError::Rejected(reason.into())))
    }

    /// Has any clone already settled?
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.shared.settled.load(Ordering::Acquire)
    }
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Consumer half. Resolves once with the settled outcome.
///
/// If every [`Resolver`] is dropped first, resolves to
/// [`CorrelatorError::Abandoned`]. There is no built-in timeout; use
/// [`EventPromise::within`] to bound the wait.
pub struct EventPromise<T> {
    receiver: oneshot::Receiver<Outcome<T>>,
    settled: Arc<AtomicBool>,
}

impl<T> EventPromise<T> {
    /// Has the producer side settled? Does not consume the outcome.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }

    /// Take the outcome if it is already available.
    ///
    /// Returns `None` while pending. Once an outcome has been taken, later
    /// calls report [`CorrelatorError::Abandoned`].
    pub fn try_settled(&mut self) -> Option<Outcome<T>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(CorrelatorError::Abandoned)),
        }
    }

    /// Await the outcome for at most `timeout`.
    pub async fn within(self, timeout: Duration) -> Outcome<T> {
        match tokio::time::timeout(timeout, self).await {
            Ok(outcome) => outcome,
            Err(_) => Err(CorrelatorError::TimedOut(timeout)),
        }
    }
}

impl<T> Future for EventPromise<T> {
    type Output = Outcome<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(CorrelatorError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}
