//! # Role Stream Registry
//!
//! The set of streams created once at harness start. Passed by reference to
//! receivers (publishers) and tests (listeners); there is no global instance.

use crate::stream::RoleEventStream;
use crate::{BusError, DEFAULT_CHANNEL_CAPACITY};
use callback_types::RoleId;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// One [`RoleEventStream`] per role.
#[derive(Clone, Default)]
pub struct RoleStreams {
    streams: BTreeMap<RoleId, Arc<RoleEventStream>>,
}

impl RoleStreams {
    /// Create streams for the given roles with default capacity.
    #[must_use]
    pub fn new(roles: impl IntoIterator<Item = RoleId>) -> Self {
        Self::with_capacity(roles, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create streams for the given roles. Duplicate roles share one stream.
    #[must_use]
    pub fn with_capacity(roles: impl IntoIterator<Item = RoleId>, capacity: usize) -> Self {
        let streams = roles
            .into_iter()
            .map(|role| (role, Arc::new(RoleEventStream::with_capacity(role, capacity))))
            .collect::<BTreeMap<_, _>>();
        debug!(roles = streams.len(), "Role event streams created");
        Self { streams }
    }

    /// Stream for a role, if one was created.
    #[must_use]
    pub fn get(&self, role: RoleId) -> Option<Arc<RoleEventStream>> {
        self.streams.get(&role).cloned()
    }

    /// Stream for a role, or [`BusError::UnknownRole`].
    pub fn stream(&self, role: RoleId) -> Result<Arc<RoleEventStream>, BusError> {
        self.get(role).ok_or(BusError::UnknownRole(role))
    }

    /// Roles in sorted order.
    pub fn roles(&self) -> impl Iterator<Item = RoleId> + '_ {
        self.streams.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Detach every listener on every stream. Returns the total removed.
    pub fn remove_all_listeners(&self) -> usize {
        self.streams
            .values()
            .map(|stream| stream.remove_all_listeners())
            .sum()
    }
}
