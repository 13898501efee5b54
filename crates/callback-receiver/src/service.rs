//! Receiver service - one axum server per simulated role.

use crate::config::{HarnessConfig, LimitsConfig, RoleConfig};
use crate::error::ReceiverError;
use crate::handler::{health_check, receive_callback, ReceiverState};
use crate::middleware::TracingLayer;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use callback_bus::{RoleEventStream, RoleStreams};
use callback_types::RoleId;
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tracing::{debug, error, info, warn};

/// HTTP endpoint for one role, not yet bound.
pub struct CallbackReceiver {
    config: RoleConfig,
    limits: LimitsConfig,
    stream: Arc<RoleEventStream>,
}

impl CallbackReceiver {
    /// Create a receiver publishing to `stream`.
    ///
    /// The stream must carry the same role as `config`, and the callback
    /// path must pass [`RoleConfig::validate_path`].
    pub fn new(
        config: RoleConfig,
        limits: LimitsConfig,
        stream: Arc<RoleEventStream>,
    ) -> Result<Self, ReceiverError> {
        if stream.role() != config.role {
            return Err(ReceiverError::UnknownRole(config.role));
        }
        config.validate_path()?;
        Ok(Self {
            config,
            limits,
            stream,
        })
    }

    /// Role this receiver serves
    pub fn role(&self) -> RoleId {
        self.config.role
    }

    /// Build the router: `POST {path}` and `GET /health`.
    pub fn router(&self) -> Router {
        let state = ReceiverState {
            role: self.config.role,
            stream: Arc::clone(&self.stream),
            max_body_size: self.limits.max_body_size,
        };

        let middleware = ServiceBuilder::new()
            .layer(TracingLayer::new(self.config.role))
            .layer(TimeoutLayer::new(self.limits.request_timeout));

        Router::new()
            .route(&self.config.path, post(receive_callback))
            .route("/health", get(health_check))
            .layer(DefaultBodyLimit::max(self.limits.max_body_size))
            .layer(middleware)
            .with_state(state)
    }

    /// Bind the socket and start serving in a background task.
    pub async fn bind(self) -> Result<ReceiverHandle, ReceiverError> {
        let role = self.config.role;
        let addr = self.config.addr();
        let router = self.router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ReceiverError::Bind { role, addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ReceiverError::Bind { role, addr, source })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        info!(
            role = %role,
            addr = %local_addr,
            path = %self.config.path,
            "Callback receiver listening"
        );

        Ok(ReceiverHandle {
            role,
            local_addr,
            path: self.config.path,
            shutdown_timeout: self.limits.shutdown_timeout,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }
}

/// A running receiver. Dropping it stops the server without waiting.
pub struct ReceiverHandle {
    role: RoleId,
    local_addr: SocketAddr,
    path: String,
    shutdown_timeout: Duration,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl ReceiverHandle {
    pub fn role(&self) -> RoleId {
        self.role
    }

    /// Address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// URL to register with the node under test as this role's callback.
    ///
    /// An unspecified bind address is reported as loopback.
    pub fn callback_url(&self) -> String {
        let ip = match self.local_addr.ip() {
            IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            ip => ip,
        };
        format!("http://{}{}", SocketAddr::new(ip, self.local_addr.port()), self.path)
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(mut self) -> Result<(), ReceiverError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        let Some(task) = self.task.take() else {
            return Ok(());
        };

        let role = self.role;
        match tokio::time::timeout(self.shutdown_timeout, task).await {
            Ok(Ok(Ok(()))) => {
                info!(role = %role, "Callback receiver stopped");
                Ok(())
            }
            Ok(Ok(Err(e))) => Err(ReceiverError::Serve {
                role,
                message: e.to_string(),
            }),
            Ok(Err(e)) => Err(ReceiverError::Serve {
                role,
                message: e.to_string(),
            }),
            Err(_) => {
                warn!(
                    role = %role,
                    timeout_ms = self.shutdown_timeout.as_millis() as u64,
                    "Receiver shutdown timed out"
                );
                Err(ReceiverError::Serve {
                    role,
                    message: "graceful shutdown timed out".to_string(),
                })
            }
        }
    }
}

impl Drop for ReceiverHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            debug!(role = %self.role, "Receiver handle dropped, stopping server");
            let _ = tx.send(());
        }
    }
}

/// Every available role's receiver plus the streams they publish to.
///
/// Streams exist only for available roles, so expecting a callback on a
/// role that is switched off fails fast with an unknown-role error instead
/// of waiting forever.
pub struct CallbackHarness {
    config: HarnessConfig,
    streams: RoleStreams,
    handles: BTreeMap<RoleId, ReceiverHandle>,
}

impl CallbackHarness {
    /// Validate `config`, create the streams and bind every available role.
    pub async fn start(config: HarnessConfig) -> Result<Self, ReceiverError> {
        config.validate()?;

        let streams = RoleStreams::with_capacity(
            config.available_roles().map(|r| r.role),
            config.limits.channel_capacity,
        );

        let mut handles = BTreeMap::new();
        for role_config in config.available_roles() {
            let stream = streams
                .stream(role_config.role)
                .map_err(|_| ReceiverError::UnknownRole(role_config.role))?;
            let receiver =
                CallbackReceiver::new(role_config.clone(), config.limits.clone(), stream)?;
            let handle = receiver.bind().await?;
            handles.insert(role_config.role, handle);
        }

        info!(roles = handles.len(), "Callback harness started");

        Ok(Self {
            config,
            streams,
            handles,
        })
    }

    /// Streams for every available role
    pub fn streams(&self) -> &RoleStreams {
        &self.streams
    }

    /// Stream for one role
    pub fn stream(&self, role: RoleId) -> Result<Arc<RoleEventStream>, ReceiverError> {
        self.streams
            .get(role)
            .ok_or(ReceiverError::UnknownRole(role))
    }

    /// Running receiver for one role
    pub fn handle(&self, role: RoleId) -> Option<&ReceiverHandle> {
        self.handles.get(&role)
    }

    /// Callback URL to register for `role`
    pub fn callback_url(&self, role: RoleId) -> Result<String, ReceiverError> {
        self.handle(role)
            .map(ReceiverHandle::callback_url)
            .ok_or(ReceiverError::UnknownRole(role))
    }

    /// Does this run include `role`?
    pub fn is_available(&self, role: RoleId) -> bool {
        self.config.role(role).is_some_and(|r| r.available)
    }

    /// Roles with a running receiver
    pub fn roles(&self) -> impl Iterator<Item = RoleId> + '_ {
        self.handles.keys().copied()
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Detach all listeners and stop every receiver.
    ///
    /// Every receiver is asked to stop even if an earlier one fails; the
    /// first error is returned.
    pub async fn shutdown(mut self) -> Result<(), ReceiverError> {
        let detached = self.streams.remove_all_listeners();
        debug!(detached = detached, "Detached remaining listeners");

        let mut first_error = None;
        for (role, handle) in std::mem::take(&mut self.handles) {
            if let Err(e) = handle.shutdown().await {
                error!(role = %role, error = %e, "Receiver shutdown failed");
                first_error.get_or_insert(e);
            }
        }

        info!("Callback harness stopped");
        first_error.map_or(Ok(()), Err)
    }
}
