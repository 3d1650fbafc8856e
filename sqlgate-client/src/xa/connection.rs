//! The XA connection lifecycle manager.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use sqlgate_core::{Result, SqlGateError};

use crate::config::{derive_control_properties, DataSourceConfig};
use crate::connection::{ConnectionPool, PooledConnection, Session, SessionConnector};
use crate::xa::XaResource;

/// Guarded references torn down by `close`.
#[derive(Debug, Default)]
struct XaConnectionState {
    control: Option<Arc<dyn Session>>,
    resource: Option<Arc<XaResource>>,
}

/// A pooled connection that can participate in distributed (XA)
/// transactions.
///
/// Construction acquires a physical session under pooling policy and
/// eagerly opens one additional control session to the same server; the
/// control session carries nothing but transaction-coordinator commands, so
/// an application statement in flight on the physical session never blocks
/// coordinator traffic.
///
/// These connections are not handed to applications directly; the
/// transaction coordinator that pools and enlists them is the caller of
/// [`xa_resource`](XaConnection::xa_resource) and
/// [`close`](XaConnection::close).
#[derive(Debug)]
pub struct XaConnection {
    base: PooledConnection,
    identity: String,
    state: Mutex<XaConnectionState>,
}

impl XaConnection {
    /// Opens a transaction-capable connection: the physical session from
    /// the pool plus a dedicated control session.
    ///
    /// The control session is established synchronously with the physical
    /// session's resolved properties, adjusted for control use (see
    /// [`derive_control_properties`]). If it cannot be opened the physical
    /// session is released back to the pool and the error propagates; no
    /// partially usable connection is left behind.
    pub async fn connect(
        pool: Arc<dyn ConnectionPool>,
        connector: Arc<dyn SessionConnector>,
        config: &DataSourceConfig,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self> {
        static IDENTITY_COUNTER: AtomicU64 = AtomicU64::new(1);

        let base = PooledConnection::open(pool, config, user, password).await?;
        let identity = format!("xa-conn-{}", IDENTITY_COUNTER.fetch_add(1, Ordering::Relaxed));

        let control_properties = derive_control_properties(base.physical().properties());

        tracing::debug!(identity = %identity, "creating internal control connection");
        let control = match connector
            .establish(&format!("{}-control", identity), &control_properties)
            .await
        {
            Ok(control) => control,
            Err(err) => {
                if let Err(release_err) = base.close().await {
                    tracing::warn!(
                        identity = %identity,
                        error = %release_err,
                        "failed to release physical connection after control connection failure"
                    );
                }
                return Err(err);
            }
        };
        tracing::debug!(
            identity = %identity,
            control = %control.identity(),
            physical = %base.physical().identity(),
            "created internal control connection"
        );

        Ok(Self {
            base,
            identity,
            state: Mutex::new(XaConnectionState {
                control: Some(control),
                resource: None,
            }),
        })
    }

    /// Returns this connection's identity string, used to correlate
    /// diagnostics across the triad.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Returns the underlying physical session.
    pub fn physical(&self) -> &Arc<dyn Session> {
        self.base.physical()
    }

    /// Returns `true` once the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.base.is_closed()
    }

    /// Returns the two-phase-commit participant handle for this connection.
    ///
    /// The handle is one-to-one with the physical session: the first call
    /// creates it, every later call — including concurrent ones — returns
    /// the identical instance.
    pub async fn xa_resource(&self) -> Result<Arc<XaResource>> {
        let mut state = self.state.lock().await;

        if self.base.is_closed() || !self.base.physical().is_open() {
            return Err(SqlGateError::Connection(format!(
                "{} is closed",
                self.identity
            )));
        }
        let control = state.control.clone().ok_or_else(|| {
            SqlGateError::Connection(format!("{} has no control connection", self.identity))
        })?;

        if let Some(resource) = &state.resource {
            return Ok(Arc::clone(resource));
        }

        let resource = Arc::new(XaResource::new(
            Arc::clone(self.base.physical()),
            control,
            self.identity.clone(),
        ));
        state.resource = Some(Arc::clone(&resource));
        tracing::debug!(identity = %self.identity, "created XA resource handle");
        Ok(resource)
    }

    /// Closes the connection, tearing down the triad in order: the resource
    /// handle, then the control session, then the physical session back to
    /// the pool.
    ///
    /// Handle and control-session teardown errors are logged and absorbed
    /// so teardown always reaches the physical release; an error releasing
    /// the physical session propagates. A second `close` finds nothing to
    /// tear down and returns success.
    pub async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;

        if let Some(resource) = state.resource.take() {
            if let Err(err) = resource.close().await {
                tracing::warn!(
                    identity = %self.identity,
                    error = %err,
                    "error closing XA resource handle during teardown"
                );
            }
        }

        if let Some(control) = state.control.take() {
            if let Err(err) = control.close().await {
                tracing::warn!(
                    identity = %self.identity,
                    error = %err,
                    "error closing control connection during teardown"
                );
            }
        }

        // The control channel must be down before the data channel starts
        // tearing down; the base release stays last.
        self.base.close().await
    }
}

impl Drop for XaConnection {
    fn drop(&mut self) {
        if let Ok(state) = self.state.try_lock() {
            if state.control.is_some() || state.resource.is_some() {
                tracing::warn!(
                    identity = %self.identity,
                    "XA connection dropped without close; control connection leaked to session layer"
                );
            }
        }
    }
}
