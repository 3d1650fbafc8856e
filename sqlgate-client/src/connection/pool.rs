//! The pooled physical connection and its pooling-layer seam.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use sqlgate_core::Result;

use crate::config::DataSourceConfig;
use crate::connection::Session;

/// The pooling layer that hands out physical sessions.
///
/// Creation, reuse, and eviction policy all live behind this seam; the
/// driver core only receives already-established sessions.
#[async_trait]
pub trait ConnectionPool: Send + Sync + fmt::Debug {
    /// Acquires a physical session for the given data source and
    /// credentials, under whatever pooling policy this layer implements.
    async fn acquire(
        &self,
        config: &DataSourceConfig,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Result<Arc<dyn Session>>;

    /// Releases a previously acquired session back to (or out of) the pool.
    async fn release(&self, session: &Arc<dyn Session>) -> Result<()>;
}

/// A physical session checked out of a [`ConnectionPool`].
///
/// Releases the session back to the pool exactly once; a second `close` is
/// a no-op.
#[derive(Debug)]
pub struct PooledConnection {
    pool: Arc<dyn ConnectionPool>,
    physical: Arc<dyn Session>,
    released: AtomicBool,
}

impl PooledConnection {
    /// Acquires a physical session from the pool.
    pub async fn open(
        pool: Arc<dyn ConnectionPool>,
        config: &DataSourceConfig,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self> {
        let physical = pool.acquire(config, user, password).await?;
        tracing::debug!(
            identity = %physical.identity(),
            "acquired physical connection from pool"
        );
        Ok(Self {
            pool,
            physical,
            released: AtomicBool::new(false),
        })
    }

    /// Returns the underlying physical session.
    pub fn physical(&self) -> &Arc<dyn Session> {
        &self.physical
    }

    /// Returns `true` once the session has been released to the pool.
    pub fn is_closed(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Releases the physical session back to the pool.
    ///
    /// The first call performs the release; every later call returns
    /// success without touching the pool.
    pub async fn close(&self) -> Result<()> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::debug!(
            identity = %self.physical.identity(),
            "releasing physical connection to pool"
        );
        self.pool.release(&self.physical).await
    }
}
