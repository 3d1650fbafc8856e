//! The entry point for transaction-capable connections.

use std::sync::Arc;

use sqlgate_core::Result;

use crate::config::DataSourceConfig;
use crate::connection::{ConnectionPool, SessionConnector};
use crate::xa::XaConnection;

/// Produces [`XaConnection`]s for a transaction coordinator.
///
/// Binds a data-source configuration to the pooling layer that supplies
/// physical sessions and the connector that opens control sessions.
#[derive(Debug, Clone)]
pub struct XaDataSource {
    config: DataSourceConfig,
    pool: Arc<dyn ConnectionPool>,
    connector: Arc<dyn SessionConnector>,
}

impl XaDataSource {
    /// Creates a data source over the given pooling and session layers.
    pub fn new(
        config: DataSourceConfig,
        pool: Arc<dyn ConnectionPool>,
        connector: Arc<dyn SessionConnector>,
    ) -> Self {
        Self {
            config,
            pool,
            connector,
        }
    }

    /// Returns the data-source configuration.
    pub fn config(&self) -> &DataSourceConfig {
        &self.config
    }

    /// Opens a transaction-capable connection using the configured
    /// credentials.
    pub async fn xa_connection(&self) -> Result<XaConnection> {
        XaConnection::connect(
            Arc::clone(&self.pool),
            Arc::clone(&self.connector),
            &self.config,
            None,
            None,
        )
        .await
    }

    /// Opens a transaction-capable connection as the given user, overriding
    /// any configured credentials.
    pub async fn xa_connection_as(&self, user: &str, password: &str) -> Result<XaConnection> {
        XaConnection::connect(
            Arc::clone(&self.pool),
            Arc::clone(&self.connector),
            &self.config,
            Some(user),
            Some(password),
        )
        .await
    }
}
