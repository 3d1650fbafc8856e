//! Async Rust client driver for SQL Gate with distributed (XA) transaction
//! support.
//!
//! This crate provides the connection-lifecycle side of the driver's
//! two-phase-commit integration. A transaction-capable connection is a triad
//! of cooperating resources:
//!
//! 1. a pooled **physical** session carrying application SQL,
//! 2. a dedicated **control** session carrying transaction-coordinator
//!    commands out-of-band from application traffic, and
//! 3. an **XA resource handle** — the two-phase-commit participant object a
//!    transaction coordinator drives — bound one-to-one to the physical
//!    session.
//!
//! [`XaConnection`] owns the triad and enforces its lifecycle: the control
//! session is established eagerly at construction, the resource handle is
//! created lazily and memoized, and teardown releases the handle, then the
//! control session, then the physical session, in that order, exactly once.
//!
//! The SQL engine, wire encoding, and pooling policy live behind the
//! [`Session`], [`SessionConnector`], and [`ConnectionPool`] traits; this
//! crate only routes control traffic to the control session and data traffic
//! to the physical session, never mixing the two.
//!
//! # Example
//!
//! ```ignore
//! use sqlgate_client::{DataSourceConfig, XaDataSource};
//! use sqlgate_core::xa::{XA_TMNOFLAGS, XA_TMSUCCESS};
//! use sqlgate_core::Xid;
//!
//! let config = DataSourceConfig::builder()
//!     .server_name("db.example.com")
//!     .database_name("orders")
//!     .credentials("app", "secret")
//!     .build()?;
//!
//! let data_source = XaDataSource::new(config, pool, connector);
//! let conn = data_source.xa_connection().await?;
//! let resource = conn.xa_resource().await?;
//!
//! let xid = Xid::generate();
//! resource.start(&xid, XA_TMNOFLAGS).await?;
//! // ... application SQL on the physical connection ...
//! resource.end(&xid, XA_TMSUCCESS).await?;
//! resource.prepare(&xid).await?;
//! resource.commit(&xid, false).await?;
//!
//! conn.close().await?;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod connection;
pub mod xa;

pub use config::{
    derive_control_properties, ConnectionProperties, DataSourceConfig, DataSourceConfigBuilder,
};
pub use connection::{ConnectionPool, PooledConnection, Session, SessionConnector};
pub use xa::{BranchState, XaConnection, XaDataSource, XaResource};

pub use sqlgate_core::{ControlCommand, ControlReply, Result, SqlGateError, XaVote, Xid};
