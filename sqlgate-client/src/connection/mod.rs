//! Session establishment and pooling collaborator seams.
//!
//! The SQL engine, wire encoding, and pooling policy are external to this
//! crate; they plug in behind the [`Session`], [`SessionConnector`], and
//! [`ConnectionPool`] traits. [`PooledConnection`] is the base
//! pooled-connection object the XA lifecycle manager extends.

mod pool;
mod session;

pub use pool::{ConnectionPool, PooledConnection};
pub use session::{Session, SessionConnector};
