//! Distributed (XA) transaction support.
//!
//! A transaction coordinator obtains an [`XaResource`] handle from an
//! [`XaConnection`] and drives the two-phase-commit protocol through it.
//! Coordinator commands travel over a dedicated control session so that an
//! application statement in flight on the physical session can never block
//! transaction-control traffic.
//!
//! # Example
//!
//! ```ignore
//! use sqlgate_client::xa::XaDataSource;
//! use sqlgate_core::xa::{XA_TMNOFLAGS, XA_TMSUCCESS};
//! use sqlgate_core::{XaVote, Xid};
//!
//! let conn = data_source.xa_connection().await?;
//! let resource = conn.xa_resource().await?;
//!
//! let xid = Xid::new(0, b"global-txn", b"branch-1");
//! resource.start(&xid, XA_TMNOFLAGS).await?;
//! // ... application SQL ...
//! resource.end(&xid, XA_TMSUCCESS).await?;
//!
//! match resource.prepare(&xid).await? {
//!     XaVote::Ok => resource.commit(&xid, false).await?,
//!     XaVote::ReadOnly => {} // nothing durable to commit
//! }
//!
//! conn.close().await?;
//! ```

mod connection;
mod data_source;
mod resource;

pub use connection::XaConnection;
pub use data_source::XaDataSource;
pub use resource::{BranchState, XaResource};
