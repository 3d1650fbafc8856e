//! Core types and protocol vocabulary for the SQL Gate client driver.
//!
//! This crate holds the pieces of the driver that are shared between the
//! connection layer and the distributed-transaction components: the error
//! type, the XA transaction-branch identifier, the X/Open XA constants, and
//! the typed command envelope carried over a control connection to the
//! server's transaction coordinator.

#![warn(missing_docs)]

pub mod error;
pub mod protocol;
pub mod xa;
pub mod xid;

pub use error::{Result, SqlGateError};
pub use protocol::{ControlCommand, ControlReply};
pub use xa::XaVote;
pub use xid::Xid;
