//! Typed command envelope for the transaction coordinator.
//!
//! The driver's XA components speak to the server's transaction coordinator
//! in terms of these commands. The byte-level encoding (coordinator
//! stored-procedure call formats) belongs to the session layer that carries
//! them; this module only defines the contract.

use crate::xa::XaVote;
use crate::xid::Xid;

/// A transaction-management command issued to the server's coordinator.
///
/// Commands are only ever carried over a control connection, never over the
/// physical connection that carries application SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Associate a transaction branch with the resource manager.
    Enlist {
        /// The branch to associate.
        xid: Xid,
        /// `XA_TMNOFLAGS`, `XA_TMJOIN`, or `XA_TMRESUME`.
        flags: i32,
        /// Branch timeout in seconds; 0 means the resource manager default.
        timeout_secs: u32,
    },
    /// Dissociate a transaction branch from the resource manager.
    Delist {
        /// The branch to dissociate.
        xid: Xid,
        /// `XA_TMSUCCESS`, `XA_TMFAIL`, or `XA_TMSUSPEND`.
        flags: i32,
    },
    /// Ask the resource manager to durably prepare the branch and vote.
    Prepare {
        /// The branch to prepare.
        xid: Xid,
    },
    /// Durably apply the branch's changes.
    Commit {
        /// The branch to commit.
        xid: Xid,
        /// When `true`, prepare and commit atomically in one round-trip.
        one_phase: bool,
    },
    /// Durably discard the branch's changes.
    Rollback {
        /// The branch to roll back.
        xid: Xid,
    },
    /// Discard bookkeeping for a heuristically resolved branch.
    Forget {
        /// The branch to forget.
        xid: Xid,
    },
    /// List branches held in a prepared or heuristically resolved state.
    Recover {
        /// `XA_TMSTARTRSCAN`, `XA_TMENDRSCAN`, or `XA_TMNOFLAGS`.
        flags: i32,
    },
}

impl ControlCommand {
    /// Returns the branch identifier this command addresses, if any.
    pub fn xid(&self) -> Option<&Xid> {
        match self {
            ControlCommand::Enlist { xid, .. }
            | ControlCommand::Delist { xid, .. }
            | ControlCommand::Prepare { xid }
            | ControlCommand::Commit { xid, .. }
            | ControlCommand::Rollback { xid }
            | ControlCommand::Forget { xid } => Some(xid),
            ControlCommand::Recover { .. } => None,
        }
    }

    /// Returns the command's name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            ControlCommand::Enlist { .. } => "enlist",
            ControlCommand::Delist { .. } => "delist",
            ControlCommand::Prepare { .. } => "prepare",
            ControlCommand::Commit { .. } => "commit",
            ControlCommand::Rollback { .. } => "rollback",
            ControlCommand::Forget { .. } => "forget",
            ControlCommand::Recover { .. } => "recover",
        }
    }
}

/// A successful coordinator reply to a [`ControlCommand`].
///
/// Failures are reported through [`SqlGateError`](crate::SqlGateError), not
/// through a reply variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlReply {
    /// The command completed with no payload.
    Done,
    /// The prepare vote.
    Vote(XaVote),
    /// The branches reported by a recovery scan.
    Branches(Vec<Xid>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xa::{XA_TMNOFLAGS, XA_TMSTARTRSCAN, XA_TMSUCCESS};

    #[test]
    fn test_command_xid_accessor() {
        let xid = Xid::new(0, b"gtrid", b"bqual");

        let enlist = ControlCommand::Enlist {
            xid: xid.clone(),
            flags: XA_TMNOFLAGS,
            timeout_secs: 0,
        };
        assert_eq!(enlist.xid(), Some(&xid));

        let recover = ControlCommand::Recover {
            flags: XA_TMSTARTRSCAN,
        };
        assert_eq!(recover.xid(), None);
    }

    #[test]
    fn test_command_names() {
        let xid = Xid::new(0, b"g", b"b");
        assert_eq!(
            ControlCommand::Delist {
                xid: xid.clone(),
                flags: XA_TMSUCCESS
            }
            .name(),
            "delist"
        );
        assert_eq!(
            ControlCommand::Commit {
                xid,
                one_phase: true
            }
            .name(),
            "commit"
        );
        assert_eq!(ControlCommand::Recover { flags: 0 }.name(), "recover");
    }

    #[test]
    fn test_reply_equality() {
        assert_eq!(ControlReply::Done, ControlReply::Done);
        assert_eq!(
            ControlReply::Vote(XaVote::ReadOnly),
            ControlReply::Vote(XaVote::ReadOnly)
        );
        assert_ne!(
            ControlReply::Vote(XaVote::Ok),
            ControlReply::Vote(XaVote::ReadOnly)
        );
    }

    #[test]
    fn test_command_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ControlCommand>();
        assert_send_sync::<ControlReply>();
    }
}
