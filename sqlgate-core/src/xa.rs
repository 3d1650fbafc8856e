//! X/Open XA constants shared between the driver and the transaction
//! coordinator.
//!
//! The flag and code values follow the X/Open XA specification; the server's
//! coordinator reports outcomes using the same numeric space.

// ----------------------------------------------------------------------------
// Flags passed to start/end/recover
// ----------------------------------------------------------------------------

/// No flags set.
pub const XA_TMNOFLAGS: i32 = 0x0000_0000;

/// Caller is joining a transaction branch already active on this resource
/// manager.
pub const XA_TMJOIN: i32 = 0x0020_0000;

/// Caller is resuming association with a suspended transaction branch.
pub const XA_TMRESUME: i32 = 0x0800_0000;

/// Dissociate from the transaction branch; the portion of work completed
/// successfully.
pub const XA_TMSUCCESS: i32 = 0x0400_0000;

/// Dissociate from the transaction branch; the portion of work failed.
pub const XA_TMFAIL: i32 = 0x2000_0000;

/// Suspend (rather than end) the association with the transaction branch.
pub const XA_TMSUSPEND: i32 = 0x0200_0000;

/// Start a recovery scan.
pub const XA_TMSTARTRSCAN: i32 = 0x0100_0000;

/// End a recovery scan.
pub const XA_TMENDRSCAN: i32 = 0x0080_0000;

/// Use the one-phase commit optimization.
pub const XA_TMONEPHASE: i32 = 0x4000_0000;

// ----------------------------------------------------------------------------
// Return codes
// ----------------------------------------------------------------------------

/// Normal execution.
pub const XA_OK: i32 = 0;

/// The transaction branch was read-only and has been completed.
pub const XA_RDONLY: i32 = 3;

/// The routine returned with no effect and may be reissued.
pub const XA_RETRY: i32 = 4;

/// The branch was partially committed and partially rolled back.
pub const XA_HEURMIX: i32 = 5;

/// The branch was heuristically rolled back.
pub const XA_HEURRB: i32 = 6;

/// The branch was heuristically committed.
pub const XA_HEURCOM: i32 = 7;

/// The branch may have been committed or rolled back (heuristic hazard).
pub const XA_HEURHAZ: i32 = 8;

// ----------------------------------------------------------------------------
// Error codes
// ----------------------------------------------------------------------------

/// Asynchronous operation already outstanding.
pub const XAER_ASYNC: i32 = -2;

/// A resource manager error occurred in the transaction branch.
pub const XAER_RMERR: i32 = -3;

/// The transaction branch identifier is not known to the resource manager.
pub const XAER_NOTA: i32 = -4;

/// Invalid arguments were given.
pub const XAER_INVAL: i32 = -5;

/// The routine was invoked in an improper context.
pub const XAER_PROTO: i32 = -6;

/// The resource manager is unavailable.
pub const XAER_RMFAIL: i32 = -7;

/// The transaction branch identifier is already known to the resource
/// manager.
pub const XAER_DUPID: i32 = -8;

/// The routine was invoked outside the scope of a global transaction.
pub const XAER_OUTSIDE: i32 = -9;

/// Returns `true` if `code` is one of the heuristic-outcome return codes.
///
/// A branch that resolved heuristically must later be cleared with `forget`.
pub fn is_heuristic_code(code: i32) -> bool {
    matches!(code, XA_HEURMIX | XA_HEURRB | XA_HEURCOM | XA_HEURHAZ)
}

/// The vote a resource manager casts in response to `prepare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XaVote {
    /// The branch's work is durable and the resource manager is ready to
    /// commit.
    Ok,
    /// The branch performed no durable work; there is nothing to commit and
    /// the branch is already complete.
    ReadOnly,
}

impl XaVote {
    /// Returns the X/Open return code for this vote.
    pub fn code(&self) -> i32 {
        match self {
            XaVote::Ok => XA_OK,
            XaVote::ReadOnly => XA_RDONLY,
        }
    }

    /// Creates a vote from its X/Open return code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            XA_OK => Some(XaVote::Ok),
            XA_RDONLY => Some(XaVote::ReadOnly),
            _ => None,
        }
    }
}
