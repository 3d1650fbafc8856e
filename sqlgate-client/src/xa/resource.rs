//! The two-phase-commit participant handle.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use sqlgate_core::xa::{
    is_heuristic_code, XaVote, XA_TMENDRSCAN, XA_TMJOIN, XA_TMRESUME, XA_TMSTARTRSCAN,
    XA_TMSUSPEND,
};
use sqlgate_core::{ControlCommand, ControlReply, Result, SqlGateError, Xid};

use crate::connection::Session;

/// Maximum number of branch identifiers returned per `recover` call.
const RECOVER_BATCH: usize = 32;

/// The state of one transaction branch as tracked by this handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchState {
    /// The branch is associated and accumulating work.
    Active,
    /// The association was suspended and may be resumed.
    Suspended,
    /// The branch was ended and awaits prepare, commit, or rollback.
    Ended,
    /// The branch voted ready-to-commit.
    Prepared,
    /// The branch's changes were durably applied.
    Committed,
    /// The branch's changes were durably discarded.
    RolledBack,
    /// The branch was resolved unilaterally by the resource manager and
    /// awaits `forget`.
    HeuristicallyCompleted,
}

impl BranchState {
    /// Returns `true` if the branch association can be ended.
    pub fn can_end(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns `true` if the branch can be prepared.
    pub fn can_prepare(&self) -> bool {
        matches!(self, Self::Ended)
    }

    /// Returns `true` if the branch can be rolled back.
    pub fn can_rollback(&self) -> bool {
        matches!(
            self,
            Self::Active | Self::Suspended | Self::Ended | Self::Prepared
        )
    }

    /// Returns `true` if the branch has reached an outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Committed | Self::RolledBack | Self::HeuristicallyCompleted
        )
    }
}

#[derive(Debug, Default)]
struct ResourceState {
    /// The branch currently associated with this handle, if any.
    associated: Option<Xid>,
    /// Every branch this handle has seen that has not been forgotten.
    branches: HashMap<Xid, BranchState>,
    /// Cursor of an open recovery scan.
    scan: Option<VecDeque<Xid>>,
    /// Timeout applied to branches started afterward; 0 means the resource
    /// manager default.
    timeout_secs: u32,
}

/// The two-phase-commit participant bound to one physical connection.
///
/// Exactly one handle exists per [`XaConnection`](crate::xa::XaConnection);
/// it is created lazily on the first resource request and shared by every
/// caller. All protocol commands are carried over the control session. The
/// handle does not own either session and never closes them.
#[derive(Debug)]
pub struct XaResource {
    physical: Arc<dyn Session>,
    control: Arc<dyn Session>,
    identity: String,
    state: Mutex<ResourceState>,
    closed: AtomicBool,
}

impl XaResource {
    pub(crate) fn new(
        physical: Arc<dyn Session>,
        control: Arc<dyn Session>,
        identity: String,
    ) -> Self {
        Self {
            physical,
            control,
            identity,
            state: Mutex::new(ResourceState::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the owning connection's identity string.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Returns `true` once the handle has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Returns the state of `xid` as tracked by this handle, if known.
    pub async fn branch_state(&self, xid: &Xid) -> Option<BranchState> {
        self.state.lock().await.branches.get(xid).copied()
    }

    /// Associates this resource manager with a transaction branch.
    ///
    /// `XA_TMNOFLAGS` starts a brand-new branch, `XA_TMJOIN` joins a branch
    /// already active on this resource manager, and `XA_TMRESUME` resumes a
    /// previously suspended branch. Fails if the handle is already
    /// associated with a branch.
    pub async fn start(&self, xid: &Xid, flags: i32) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.state.lock().await;

        if let Some(current) = &state.associated {
            return Err(SqlGateError::IllegalState(format!(
                "{} is already associated with branch {}",
                self.identity, current
            )));
        }

        let joining = flags & (XA_TMJOIN | XA_TMRESUME) != 0;
        match state.branches.get(xid) {
            None if joining => {
                return Err(SqlGateError::IllegalState(format!(
                    "cannot join or resume unknown branch {}",
                    xid
                )));
            }
            None => {}
            Some(BranchState::Suspended) if flags & XA_TMRESUME != 0 => {}
            Some(BranchState::Active) if flags & XA_TMJOIN != 0 => {}
            Some(branch) if joining => {
                return Err(SqlGateError::IllegalState(format!(
                    "cannot join or resume branch {} in state {:?}",
                    xid, branch
                )));
            }
            Some(_) => {
                return Err(SqlGateError::IllegalState(format!(
                    "branch {} is already known to this resource manager",
                    xid
                )));
            }
        }

        let timeout_secs = state.timeout_secs;
        self.invoke(ControlCommand::Enlist {
            xid: xid.clone(),
            flags,
            timeout_secs,
        })
        .await?;

        state.branches.insert(xid.clone(), BranchState::Active);
        state.associated = Some(xid.clone());
        Ok(())
    }

    /// Dissociates this resource manager from a transaction branch.
    ///
    /// `XA_TMSUSPEND` leaves the branch resumable; `XA_TMSUCCESS` and
    /// `XA_TMFAIL` end it. Fails if `xid` is not the currently associated
    /// branch.
    pub async fn end(&self, xid: &Xid, flags: i32) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.state.lock().await;

        match &state.associated {
            None => {
                return Err(SqlGateError::IllegalState(format!(
                    "{} has no associated branch to end",
                    self.identity
                )));
            }
            Some(current) if current != xid => {
                return Err(SqlGateError::IllegalState(format!(
                    "{} is associated with branch {}, not {}",
                    self.identity, current, xid
                )));
            }
            Some(_) => {}
        }

        self.invoke(ControlCommand::Delist {
            xid: xid.clone(),
            flags,
        })
        .await?;

        let next = if flags & XA_TMSUSPEND != 0 {
            BranchState::Suspended
        } else {
            BranchState::Ended
        };
        state.branches.insert(xid.clone(), next);
        state.associated = None;
        Ok(())
    }

    /// Asks the resource manager to durably prepare the branch and vote.
    ///
    /// A [`XaVote::ReadOnly`] vote completes the branch; no commit will
    /// follow.
    pub async fn prepare(&self, xid: &Xid) -> Result<XaVote> {
        self.ensure_open()?;
        let mut state = self.state.lock().await;

        match state.branches.get(xid) {
            None => {
                return Err(SqlGateError::IllegalState(format!(
                    "unknown branch {}",
                    xid
                )));
            }
            Some(branch) if !branch.can_prepare() => {
                return Err(SqlGateError::IllegalState(format!(
                    "branch {} in state {:?} cannot be prepared",
                    xid, branch
                )));
            }
            Some(_) => {}
        }

        let reply = self.invoke(ControlCommand::Prepare { xid: xid.clone() }).await?;
        let vote = match reply {
            ControlReply::Vote(vote) => vote,
            other => {
                return Err(SqlGateError::Protocol(format!(
                    "unexpected reply to prepare: {:?}",
                    other
                )));
            }
        };

        match vote {
            XaVote::Ok => {
                state.branches.insert(xid.clone(), BranchState::Prepared);
            }
            // Read-only branches have nothing left to resolve.
            XaVote::ReadOnly => {
                state.branches.remove(xid);
            }
        }
        Ok(vote)
    }

    /// Durably applies the branch's changes.
    ///
    /// With `one_phase` the prepare round-trip is skipped entirely and the
    /// resource manager prepares and commits atomically; the branch must be
    /// ended but not prepared. Two-phase commit requires a prepared branch.
    pub async fn commit(&self, xid: &Xid, one_phase: bool) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.state.lock().await;

        let branch = *state.branches.get(xid).ok_or_else(|| {
            SqlGateError::IllegalState(format!("unknown branch {}", xid))
        })?;
        if branch.is_terminal() {
            return Err(SqlGateError::IllegalState(format!(
                "branch {} is already resolved ({:?})",
                xid, branch
            )));
        }
        if one_phase && branch != BranchState::Ended {
            return Err(SqlGateError::IllegalState(format!(
                "branch {} in state {:?} cannot be one-phase committed",
                xid, branch
            )));
        }
        if !one_phase && branch != BranchState::Prepared {
            return Err(SqlGateError::IllegalState(format!(
                "branch {} in state {:?} has not been prepared",
                xid, branch
            )));
        }

        match self
            .invoke(ControlCommand::Commit {
                xid: xid.clone(),
                one_phase,
            })
            .await
        {
            Ok(_) => {
                state.branches.insert(xid.clone(), BranchState::Committed);
                Ok(())
            }
            Err(err) => Err(self.record_heuristic(&mut state, xid, err)),
        }
    }

    /// Durably discards the branch's changes.
    pub async fn rollback(&self, xid: &Xid) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.state.lock().await;

        let branch = *state.branches.get(xid).ok_or_else(|| {
            SqlGateError::IllegalState(format!("unknown branch {}", xid))
        })?;
        if !branch.can_rollback() {
            return Err(SqlGateError::IllegalState(format!(
                "branch {} in state {:?} cannot be rolled back",
                xid, branch
            )));
        }

        match self
            .invoke(ControlCommand::Rollback { xid: xid.clone() })
            .await
        {
            Ok(_) => {
                if state.associated.as_ref() == Some(xid) {
                    state.associated = None;
                }
                state.branches.insert(xid.clone(), BranchState::RolledBack);
                Ok(())
            }
            Err(err) => Err(self.record_heuristic(&mut state, xid, err)),
        }
    }

    /// Discards bookkeeping for a heuristically resolved branch.
    ///
    /// Forgetting a branch this handle does not know is a no-op; forgetting
    /// a live branch is a contract violation.
    pub async fn forget(&self, xid: &Xid) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.state.lock().await;

        match state.branches.get(xid) {
            None => {
                tracing::debug!(identity = %self.identity, xid = %xid, "forget for unknown branch");
                Ok(())
            }
            Some(BranchState::HeuristicallyCompleted) => {
                self.invoke(ControlCommand::Forget { xid: xid.clone() }).await?;
                state.branches.remove(xid);
                Ok(())
            }
            Some(branch) => Err(SqlGateError::IllegalState(format!(
                "branch {} in state {:?} was not heuristically completed",
                xid, branch
            ))),
        }
    }

    /// Lists transaction branches held in a prepared or heuristically
    /// resolved state, for coordinator-driven crash recovery.
    ///
    /// `XA_TMSTARTRSCAN` (re)issues the coordinator scan and restarts the
    /// cursor, `XA_TMNOFLAGS` continues an open scan, and `XA_TMENDRSCAN`
    /// closes it. At most a batch of identifiers is returned per call; an
    /// empty result means the scan is exhausted.
    pub async fn recover(&self, flags: i32) -> Result<Vec<Xid>> {
        self.ensure_open()?;
        let mut state = self.state.lock().await;

        if flags & XA_TMSTARTRSCAN != 0 {
            let reply = self.invoke(ControlCommand::Recover { flags }).await?;
            let xids = match reply {
                ControlReply::Branches(xids) => xids,
                other => {
                    return Err(SqlGateError::Protocol(format!(
                        "unexpected reply to recover: {:?}",
                        other
                    )));
                }
            };
            state.scan = Some(VecDeque::from(xids));
        } else if state.scan.is_none() {
            if flags & XA_TMENDRSCAN != 0 {
                return Ok(Vec::new());
            }
            return Err(SqlGateError::IllegalState(
                "no recovery scan in progress".to_string(),
            ));
        }

        let scan = state.scan.as_mut().expect("scan cursor present");
        let count = scan.len().min(RECOVER_BATCH);
        let batch: Vec<Xid> = scan.drain(..count).collect();

        if flags & XA_TMENDRSCAN != 0 {
            state.scan = None;
        }
        Ok(batch)
    }

    /// Returns `true` if `other` represents the same resource manager.
    ///
    /// Two handles are the same resource manager iff their physical
    /// sessions carry the same resource-manager identity token; a
    /// coordinator may then bundle their branches into one two-phase-commit
    /// decision. Handle object identity plays no part.
    pub fn is_same_rm(&self, other: &XaResource) -> bool {
        self.physical.resource_manager_id() == other.physical.resource_manager_id()
    }

    /// Returns the timeout applied to branches started afterward, in
    /// seconds. Zero means the resource manager default.
    pub async fn transaction_timeout(&self) -> u32 {
        self.state.lock().await.timeout_secs
    }

    /// Sets the timeout applied to branches started afterward, in seconds.
    ///
    /// Returns `true` if the timeout was accepted; a closed handle rejects
    /// the change.
    pub async fn set_transaction_timeout(&self, seconds: u32) -> bool {
        if self.is_closed() {
            return false;
        }
        self.state.lock().await.timeout_secs = seconds;
        true
    }

    /// Releases the bookkeeping this handle holds.
    ///
    /// The physical and control sessions are owned by the connection and
    /// are not touched. Safe to call any number of times.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let mut state = self.state.lock().await;
        if !state.branches.is_empty() {
            tracing::debug!(
                identity = %self.identity,
                branches = state.branches.len(),
                "discarding branch bookkeeping on close"
            );
        }
        state.associated = None;
        state.branches.clear();
        state.scan = None;

        tracing::debug!(identity = %self.identity, "closed XA resource handle");
        Ok(())
    }

    /// Marks the branch heuristically completed when the coordinator
    /// reported a heuristic outcome, then hands the error back.
    fn record_heuristic(
        &self,
        state: &mut ResourceState,
        xid: &Xid,
        err: SqlGateError,
    ) -> SqlGateError {
        if err.xa_code().is_some_and(is_heuristic_code) {
            tracing::warn!(
                identity = %self.identity,
                xid = %xid,
                error = %err,
                "branch resolved heuristically"
            );
            state
                .branches
                .insert(xid.clone(), BranchState::HeuristicallyCompleted);
        }
        err
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(SqlGateError::IllegalState(format!(
                "XA resource handle for {} is closed",
                self.identity
            )));
        }
        Ok(())
    }

    async fn invoke(&self, command: ControlCommand) -> Result<ControlReply> {
        if !self.control.is_open() {
            return Err(SqlGateError::Connection(format!(
                "control connection for {} is closed",
                self.identity
            )));
        }
        tracing::trace!(
            identity = %self.identity,
            command = command.name(),
            "issuing coordinator command"
        );
        self.control.execute(command).await
    }
}
