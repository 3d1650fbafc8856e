//! The established-session capability surface.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use sqlgate_core::{ControlCommand, ControlReply, Result};

use crate::config::ConnectionProperties;

/// An established session with the server.
///
/// One logical operation is in flight per session at a time; serializing
/// access is the session layer's responsibility. The XA components route
/// application traffic to the physical session and coordinator commands to
/// the control session, never mixing the two on one socket.
#[async_trait]
pub trait Session: Send + Sync + fmt::Debug {
    /// The identity string this session was established under, used to
    /// correlate diagnostics.
    fn identity(&self) -> &str;

    /// A stable token identifying the resource manager this session is
    /// connected to.
    ///
    /// Two sessions carry the same token iff the server recognizes them as
    /// the same resource manager, which is what permits a coordinator to
    /// bundle their branches into one two-phase-commit decision.
    fn resource_manager_id(&self) -> &str;

    /// The resolved property set this session was established with.
    fn properties(&self) -> &ConnectionProperties;

    /// Returns `true` while the session is usable.
    fn is_open(&self) -> bool;

    /// Issues a transaction-coordinator command and returns its reply.
    ///
    /// The byte-level encoding of the command is this layer's concern.
    async fn execute(&self, command: ControlCommand) -> Result<ControlReply>;

    /// Closes the session. Safe to call more than once.
    async fn close(&self) -> Result<()>;
}

/// Establishes new sessions from a resolved property set.
#[async_trait]
pub trait SessionConnector: Send + Sync + fmt::Debug {
    /// Opens a new, distinct session under the given identity.
    ///
    /// Every call produces a separate transport; sessions are never
    /// multiplexed.
    async fn establish(
        &self,
        identity: &str,
        properties: &ConnectionProperties,
    ) -> Result<Arc<dyn Session>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Object safety: both seams must be usable as trait objects.
    #[test]
    fn test_traits_are_object_safe() {
        fn takes_session(_: &Arc<dyn Session>) {}
        fn takes_connector(_: &Arc<dyn SessionConnector>) {}
        let _ = takes_session;
        let _ = takes_connector;
    }
}
