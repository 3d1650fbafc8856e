//! Shared stub collaborators for integration tests.
//!
//! The session, pooling, and connector seams are filled in with stubs that
//! record every observable action in a shared chronological event log, so
//! tests can assert not just what happened but in which order.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use sqlgate_client::{
    ConnectionPool, ConnectionProperties, DataSourceConfig, Session, SessionConnector,
};
use sqlgate_core::{ControlCommand, ControlReply, Result, SqlGateError, XaVote, Xid};

/// Chronological record of observable collaborator actions.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn new_event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Returns the position of the first event starting with `prefix`.
pub fn event_position(log: &EventLog, prefix: &str) -> Option<usize> {
    log.lock().unwrap().iter().position(|e| e.starts_with(prefix))
}

pub fn event_count(log: &EventLog, prefix: &str) -> usize {
    log.lock()
        .unwrap()
        .iter()
        .filter(|e| e.starts_with(prefix))
        .count()
}

/// A scripted session that logs its lifecycle and every coordinator
/// command it carries.
#[derive(Debug)]
pub struct StubSession {
    identity: String,
    rm_id: String,
    properties: ConnectionProperties,
    open: AtomicBool,
    log: EventLog,
    pub commands: Mutex<Vec<ControlCommand>>,
    pub vote: Mutex<XaVote>,
    pub recover_xids: Mutex<Vec<Xid>>,
    pub fail_close: AtomicBool,
}

impl StubSession {
    pub fn new(identity: &str, properties: ConnectionProperties, log: EventLog) -> Arc<Self> {
        let rm_id = format!(
            "{}:{}/{}",
            properties.server_name().unwrap_or("localhost"),
            properties.port_number().unwrap_or(0),
            properties.database_name().unwrap_or("master"),
        );
        Arc::new(Self {
            identity: identity.to_string(),
            rm_id,
            properties,
            open: AtomicBool::new(true),
            log,
            commands: Mutex::new(Vec::new()),
            vote: Mutex::new(XaVote::Ok),
            recover_xids: Mutex::new(Vec::new()),
            fail_close: AtomicBool::new(false),
        })
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        self.commands.lock().unwrap().iter().map(|c| c.name()).collect()
    }
}

#[async_trait]
impl Session for StubSession {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn resource_manager_id(&self) -> &str {
        &self.rm_id
    }

    fn properties(&self) -> &ConnectionProperties {
        &self.properties
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    async fn execute(&self, command: ControlCommand) -> Result<ControlReply> {
        if !self.is_open() {
            return Err(SqlGateError::Connection(format!(
                "session {} is closed",
                self.identity
            )));
        }
        self.commands.lock().unwrap().push(command.clone());
        Ok(match command {
            ControlCommand::Prepare { .. } => ControlReply::Vote(*self.vote.lock().unwrap()),
            ControlCommand::Recover { .. } => {
                ControlReply::Branches(self.recover_xids.lock().unwrap().clone())
            }
            _ => ControlReply::Done,
        })
    }

    async fn close(&self) -> Result<()> {
        if self.fail_close.load(Ordering::Acquire) {
            return Err(SqlGateError::Connection(format!(
                "close of {} failed",
                self.identity
            )));
        }
        if self.open.swap(false, Ordering::AcqRel) {
            self.log
                .lock()
                .unwrap()
                .push(format!("close:{}", self.identity));
        }
        Ok(())
    }
}

/// A pooling layer that mints one stub physical session per acquire.
#[derive(Debug)]
pub struct StubPool {
    log: EventLog,
    counter: AtomicU64,
    pub physical_sessions: Mutex<Vec<Arc<StubSession>>>,
}

impl StubPool {
    pub fn new(log: EventLog) -> Arc<Self> {
        Arc::new(Self {
            log,
            counter: AtomicU64::new(0),
            physical_sessions: Mutex::new(Vec::new()),
        })
    }

    pub fn last_physical(&self) -> Arc<StubSession> {
        self.physical_sessions
            .lock()
            .unwrap()
            .last()
            .expect("no physical session acquired")
            .clone()
    }
}

#[async_trait]
impl ConnectionPool for StubPool {
    async fn acquire(
        &self,
        config: &DataSourceConfig,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Result<Arc<dyn Session>> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let properties = config.to_properties(user, password);
        let session = StubSession::new(&format!("physical-{}", n), properties, self.log.clone());
        self.physical_sessions.lock().unwrap().push(session.clone());
        self.log
            .lock()
            .unwrap()
            .push(format!("acquire:{}", session.identity()));
        Ok(session)
    }

    async fn release(&self, session: &Arc<dyn Session>) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("release:{}", session.identity()));
        Ok(())
    }
}

/// A connector that opens stub control sessions and captures the property
/// sets it was handed.
#[derive(Debug)]
pub struct StubConnector {
    log: EventLog,
    pub fail_next: AtomicBool,
    pub established: Mutex<Vec<Arc<StubSession>>>,
    pub captured_properties: Mutex<Vec<ConnectionProperties>>,
}

impl StubConnector {
    pub fn new(log: EventLog) -> Arc<Self> {
        Arc::new(Self {
            log,
            fail_next: AtomicBool::new(false),
            established: Mutex::new(Vec::new()),
            captured_properties: Mutex::new(Vec::new()),
        })
    }

    pub fn last_established(&self) -> Arc<StubSession> {
        self.established
            .lock()
            .unwrap()
            .last()
            .expect("no session established")
            .clone()
    }
}

#[async_trait]
impl SessionConnector for StubConnector {
    async fn establish(
        &self,
        identity: &str,
        properties: &ConnectionProperties,
    ) -> Result<Arc<dyn Session>> {
        if self.fail_next.swap(false, Ordering::AcqRel) {
            return Err(SqlGateError::Connection(
                "control connection refused".to_string(),
            ));
        }
        self.captured_properties
            .lock()
            .unwrap()
            .push(properties.clone());
        let session = StubSession::new(identity, properties.clone(), self.log.clone());
        self.established.lock().unwrap().push(session.clone());
        self.log
            .lock()
            .unwrap()
            .push(format!("establish:{}", identity));
        Ok(session)
    }
}

pub fn test_config() -> DataSourceConfig {
    DataSourceConfig::builder()
        .server_name("db.test.local")
        .port_number(1543)
        .database_name("orders")
        .credentials("app", "secret")
        .select_method("cursor")
        .send_string_parameters_as_unicode(false)
        .build()
        .expect("failed to build test config")
}
