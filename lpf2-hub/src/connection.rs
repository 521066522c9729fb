//! Connection lifecycle
//!
//! ```text
//! Idle ──connect──> Connecting ──ok──> Connected ──disconnect──> Idle
//!                        │                  │
//!                        └──error──> Failed └──link lost──> Idle
//! Failed ──connect──> Connecting
//! ```
//!
//! Every connect attempt opens a new session. Notifications and late
//! completions carrying an older session id are ignored.

use std::fmt;
use std::sync::Arc;

use lpf2_transport::Connection;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::error::HubError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Session id handed out per connect attempt
pub type SessionId = u64;

/// State, link and notification pump of the current session
///
/// Lives behind a mutex that is never held across an await point, so all
/// methods are synchronous. Closing the link itself is left to the caller.
#[derive(Default)]
pub(crate) struct Lifecycle {
    state: ConnectionState,
    session: SessionId,
    connection: Option<Arc<dyn Connection>>,
    pump: Option<JoinHandle<()>>,
}

impl Lifecycle {
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Enter `Connecting` and open a new session
    pub fn begin_connect(&mut self) -> Result<SessionId, HubError> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => Err(
                HubError::InvalidArgument(format!("Hub is already {}", self.state)),
            ),
            ConnectionState::Idle | ConnectionState::Failed => {
                self.session += 1;
                self.state = ConnectionState::Connecting;
                Ok(self.session)
            }
        }
    }

    /// Enter `Connected` with the opened link and its notification pump
    ///
    /// Returns the pieces back when the session was superseded in the
    /// meantime (e.g. by a disconnect), after aborting the pump.
    pub fn complete(
        &mut self,
        session: SessionId,
        connection: Arc<dyn Connection>,
        pump: JoinHandle<()>,
    ) -> Result<(), Arc<dyn Connection>> {
        if session != self.session || self.state != ConnectionState::Connecting {
            pump.abort();
            return Err(connection);
        }
        self.state = ConnectionState::Connected;
        self.connection = Some(connection);
        self.pump = Some(pump);
        Ok(())
    }

    /// Enter `Failed` if `session` is still current
    pub fn fail(&mut self, session: SessionId) -> Option<Arc<dyn Connection>> {
        if session != self.session {
            return None;
        }
        self.state = ConnectionState::Failed;
        self.release()
    }

    /// Enter `Idle` and invalidate the current session
    pub fn teardown(&mut self) -> Option<Arc<dyn Connection>> {
        self.session += 1;
        self.state = ConnectionState::Idle;
        self.release()
    }

    /// The pump saw its channel close: the link went away under us
    ///
    /// The pump task is finishing on its own, so it is only forgotten.
    pub fn link_lost(&mut self, session: SessionId) -> bool {
        if session != self.session || self.state != ConnectionState::Connected {
            return false;
        }
        self.session += 1;
        self.state = ConnectionState::Idle;
        self.pump = None;
        self.connection = None;
        true
    }

    /// Link for a write or registry mutation
    pub fn connected(&self) -> Result<Arc<dyn Connection>, HubError> {
        match (&self.state, &self.connection) {
            (ConnectionState::Connected, Some(connection)) => Ok(Arc::clone(connection)),
            _ => Err(HubError::NotConnected),
        }
    }

    fn release(&mut self) -> Option<Arc<dyn Connection>> {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.connection.take()
    }
}
