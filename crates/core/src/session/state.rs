//! The session's finite-state record and its read-only projection.

use std::fmt;
use std::time::Instant;

use serde::Serialize;

/// Where the session currently is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Disconnected => "disconnected",
            SessionPhase::Connecting => "connecting",
            SessionPhase::Connected => "connected",
            SessionPhase::Reconnecting => "reconnecting",
            SessionPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The single mutable record behind the exclusive critical section.
///
/// `handle` is present exactly while the link is physically open; every
/// transition that drops it must close the link first.
pub(super) struct SessionState<H> {
    pub phase: SessionPhase,
    pub handle: Option<H>,
    pub established_at: Option<Instant>,
    pub last_activity_at: Option<Instant>,
    pub reconnect_attempts: u32,
    pub last_error: Option<String>,
}

impl<H> SessionState<H> {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Disconnected,
            handle: None,
            established_at: None,
            last_activity_at: None,
            reconnect_attempts: 0,
            last_error: None,
        }
    }
}

/// Copy of the session state published after every transition, so status
/// queries never wait behind an in-flight device operation.
#[derive(Debug, Clone)]
pub(super) struct Snapshot {
    pub phase: SessionPhase,
    pub established_at: Option<Instant>,
    pub last_activity_at: Option<Instant>,
    pub reconnect_attempts: u32,
    pub last_error: Option<String>,
}

impl Snapshot {
    pub fn initial() -> Self {
        Self {
            phase: SessionPhase::Disconnected,
            established_at: None,
            last_activity_at: None,
            reconnect_attempts: 0,
            last_error: None,
        }
    }

    pub fn of<H>(state: &SessionState<H>) -> Self {
        Self {
            phase: state.phase,
            established_at: state.established_at,
            last_activity_at: state.last_activity_at,
            reconnect_attempts: state.reconnect_attempts,
            last_error: state.last_error.clone(),
        }
    }
}

/// Point-in-time view of the session, safe to request from anywhere.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub phase: SessionPhase,
    /// Seconds since the current link was established, when one is open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_age_secs: Option<u64>,
    /// Seconds since the last successful operation or (re)connect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_secs: Option<u64>,
    pub reconnect_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl ConnectionInfo {
    pub(super) fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            phase: snapshot.phase,
            session_age_secs: snapshot.established_at.map(|at| at.elapsed().as_secs()),
            idle_secs: snapshot.last_activity_at.map(|at| at.elapsed().as_secs()),
            reconnect_attempts: snapshot.reconnect_attempts,
            last_error: snapshot.last_error.clone(),
        }
    }
}
