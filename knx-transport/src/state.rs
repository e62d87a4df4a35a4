//! Transport connection state machine

/// State of a point-to-point transport connection
///
/// Tracks the lifecycle of a transport connection so operations run
/// only while the connection is in the right state.
///
/// # State Transitions
/// ```text
/// Closed -> Connecting (on connect)
/// Connecting -> Open (connect confirmed)
/// Connecting -> Closed (on error/timeout)
/// Open -> Disconnecting (on close)
/// Disconnecting -> Closed (teardown finished)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport connection (initial and final state)
    Closed,
    /// Connection request sent, waiting for the link to confirm
    Connecting,
    /// Connection established, exchanges can run
    Open,
    /// Teardown in progress, no new exchanges accepted
    Disconnecting,
}

impl SessionState {
    /// Check if the connection is ready for exchanges
    pub fn is_open(&self) -> bool {
        matches!(self, SessionState::Open)
    }

    /// Check if the connection is fully closed
    pub fn is_closed(&self) -> bool {
        matches!(self, SessionState::Closed)
    }

    /// Check if the connection can still be closed
    pub fn can_close(&self) -> bool {
        !matches!(self, SessionState::Closed)
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Closed => "Closed",
            SessionState::Connecting => "Connecting",
            SessionState::Open => "Open",
            SessionState::Disconnecting => "Disconnecting",
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Closed
    }
}
