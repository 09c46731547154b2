//! Connection lifecycle states

use std::fmt;

use tokio::time::Instant;

/// Observable state of the connection manager
///
/// ```text
/// Disconnected -> Connecting -> Connected -> Reconnecting -> Connecting ...
///                      \______________________/
/// any state -> Closed (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created but not started
    Disconnected,
    /// A connect attempt is in flight
    Connecting,
    /// Reading from the socket
    Connected,
    /// Waiting out the backoff before the next attempt
    Reconnecting {
        /// Consecutive failed attempts since the last successful connect
        attempt: u32,
        backoff_until: Instant,
    },
    /// Stopped; no further transitions
    Closed,
}

impl ConnectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Current retry attempt, if waiting to reconnect
    pub fn attempt(&self) -> Option<u32> {
        match self {
            Self::Reconnecting { attempt, .. } => Some(*attempt),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting { .. } => "reconnecting",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reconnecting { attempt, .. } => write!(f, "reconnecting (attempt {})", attempt),
            other => f.write_str(other.name()),
        }
    }
}
