/// Connection state definitions for the delivery channel
use std::fmt;

/// Where the publisher stands with the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No usable channel and no reconnect in flight
    Disconnected,

    /// A background reconnect cycle is running
    Connecting,

    /// A channel is open and the destination is declared
    Connected,
}

impl ConnectionState {
    /// Returns true if records can be delivered right now
    pub fn can_deliver(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
