//! Connection lifecycle states.

/// Lifecycle state of a connection.
///
/// ```text
/// Connecting -> Open -> Closing -> Closed
///      \          \        \
///       +----------+--------+----> Errored
/// ```
///
/// `Closed` and `Errored` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ConnectionState {
    /// The transport is still establishing the connection.
    #[default]
    Connecting,
    /// The connection is open and ready for data transfer.
    Open,
    /// Close requested, waiting for the transport to confirm.
    Closing,
    /// The connection closed cleanly.
    Closed,
    /// The transport reported a failure.
    Errored,
}

impl ConnectionState {
    /// Returns `true` for `Closed` and `Errored`.
    #[must_use]
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Errored)
    }

    /// Check if sending data is allowed in this state.
    ///
    /// Returns `true` only for `Open` state.
    #[must_use]
    #[inline]
    pub const fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Check whether the state machine permits moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Open)
                | (Open, Closing)
                | (Closing, Closed)
                | (Connecting | Open, Closed)
                | (Connecting | Open | Closing, Errored)
        )
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Closing => write!(f, "Closing"),
            ConnectionState::Closed => write!(f, "Closed"),
            ConnectionState::Errored => write!(f, "Errored"),
        }
    }
}
