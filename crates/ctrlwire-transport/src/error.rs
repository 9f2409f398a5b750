use std::time::Duration;

/// Errors that can occur in transport session operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The host/port pair did not resolve to any socket address.
    #[error("failed to resolve {target}: {source}")]
    Resolve {
        target: String,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        source: std::io::Error,
    },

    /// The connection was not established within the connect timeout.
    #[error("connect to {target} timed out after {after:?}")]
    ConnectTimeout { target: String, after: Duration },

    /// A blocking read or write did not complete within its timeout.
    #[error("transport operation timed out after {after:?}")]
    Timeout { after: Duration },

    /// The remote end closed the connection.
    #[error("connection closed by peer")]
    PeerClosed,

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The session has been closed locally.
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// True for the errors that mean "no connection could be established".
    pub fn is_connect_failure(&self) -> bool {
        matches!(
            self,
            TransportError::Resolve { .. }
                | TransportError::Connect { .. }
                | TransportError::ConnectTimeout { .. }
        )
    }

    /// True when the error is a bounded wait that expired.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            TransportError::Timeout { .. } | TransportError::ConnectTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
