use std::fmt;
use std::time::Duration;

use ctrlwire_frame::{FrameError, ParseError};
use ctrlwire_transport::TransportError;

/// Which part of a reply disagreed with the command that was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchField {
    TransactionId,
    Verb,
    Variable,
    Value,
}

impl fmt::Display for MismatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MismatchField::TransactionId => "transaction id",
            MismatchField::Verb => "verb",
            MismatchField::Variable => "variable",
            MismatchField::Value => "value",
        })
    }
}

/// Errors that can occur while running a command.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error (connect, write, read, peer closed).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The command could not be encoded.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The reply to the pending command did not decode.
    #[error("malformed reply {payload:?}: {source}")]
    Protocol { payload: String, source: ParseError },

    /// A reply arrived but disagreed with what was sent.
    #[error("reply {field} mismatch: expected {expected:?}, got {actual:?}")]
    Mismatch {
        field: MismatchField,
        expected: String,
        actual: String,
    },

    /// The peer answered with an ERROR reply.
    #[error("command on {variable} rejected: {reason}")]
    Rejected { variable: String, reason: String },

    /// No reply arrived within the reply timeout.
    #[error("no reply within {0:?}")]
    Timeout(Duration),
}

impl ClientError {
    pub fn is_timeout(&self) -> bool {
        match self {
            ClientError::Timeout(_) => true,
            ClientError::Transport(err) => err.is_timeout(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
