use crate::message::Verb;

/// Errors that can occur while building frames and commands.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload does not fit the 2-byte length prefix.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A token that must be a single word was empty or contained whitespace.
    #[error("invalid {what} {token:?}: must be non-empty and contain no whitespace")]
    InvalidToken { what: &'static str, token: String },

    /// The verb requires a value but none was given.
    #[error("{0} requires a value")]
    MissingValue(Verb),

    /// The verb does not carry a value but one was given.
    #[error("{0} does not take a value")]
    UnexpectedValue(Verb),

    /// An I/O error occurred while reading frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

/// Errors produced when a frame payload does not decode into a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty payload")]
    Empty,

    #[error("payload is not valid UTF-8")]
    NotUtf8,

    #[error("missing {0}")]
    MissingToken(&'static str),

    #[error("unrecognized verb {0:?}")]
    UnknownVerb(String),

    #[error("{0} message without a value")]
    MissingValue(Verb),

    #[error("{0} message must not carry a value")]
    UnexpectedValue(Verb),
}

pub type Result<T> = std::result::Result<T, FrameError>;
