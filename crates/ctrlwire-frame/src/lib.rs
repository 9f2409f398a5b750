//! Length-prefixed framing and command codec for text control protocols.
//!
//! Every message on the wire is framed with a 2-byte big-endian payload
//! length. The payload is a single line of text:
//!
//! ```text
//! <transaction_id> <VERB> <variable>[ <value>]
//! ```
//!
//! Everything in this crate is a pure transformation; no I/O happens here
//! except in [`FrameReader`], which pulls whole frames off any `Read`.

pub mod codec;
pub mod error;
pub mod message;
pub mod reader;

pub use codec::{encode_frame, extract_frame, split_combined, Frame, HEADER_SIZE, MAX_PAYLOAD};
pub use error::{FrameError, ParseError, Result};
pub use message::{decode_message, encode_command, is_notification, Message, Verb};
pub use reader::FrameReader;
