//! TCP session transport for control-protocol connections.
//!
//! This is the lowest layer of ctrlwire. It owns exactly one stream socket to a
//! remote control endpoint and offers blocking connect, full writes, and reads
//! that either block (optionally bounded) or return immediately with whatever is
//! already queued in the kernel buffer.
//!
//! Everything above builds on the [`Transport`] trait; [`TcpSession`] is the
//! production implementation.

pub mod error;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use tcp::{TcpSession, DEFAULT_CONNECT_TIMEOUT};
pub use traits::{ReadMode, Transport};
