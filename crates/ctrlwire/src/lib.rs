//! Client for length-framed text control protocols.
//!
//! ctrlwire talks to control interfaces that multiplex GET/SET request/reply
//! exchanges with unsolicited TRAP notifications on one TCP stream, such as
//! the CTRL port of Osmocom network elements.
//!
//! # Crate Structure
//!
//! - [`transport`]: Blocking TCP session with non-blocking drain reads
//! - [`frame`]: Length-prefixed framing and the text command codec
//! - [`client`]: Command/reply correlation and verification (behind `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use ctrlwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use ctrlwire_frame::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use ctrlwire_client::*;
}
