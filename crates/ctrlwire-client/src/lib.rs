//! Control protocol client.
//!
//! Connect to a control endpoint, issue GET/SET commands one at a time, and
//! get back verified replies. Unsolicited TRAP notifications that arrive
//! before or between replies are handed to a notification handler and never
//! mistaken for the answer to a command.

pub mod client;
pub mod config;
pub mod connector;
pub mod error;

pub use client::{CommandReply, CtrlClient, NotificationHandler};
pub use config::ClientConfig;
pub use connector::{connect, connect_with_config};
pub use error::{ClientError, MismatchField, Result};
