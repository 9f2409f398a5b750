use std::time::Duration;

use ctrlwire_transport::DEFAULT_CONNECT_TIMEOUT;

/// Tunables for a control client connection.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bound on establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Bound on waiting for a reply, measured from the start of the receive
    /// loop. `None` waits indefinitely.
    pub reply_timeout: Option<Duration>,
    /// Bound on each blocking write.
    pub write_timeout: Option<Duration>,
    /// Most bytes a single drain pass reads before giving control back.
    pub max_drain_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reply_timeout: Some(Duration::from_secs(10)),
            write_timeout: Some(Duration::from_secs(5)),
            max_drain_bytes: 64 * 1024,
        }
    }
}

impl ClientConfig {
    /// Wait for replies without any bound.
    pub fn with_indefinite_wait(mut self) -> Self {
        self.reply_timeout = None;
        self
    }
}
