use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// How [`Transport::read_available`] should wait for data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Return immediately; an empty result means nothing is queued.
    NonBlocking,
    /// Wait for at least one byte. `None` waits indefinitely.
    Blocking { timeout: Option<Duration> },
}

impl ReadMode {
    /// Blocking read bounded by `timeout`.
    pub fn blocking(timeout: Duration) -> Self {
        ReadMode::Blocking {
            timeout: Some(timeout),
        }
    }
}

/// A connected byte-stream session the control client talks through.
///
/// Implementations are used by exactly one client at a time; none of the
/// methods need to be safe against concurrent callers.
pub trait Transport {
    /// Write every byte of `bytes` or fail. Never short-writes.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read up to `max_bytes` bytes.
    ///
    /// In [`ReadMode::NonBlocking`] mode an empty result means no data is
    /// queued. In blocking mode the result is never empty: the call waits for
    /// data, fails with `Timeout` once the bound elapses, or fails with
    /// `PeerClosed` on end of stream.
    fn read_available(&mut self, max_bytes: usize, mode: ReadMode) -> Result<Bytes>;

    /// Release the connection. Safe to call repeatedly.
    fn close(&mut self);

    /// Whether `close` has not been called yet.
    fn is_open(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }

    fn read_available(&mut self, max_bytes: usize, mode: ReadMode) -> Result<Bytes> {
        (**self).read_available(max_bytes, mode)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}
