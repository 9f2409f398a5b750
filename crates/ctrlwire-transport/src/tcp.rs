use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{ReadMode, Transport};

/// Connect timeout used by [`TcpSession::connect`].
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A single persistent TCP connection to a control endpoint.
///
/// The session is closed exactly once, either explicitly through
/// [`Transport::close`] or when dropped. Every operation after close fails
/// with [`TransportError::Shutdown`].
pub struct TcpSession {
    stream: Option<TcpStream>,
    peer: SocketAddr,
    write_timeout: Option<Duration>,
}

impl TcpSession {
    /// Connect to `host:port` using [`DEFAULT_CONNECT_TIMEOUT`].
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        Self::connect_timeout(host, port, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Connect to `host:port`, trying every resolved address in turn.
    ///
    /// Each address attempt is bounded by `timeout`. If the last attempt timed
    /// out the error is [`TransportError::ConnectTimeout`], otherwise
    /// [`TransportError::Connect`] with the final OS error.
    pub fn connect_timeout(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let target = format!("{host}:{port}");
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|source| TransportError::Resolve {
                target: target.clone(),
                source,
            })?
            .collect();

        let mut last_err = std::io::Error::new(ErrorKind::NotFound, "no addresses resolved");
        if addrs.is_empty() {
            return Err(TransportError::Resolve {
                target,
                source: last_err,
            });
        }

        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    info!(%addr, "connected to control endpoint");
                    return Ok(Self {
                        stream: Some(stream),
                        peer: addr,
                        write_timeout: None,
                    });
                }
                Err(err) => {
                    debug!(%addr, error = %err, "connect attempt failed");
                    last_err = err;
                }
            }
        }

        if last_err.kind() == ErrorKind::TimedOut {
            Err(TransportError::ConnectTimeout {
                target,
                after: timeout,
            })
        } else {
            Err(TransportError::Connect {
                target,
                source: last_err,
            })
        }
    }

    /// Address of the connected endpoint.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Bound every subsequent write. `None` lets writes block indefinitely.
    pub fn set_write_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.stream_mut()?.set_write_timeout(timeout)?;
        self.write_timeout = timeout;
        Ok(())
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream> {
        self.stream.as_mut().ok_or(TransportError::Shutdown)
    }
}

impl Transport for TcpSession {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let write_timeout = self.write_timeout;
        let stream = self.stream_mut()?;

        let mut offset = 0usize;
        while offset < bytes.len() {
            match stream.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::PeerClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(TransportError::Timeout {
                        after: write_timeout.unwrap_or_default(),
                    })
                }
                Err(err) if is_disconnect(&err) => return Err(TransportError::PeerClosed),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        stream.flush()?;

        debug!(bytes = bytes.len(), "wrote to control endpoint");
        Ok(())
    }

    fn read_available(&mut self, max_bytes: usize, mode: ReadMode) -> Result<Bytes> {
        let stream = self.stream_mut()?;
        let mut buf = vec![0u8; max_bytes.max(1)];

        let read = match mode {
            ReadMode::NonBlocking => match recv_nonblocking(stream, &mut buf)? {
                Some(n) => n,
                None => return Ok(Bytes::new()),
            },
            ReadMode::Blocking { timeout } => read_blocking(stream, &mut buf, timeout)?,
        };

        if read == 0 {
            debug!("control endpoint closed the connection");
            return Err(TransportError::PeerClosed);
        }

        buf.truncate(read);
        Ok(Bytes::from(buf))
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            info!(peer = %self.peer, "connection closed");
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for TcpSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for TcpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpSession")
            .field("peer", &self.peer)
            .field("open", &self.stream.is_some())
            .finish()
    }
}

fn read_blocking(
    stream: &mut TcpStream,
    buf: &mut [u8],
    timeout: Option<Duration>,
) -> Result<usize> {
    // The OS rejects a zero read timeout, so an already-expired deadline is
    // reported here.
    if timeout == Some(Duration::ZERO) {
        return Err(TransportError::Timeout {
            after: Duration::ZERO,
        });
    }
    stream.set_read_timeout(timeout)?;

    loop {
        match stream.read(buf) {
            Ok(n) => return Ok(n),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Err(TransportError::Timeout {
                    after: timeout.unwrap_or_default(),
                })
            }
            Err(err) if is_disconnect(&err) => return Err(TransportError::PeerClosed),
            Err(err) => return Err(TransportError::Io(err)),
        }
    }
}

/// Read whatever is queued without blocking. `Ok(None)` means nothing is queued.
#[cfg(unix)]
fn recv_nonblocking(stream: &mut TcpStream, buf: &mut [u8]) -> Result<Option<usize>> {
    use std::os::fd::AsRawFd;

    let fd = stream.as_raw_fd();
    loop {
        // SAFETY: `buf` is a valid writable region of `buf.len()` bytes for the
        // duration of the call, and `fd` is the open socket owned by `stream`.
        let rc = unsafe {
            libc::recv(
                fd,
                buf.as_mut_ptr().cast::<libc::c_void>(),
                buf.len(),
                libc::MSG_DONTWAIT,
            )
        };
        if rc >= 0 {
            return Ok(Some(rc as usize));
        }

        let err = std::io::Error::last_os_error();
        match err.kind() {
            ErrorKind::Interrupted => continue,
            ErrorKind::WouldBlock => return Ok(None),
            _ if is_disconnect(&err) => return Err(TransportError::PeerClosed),
            _ => return Err(TransportError::Io(err)),
        }
    }
}

#[cfg(not(unix))]
fn recv_nonblocking(stream: &mut TcpStream, buf: &mut [u8]) -> Result<Option<usize>> {
    stream.set_nonblocking(true)?;
    let result = loop {
        match stream.read(buf) {
            Ok(n) => break Ok(Some(n)),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => break Ok(None),
            Err(err) if is_disconnect(&err) => break Err(TransportError::PeerClosed),
            Err(err) => break Err(TransportError::Io(err)),
        }
    };
    stream.set_nonblocking(false)?;
    result
}

fn is_disconnect(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
    )
}
