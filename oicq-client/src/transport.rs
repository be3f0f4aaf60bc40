//! Blocking TCP transport backing the async client.
//!
//! The session state machine is synchronous; this transport gives it a
//! real socket with a short read timeout so the machine's own deadline
//! checks stay responsive. The async layer runs the whole thing on a
//! blocking task.

use std::io::{Read, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use oicq_wtlogin::transport::{Transport, TransportError, TransportErrorKind};

fn classify(err: &std::io::Error) -> TransportErrorKind {
    use std::io::ErrorKind;
    match err.kind() {
        ErrorKind::ConnectionRefused => TransportErrorKind::ConnectRefused,
        ErrorKind::TimedOut | ErrorKind::WouldBlock => TransportErrorKind::Timeout,
        ErrorKind::HostUnreachable | ErrorKind::NetworkUnreachable => {
            TransportErrorKind::Unreachable
        }
        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe => {
            TransportErrorKind::Broken
        }
        ErrorKind::NotConnected => TransportErrorKind::Closed,
        _ => TransportErrorKind::Broken,
    }
}

fn io_error(err: std::io::Error) -> TransportError {
    TransportError::new(classify(&err), err.to_string())
}

/// A `std::net` TCP stream behind the session's transport contract.
pub struct StdTransport {
    stream: Option<TcpStream>,
    read_timeout: Duration,
    connect_timeout: Duration,
}

impl StdTransport {
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self { stream: None, read_timeout, connect_timeout }
    }

    fn stream(&mut self) -> Result<&mut TcpStream, TransportError> {
        self.stream.as_mut().ok_or_else(|| {
            TransportError::new(TransportErrorKind::Closed, "transport is not connected")
        })
    }
}

impl Default for StdTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_millis(500))
    }
}

impl Transport for StdTransport {
    fn connect(&mut self, ip: Ipv4Addr, port: u16) -> Result<(), TransportError> {
        let addr = SocketAddr::from((ip, port));
        let stream = TcpStream::connect_timeout(&addr, self.connect_timeout).map_err(io_error)?;
        stream
            .set_read_timeout(Some(self.read_timeout))
            .map_err(io_error)?;
        stream.set_nodelay(true).map_err(io_error)?;
        self.stream = Some(stream);
        Ok(())
    }

    fn push(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.stream()?.write_all(data).map_err(io_error)
    }

    fn pull(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.stream()?.read(buf) {
            // A clean shutdown mid-handshake is an error for the session.
            Ok(0) => Err(TransportError::new(
                TransportErrorKind::Eof,
                "peer closed the connection",
            )),
            Ok(n) => Ok(n),
            Err(e) if classify(&e) == TransportErrorKind::Timeout => Ok(0),
            Err(e) => Err(io_error(e)),
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}
