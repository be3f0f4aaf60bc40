//! Pluggable transport layer.
//!
//! Implement [`Transport`] over TCP or any other byte stream to drive the
//! login machinery. The protocol layer operates on complete SSO frames;
//! `pull` may deliver partial data and is called until a frame closes.

use std::fmt;
use std::net::Ipv4Addr;

/// Classified transport failures, as the session state machine sees them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransportErrorKind {
    ConnectRefused,
    Unreachable,
    Timeout,
    /// The connection broke mid-transfer.
    Broken,
    /// The connection was closed before or during use.
    Closed,
    /// The peer shut down cleanly while a frame was still expected.
    Eof,
}

/// A transport-layer failure.
#[derive(Clone, Debug)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for TransportError {}

/// A connected, full-duplex byte-stream transport.
///
/// One session owns its transport exclusively; no two operations run
/// concurrently on the same instance.
pub trait Transport {
    /// Open a TCP connection to the gateway.
    fn connect(&mut self, ip: Ipv4Addr, port: u16) -> Result<(), TransportError>;

    /// Send bytes; completes once they are handed to the OS.
    fn push(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Read some bytes into `buf`, returning how many arrived.
    ///
    /// May be called several times per logical frame. `Ok(0)` means no
    /// data turned up before the implementation's internal read timeout
    /// (the caller re-checks its deadline and pulls again); a clean
    /// shutdown while more data is expected is [`TransportErrorKind::Eof`].
    fn pull(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Tear the connection down. Idempotent.
    fn close(&mut self);
}
