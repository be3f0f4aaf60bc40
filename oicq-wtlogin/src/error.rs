//! Protocol-level error type.

use std::fmt;

use crate::transport::TransportError;

/// Errors surfaced by the wtlogin protocol layer.
#[derive(Debug)]
pub enum Error {
    /// A codec failure bubbling up unchanged from the JCE/byte layer.
    Codec(oicq_codec::Error),
    /// A crypto failure bubbling up unchanged.
    Crypto(oicq_crypto::Error),
    /// The peer broke the wire contract (bad marker, length, block id…).
    ProtocolViolation { what: String },
    /// The transport failed.
    Transport(TransportError),
    /// The login deadline expired.
    Timeout,
    /// The gateway rejected the authentication attempt.
    LoginRejected { reason: String },
    /// The session is parked on a verification challenge; answer it to
    /// continue.
    CaptchaRequired,
}

impl Error {
    pub(crate) fn protocol(what: impl Into<String>) -> Self {
        Self::ProtocolViolation { what: what.into() }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Codec(e) => write!(f, "codec: {e}"),
            Self::Crypto(e) => write!(f, "crypto: {e}"),
            Self::ProtocolViolation { what } => write!(f, "protocol violation: {what}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Timeout => write!(f, "login deadline expired"),
            Self::LoginRejected { reason } => write!(f, "login rejected: {reason}"),
            Self::CaptchaRequired => write!(f, "captcha verification pending"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Codec(e) => Some(e),
            Self::Crypto(e) => Some(e),
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<oicq_codec::Error> for Error {
    fn from(e: oicq_codec::Error) -> Self {
        Self::Codec(e)
    }
}

impl From<oicq_crypto::Error> for Error {
    fn from(e: oicq_crypto::Error) -> Self {
        Self::Crypto(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

/// Specialized `Result` for protocol operations.
pub type Result<T> = std::result::Result<T, Error>;
