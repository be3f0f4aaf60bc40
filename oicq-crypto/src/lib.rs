//! Cryptographic primitives for the QQ mobile protocol.
//!
//! Provides:
//! - the padded, IV-chained TEA variant used for frame bodies
//! - an `md5!` digest macro and hex rendering
//! - ECDH over `secp192k1` yielding the 16-byte TEA session key
//!
//! Everything here is a pure function of its inputs; the randomised entry
//! points have deterministic `do_*` twins for testing.

#![deny(unsafe_code)]

pub mod ecdh;
pub mod tea;

mod digest;

pub use digest::md5_hex;

/// Errors from the crypto layer.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Ciphertext length is not a positive multiple of the block size,
    /// or its padding frame is inconsistent.
    InvalidCiphertext,
    /// Curve or key-material setup failed.
    CryptoInit { reason: &'static str },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCiphertext => write!(f, "invalid ciphertext"),
            Self::CryptoInit { reason } => write!(f, "crypto initialisation failed: {reason}"),
        }
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` for crypto operations.
pub type Result<T> = std::result::Result<T, Error>;
