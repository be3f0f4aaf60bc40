//! Binary codecs for the QQ mobile protocol: the JCE tag-length-value
//! serialization and the Wup RPC envelope around it.
//!
//! This crate is sans-IO: everything operates on in-memory buffers through
//! the [`io`] cursors. Schemas are declared once with [`jce_struct!`] and
//! drive both directions of the codec.

#![deny(unsafe_code)]

pub mod io;
pub mod jce;
pub mod wup;

mod error;

pub use error::{Error, Result};
