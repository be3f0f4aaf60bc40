//! The QQ wtlogin protocol layer.
//!
//! This crate handles:
//! * the TLV block catalogue composed into authentication bodies
//! * SSO request framing and the two body-encryption regimes
//! * the per-connection session context and login state machine
//!
//! It is intentionally transport-agnostic: bring your own TCP through the
//! [`transport::Transport`] trait. Codec and crypto primitives come from
//! `oicq-codec` and `oicq-crypto`.

#![deny(unsafe_code)]

pub mod context;
pub mod request;
pub mod response;
pub mod session;
pub mod tlv;
pub mod transport;

mod error;

pub use context::{ConnectionType, KeySet, LocaleId, RequestContext, UserPassword};
pub use error::{Error, Result};
pub use request::{
    EncryptMode, RequestCaptchaVerify, RequestSmsSend, RequestSmsVerify, RequestTgtgt,
};
pub use response::{CaptchaPicture, LoginResponse, SessionTokens};
pub use session::{LoginOutcome, LoginState, Session, SessionFactory};
