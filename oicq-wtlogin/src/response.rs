//! Interpretation of login response frames.
//!
//! The gateway answers with the same `(sub_cmd, count, blocks)` shape the
//! client sends; what happened is encoded in which blocks are present.

use crate::request::ResponseFrame;
use crate::tlv::Tlv;
use crate::{Error, Result};

/// Credential blobs delivered by a successful login. Opaque to the core;
/// later requests echo them back.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionTokens {
    /// The TGT ticket (A2).
    pub tgt: Vec<u8>,
    /// The D2 ticket.
    pub d2: Vec<u8>,
    pub no_pic_sig: Option<Vec<u8>>,
    pub rollback_sig: Option<Vec<u8>>,
}

/// A captcha challenge surfaced to the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptchaPicture {
    pub width: u16,
    pub height: u16,
    /// PNG image data.
    pub png: Vec<u8>,
}

/// The decoded meaning of one login round trip.
#[derive(Clone, Debug, PartialEq)]
pub enum LoginResponse {
    /// Tickets granted; the session may proceed.
    Success(SessionTokens),
    /// The gateway wants a captcha transcribed first.
    CaptchaNeeded { sig: Vec<u8>, picture: CaptchaPicture },
    /// The gateway wants a code from a text message first.
    SmsNeeded {
        sig: Vec<u8>,
        /// Sig from an accompanying 0x104, echoed back if present.
        verify_sig: Option<Vec<u8>>,
        sms_app_id: u32,
    },
    /// Authentication was refused.
    Rejected { code: u16, title: String, message: String },
}

/// Classify a response frame by the blocks it carries.
///
/// A ticket block means success, a verification sig plus picture means
/// captcha, an SMS sig means phone verification, an error notice means
/// rejection. Anything else is a protocol violation for this frame.
pub fn interpret(frame: &ResponseFrame) -> Result<LoginResponse> {
    let mut tokens = SessionTokens::default();
    let mut got_tgt = false;
    let mut captcha_sig: Option<Vec<u8>> = None;
    let mut picture: Option<CaptchaPicture> = None;
    let mut sms_sig: Option<Vec<u8>> = None;
    let mut sms_app_id = 0u32;

    for raw in &frame.blocks {
        match raw.parse()? {
            Tlv::T10A { tgt } => {
                tokens.tgt = tgt;
                got_tgt = true;
            }
            Tlv::T143 { d2 } => tokens.d2 = d2,
            Tlv::T16A { no_pic_sig } => tokens.no_pic_sig = Some(no_pic_sig),
            Tlv::T172 { rollback_sig } => tokens.rollback_sig = Some(rollback_sig),
            Tlv::T104 { sig } => captcha_sig = Some(sig),
            Tlv::T105 { width, height, picture: png } => {
                picture = Some(CaptchaPicture { width, height, png });
            }
            Tlv::T174 { sig } => sms_sig = Some(sig),
            Tlv::T17A { sms_app_id: id } => sms_app_id = id,
            Tlv::T146 { code, title, message } => {
                return Ok(LoginResponse::Rejected { code, title, message });
            }
            other => {
                return Err(Error::protocol(format!(
                    "tlv 0x{:x} out of place in a login response",
                    other.id()
                )));
            }
        }
    }

    if got_tgt {
        return Ok(LoginResponse::Success(tokens));
    }
    // A picture challenge wins when the gateway offers both paths.
    if let (Some(sig), Some(picture)) = (captcha_sig.clone(), picture) {
        return Ok(LoginResponse::CaptchaNeeded { sig, picture });
    }
    match sms_sig {
        Some(sig) => Ok(LoginResponse::SmsNeeded { sig, verify_sig: captcha_sig, sms_app_id }),
        None => Err(Error::protocol("login response carries neither tickets nor a challenge")),
    }
}
