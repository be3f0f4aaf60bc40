//! The per-connection session orchestrator and its login state machine.
//!
//! ```text
//! Idle → Connecting → Handshaking → AwaitingTgtgt → LoggedIn
//!                                       ↕︎        ↕︎
//!                            AwaitingCaptcha   AwaitingSms   any → Failed
//! ```
//!
//! One session owns its transport and all in-flight state; nothing here
//! is shared. Requests go out in `request_seq` order and responses are
//! matched back by that key, so wrap-around at 200 is safe as long as
//! fewer than 200 requests are outstanding (in practice: one).

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::context::{RequestContext, UserPassword};
use crate::request::{
    self, EncryptMode, RequestCaptchaVerify, RequestSmsSend, RequestSmsVerify, RequestTgtgt,
    WireRequest,
};
use crate::response::{CaptchaPicture, LoginResponse, SessionTokens, interpret};
use crate::transport::{Transport, TransportError};
use crate::{Error, Result};

/// Where the login state machine currently stands.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LoginState {
    Idle,
    Connecting,
    Handshaking,
    AwaitingTgtgt,
    AwaitingCaptcha,
    AwaitingSms,
    LoggedIn,
    Failed { reason: String },
}

/// What a login round trip produced for the caller.
///
/// A captcha is an outcome, not an error: the session parks in
/// `AwaitingCaptcha` until [`Session::submit_captcha`] resumes it.
#[derive(Clone, Debug, PartialEq)]
pub enum LoginOutcome {
    LoggedIn(SessionTokens),
    CaptchaRequired(CaptchaPicture),
    SmsCodeRequired { sms_app_id: u32 },
}

struct PendingRequest {
    mode: EncryptMode,
}

struct SmsChallenge {
    sig: Vec<u8>,
    verify_sig: Option<Vec<u8>>,
    sms_app_id: u32,
}

/// A login session over an injected transport.
pub struct Session<T: Transport> {
    transport: T,
    context: RequestContext,
    state: LoginState,
    pending: HashMap<u32, PendingRequest>,
    /// Sig to echo with the captcha answer, once challenged.
    captcha_sig: Option<Vec<u8>>,
    /// Material for the SMS round trips, once challenged.
    sms: Option<SmsChallenge>,
    recv_buf: Vec<u8>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, context: RequestContext) -> Self {
        Self {
            transport,
            context,
            state: LoginState::Idle,
            pending: HashMap::new(),
            captcha_sig: None,
            sms: None,
            recv_buf: Vec::new(),
        }
    }

    pub fn state(&self) -> &LoginState {
        &self.state
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// The granted tickets, once logged in.
    pub fn tokens(&self) -> Result<&SessionTokens> {
        match self.state {
            LoginState::LoggedIn => Ok(&self.context.tokens),
            LoginState::AwaitingCaptcha | LoginState::AwaitingSms => {
                Err(Error::CaptchaRequired)
            }
            _ => Err(Error::protocol("session is not logged in")),
        }
    }

    /// Run the login handshake against `gateway`, observing `deadline`.
    ///
    /// On expiry the session fails with [`Error::Timeout`], the socket is
    /// dropped, and every pending request is resolved with that error.
    pub fn login(
        &mut self,
        gateway: (Ipv4Addr, u16),
        deadline: Duration,
    ) -> Result<LoginOutcome> {
        if self.state != LoginState::Idle {
            return Err(Error::protocol(format!(
                "login from state {:?}",
                self.state
            )));
        }
        let expires = Instant::now() + deadline;

        self.state = LoginState::Connecting;
        info!("connecting to {}:{}", gateway.0, gateway.1);
        if let Err(e) = self.transport.connect(gateway.0, gateway.1) {
            return Err(self.fail_transport(e));
        }

        self.state = LoginState::Handshaking;
        let request = RequestTgtgt::new();
        let outcome = self.round_trip(&request, expires)?;
        Ok(outcome)
    }

    /// Answer a pending captcha challenge and resume the handshake.
    pub fn submit_captcha(
        &mut self,
        code: &str,
        deadline: Duration,
    ) -> Result<LoginOutcome> {
        if self.state != LoginState::AwaitingCaptcha {
            return Err(Error::protocol(format!(
                "captcha submission from state {:?}",
                self.state
            )));
        }
        let sig = self
            .captcha_sig
            .take()
            .ok_or_else(|| Error::protocol("challenge sig lost"))?;
        let expires = Instant::now() + deadline;

        self.state = LoginState::Handshaking;
        let request = RequestCaptchaVerify { code: code.to_string(), sig };
        self.round_trip(&request, expires)
    }

    /// Ask the gateway to (re)send the verification text message.
    pub fn request_sms(&mut self, deadline: Duration) -> Result<LoginOutcome> {
        let challenge = match (&self.state, &self.sms) {
            (LoginState::AwaitingSms, Some(challenge)) => challenge,
            _ => {
                return Err(Error::protocol(format!(
                    "sms request from state {:?}",
                    self.state
                )));
            }
        };
        let request = RequestSmsSend {
            sig: challenge.sig.clone(),
            verify_sig: challenge.verify_sig.clone(),
            sms_app_id: challenge.sms_app_id,
        };
        let expires = Instant::now() + deadline;
        self.state = LoginState::Handshaking;
        self.round_trip(&request, expires)
    }

    /// Submit the code received by text message.
    pub fn submit_sms_code(&mut self, code: &str, deadline: Duration) -> Result<LoginOutcome> {
        if self.state != LoginState::AwaitingSms {
            return Err(Error::protocol(format!(
                "sms code submission from state {:?}",
                self.state
            )));
        }
        let challenge = self
            .sms
            .take()
            .ok_or_else(|| Error::protocol("challenge sig lost"))?;
        let request = RequestSmsVerify {
            code: code.to_string(),
            sig: challenge.sig,
            verify_sig: challenge.verify_sig,
        };
        let expires = Instant::now() + deadline;
        self.state = LoginState::Handshaking;
        self.round_trip(&request, expires)
    }

    /// Send one request, wait for its response, drive the state machine.
    fn round_trip<R: WireRequest>(
        &mut self,
        request: &R,
        expires: Instant,
    ) -> Result<LoginOutcome> {
        let mut frame = Vec::new();
        let seq = request::build_request(&mut frame, request, &mut self.context)?;
        self.pending.insert(seq, PendingRequest { mode: R::MODE });

        if let Err(e) = self.transport.push(&frame) {
            return Err(self.fail_transport(e));
        }
        self.state = LoginState::AwaitingTgtgt;

        loop {
            let raw = match self.read_frame(expires) {
                Ok(raw) => raw,
                Err(e) => return Err(self.fail(e)),
            };
            let Some(pending) = self.pending.get(&Self::peek_seq(&raw)?) else {
                warn!("response for unknown seq, dropping frame");
                continue;
            };
            let mode = pending.mode;
            // Malformed frames are fatal for the frame, not the session.
            let response = request::parse_response(&raw, &self.context, mode)?;
            self.pending.remove(&response.seq);

            match interpret(&response)? {
                LoginResponse::Success(tokens) => {
                    info!("login succeeded for uin {}", self.context.uin);
                    self.context.tokens = tokens.clone();
                    self.state = LoginState::LoggedIn;
                    return Ok(LoginOutcome::LoggedIn(tokens));
                }
                LoginResponse::CaptchaNeeded { sig, picture } => {
                    info!(
                        "captcha requested ({}x{}, {}B picture)",
                        picture.width,
                        picture.height,
                        picture.png.len()
                    );
                    self.captcha_sig = Some(sig);
                    self.state = LoginState::AwaitingCaptcha;
                    return Ok(LoginOutcome::CaptchaRequired(picture));
                }
                LoginResponse::SmsNeeded { sig, verify_sig, sms_app_id } => {
                    info!("sms verification requested (app id {sms_app_id})");
                    self.sms = Some(SmsChallenge { sig, verify_sig, sms_app_id });
                    self.state = LoginState::AwaitingSms;
                    return Ok(LoginOutcome::SmsCodeRequired { sms_app_id });
                }
                LoginResponse::Rejected { code, title, message } => {
                    let reason = format!("{title}: {message} (code {code})");
                    return Err(self.fail(Error::LoginRejected { reason }));
                }
            }
        }
    }

    /// Accumulate transport reads until one complete frame is buffered.
    ///
    /// A frame is `begin(1) + total_size + end(1)` bytes long, with
    /// `total_size` at offset 1.
    fn read_frame(&mut self, expires: Instant) -> Result<Vec<u8>> {
        loop {
            if let Some(frame) = self.take_frame()? {
                return Ok(frame);
            }
            if Instant::now() >= expires {
                return Err(Error::Timeout);
            }
            let mut chunk = [0u8; 4096];
            let n = self.transport.pull(&mut chunk).map_err(Error::Transport)?;
            if n == 0 {
                // No data before the transport's internal timeout; the
                // deadline check above bounds how long this can go on.
                continue;
            }
            self.recv_buf.extend_from_slice(&chunk[..n]);
        }
    }

    fn take_frame(&mut self) -> Result<Option<Vec<u8>>> {
        if self.recv_buf.len() < 3 {
            return Ok(None);
        }
        if self.recv_buf[0] != 0x02 {
            return Err(Error::protocol("stream desynchronised: no begin marker"));
        }
        let total_size =
            u16::from_be_bytes([self.recv_buf[1], self.recv_buf[2]]) as usize;
        let frame_len = total_size + 2;
        if self.recv_buf.len() < frame_len {
            return Ok(None);
        }
        let frame: Vec<u8> = self.recv_buf.drain(..frame_len).collect();
        debug!("took {}B frame off the wire", frame.len());
        Ok(Some(frame))
    }

    /// Pull the request sequence out of a raw frame head for matching.
    fn peek_seq(frame: &[u8]) -> Result<u32> {
        if frame.len() < 11 {
            return Err(Error::protocol("frame too short for a head"));
        }
        Ok(u32::from_be_bytes([frame[7], frame[8], frame[9], frame[10]]))
    }

    /// Terminal failure: record it, drop the socket, drain the waiters.
    fn fail(&mut self, error: Error) -> Error {
        warn!("session failed: {error}");
        self.state = LoginState::Failed { reason: error.to_string() };
        self.transport.close();
        if !self.pending.is_empty() {
            debug!("resolving {} pending request(s) with the failure", self.pending.len());
            self.pending.clear();
        }
        error
    }

    fn fail_transport(&mut self, error: TransportError) -> Error {
        self.fail(Error::Transport(error))
    }
}

// ─── factory ─────────────────────────────────────────────────────────────────

/// Stamps per-user sessions out of a common context template.
///
/// The template's uin and password digest are placeholders; they are
/// overwritten when a session is created.
pub struct SessionFactory {
    template: RequestContext,
}

impl SessionFactory {
    pub fn new(template: RequestContext) -> Self {
        Self { template }
    }

    /// The shared initial context, for adjusting device fields.
    pub fn context_mut(&mut self) -> &mut RequestContext {
        &mut self.template
    }

    /// Build a session for one user over the given transport.
    pub fn create_session<T: Transport>(
        &self,
        uin: u32,
        password: impl Into<UserPassword>,
        transport: T,
    ) -> Session<T> {
        let mut context = self.template.clone();
        context.uin = uin;
        context.password_md5 = password.into().0;
        Session::new(transport, context)
    }
}
