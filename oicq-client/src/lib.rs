//! Async client glue over the wtlogin stack.
//!
//! The protocol crates are sync and sans-IO; this crate supplies the real
//! TCP socket and drives a login on a blocking task so async callers get
//! a plain `await`able flow:
//!
//! ```no_run
//! # async fn demo() -> Result<(), oicq_wtlogin::Error> {
//! use oicq_client::Client;
//! use oicq_wtlogin::{KeySet, RequestContext, UserPassword};
//! use std::net::Ipv4Addr;
//!
//! let template = RequestContext::new(0, UserPassword::from(""), 1_500_000_000, KeySet::generate()?);
//! let client = Client::new(template, (Ipv4Addr::new(14, 17, 22, 33), 8080));
//!
//! match client.login(10001, "password").await? {
//!     oicq_client::LoginFlow::LoggedIn(session) => {
//!         let _tickets = session.tokens()?;
//!     }
//!     oicq_client::LoginFlow::Captcha(challenge) => {
//!         // show challenge.picture to the user, then:
//!         let _flow = challenge.submit("abcd".into()).await?;
//!     }
//!     oicq_client::LoginFlow::Sms(challenge) => {
//!         let _flow = challenge.request_send().await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

mod transport;

pub use transport::StdTransport;

use std::net::Ipv4Addr;
use std::time::Duration;

use oicq_wtlogin::session::{LoginOutcome, Session, SessionFactory};
use oicq_wtlogin::{Error, RequestContext, SessionTokens, UserPassword};
use tracing::{info, instrument};

/// An authenticated session, ready for post-login traffic.
pub struct AuthorizedSession {
    session: Session<StdTransport>,
}

impl AuthorizedSession {
    /// The granted credential blobs.
    pub fn tokens(&self) -> Result<&SessionTokens, Error> {
        self.session.tokens()
    }

    /// The underlying protocol session.
    pub fn into_inner(self) -> Session<StdTransport> {
        self.session
    }
}

impl std::fmt::Debug for AuthorizedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedSession").finish_non_exhaustive()
    }
}

/// A pending captcha challenge; submit the transcription to continue.
pub struct CaptchaChallenge {
    session: Session<StdTransport>,
    /// The picture to show the user.
    pub picture: oicq_wtlogin::CaptchaPicture,
    deadline: Duration,
}

impl CaptchaChallenge {
    /// Send the user's answer and resume the handshake.
    pub async fn submit(self, code: String) -> Result<LoginFlow, Error> {
        let Self { mut session, deadline, .. } = self;
        let (session, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = session.submit_captcha(&code, deadline);
            (session, outcome)
        })
        .await
        .map_err(join_error)?;
        LoginFlow::from_outcome(session, outcome?)
    }
}

impl std::fmt::Debug for CaptchaChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptchaChallenge")
            .field("picture", &self.picture)
            .finish_non_exhaustive()
    }
}

/// A pending SMS challenge; ask for the text, then submit its code.
pub struct SmsChallenge {
    session: Session<StdTransport>,
    /// Relay application the text will come from.
    pub sms_app_id: u32,
    deadline: Duration,
}

impl SmsChallenge {
    /// Ask the gateway to (re)send the text message.
    pub async fn request_send(self) -> Result<LoginFlow, Error> {
        let Self { mut session, deadline, .. } = self;
        let (session, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = session.request_sms(deadline);
            (session, outcome)
        })
        .await
        .map_err(join_error)?;
        LoginFlow::from_outcome(session, outcome?)
    }

    /// Send the code the user received and resume the handshake.
    pub async fn submit(self, code: String) -> Result<LoginFlow, Error> {
        let Self { mut session, deadline, .. } = self;
        let (session, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = session.submit_sms_code(&code, deadline);
            (session, outcome)
        })
        .await
        .map_err(join_error)?;
        LoginFlow::from_outcome(session, outcome?)
    }
}

impl std::fmt::Debug for SmsChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsChallenge")
            .field("sms_app_id", &self.sms_app_id)
            .finish_non_exhaustive()
    }
}

/// Where a login attempt landed.
#[derive(Debug)]
pub enum LoginFlow {
    LoggedIn(AuthorizedSession),
    Captcha(CaptchaChallenge),
    Sms(SmsChallenge),
}

impl LoginFlow {
    fn from_outcome(
        session: Session<StdTransport>,
        outcome: LoginOutcome,
    ) -> Result<Self, Error> {
        Ok(match outcome {
            LoginOutcome::LoggedIn(_) => Self::LoggedIn(AuthorizedSession { session }),
            LoginOutcome::CaptchaRequired(picture) => Self::Captcha(CaptchaChallenge {
                session,
                picture,
                deadline: DEFAULT_DEADLINE,
            }),
            LoginOutcome::SmsCodeRequired { sms_app_id } => Self::Sms(SmsChallenge {
                session,
                sms_app_id,
                deadline: DEFAULT_DEADLINE,
            }),
        })
    }
}

const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

fn join_error(e: tokio::task::JoinError) -> Error {
    Error::ProtocolViolation { what: format!("login task aborted: {e}") }
}

/// Hands out logins against one gateway from a shared context template.
pub struct Client {
    factory: SessionFactory,
    gateway: (Ipv4Addr, u16),
    deadline: Duration,
}

impl Client {
    /// `template` carries the device identity; uin and password are
    /// stamped per login.
    pub fn new(template: RequestContext, gateway: (Ipv4Addr, u16)) -> Self {
        Self { factory: SessionFactory::new(template), gateway, deadline: DEFAULT_DEADLINE }
    }

    /// Override the per-login deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Authenticate one user.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        uin: u32,
        password: impl Into<UserPassword>,
    ) -> Result<LoginFlow, Error> {
        let mut session =
            self.factory
                .create_session(uin, password, StdTransport::default());
        let gateway = self.gateway;
        let deadline = self.deadline;

        info!("starting login handshake");
        let (session, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = session.login(gateway, deadline);
            (session, outcome)
        })
        .await
        .map_err(join_error)?;

        let outcome = outcome?;
        info!("handshake round trip complete");
        LoginFlow::from_outcome(session, outcome)
    }
}
