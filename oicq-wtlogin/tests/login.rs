use std::cell::RefCell;
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::rc::Rc;
use std::time::Duration;

use oicq_crypto::tea::{self, TeaKey};
use oicq_wtlogin::context::{KeySet, RequestContext, UserPassword, consts};
use oicq_wtlogin::session::{LoginOutcome, LoginState, Session, SessionFactory};
use oicq_wtlogin::transport::{Transport, TransportError, TransportErrorKind};
use oicq_wtlogin::Error;

// ─── scripted in-memory transport ────────────────────────────────────────────

#[derive(Default)]
struct Wire {
    inbox: VecDeque<u8>,
    outbox: Vec<u8>,
    connected: bool,
    closed: bool,
}

#[derive(Clone, Default)]
struct MemTransport(Rc<RefCell<Wire>>);

impl MemTransport {
    fn queue(&self, frame: &[u8]) {
        self.0.borrow_mut().inbox.extend(frame.iter().copied());
    }
}

impl Transport for MemTransport {
    fn connect(&mut self, _ip: Ipv4Addr, _port: u16) -> Result<(), TransportError> {
        self.0.borrow_mut().connected = true;
        Ok(())
    }

    fn push(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.0.borrow_mut().outbox.extend_from_slice(data);
        Ok(())
    }

    fn pull(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let mut wire = self.0.borrow_mut();
        if wire.inbox.is_empty() {
            return Err(TransportError::new(
                TransportErrorKind::Eof,
                "script exhausted",
            ));
        }
        let mut n = 0;
        while n < buf.len() {
            match wire.inbox.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn close(&mut self) {
        self.0.borrow_mut().closed = true;
    }
}

// ─── canned gateway frames ───────────────────────────────────────────────────

const SHARE_KEY: [u8; 16] = [0x11; 16];
const UIN: u32 = 10001;
const GATEWAY: (Ipv4Addr, u16) = (Ipv4Addr::new(127, 0, 0, 1), 8080);

fn context() -> RequestContext {
    RequestContext::new(
        UIN,
        UserPassword::from("password"),
        1_500_000_000,
        KeySet::new([0x02; 25], SHARE_KEY, [0x22; 16]),
    )
}

/// Frame a gateway answer: Ecdh-mode responses encrypt under the share key.
fn gateway_frame(seq: u32, blocks: &[(u16, &[u8])]) -> Vec<u8> {
    let mut inner = Vec::new();
    inner.extend_from_slice(&9u16.to_be_bytes());
    inner.extend_from_slice(&(blocks.len() as u16).to_be_bytes());
    for (id, body) in blocks {
        inner.extend_from_slice(&id.to_be_bytes());
        inner.extend_from_slice(&(body.len() as u16).to_be_bytes());
        inner.extend_from_slice(body);
    }
    let body = tea::encrypt(&inner, &TeaKey::from_bytes(&SHARE_KEY).unwrap());

    let mut frame = vec![0x02];
    frame.extend_from_slice(&((27 + 2 + body.len()) as u16).to_be_bytes());
    frame.extend_from_slice(&consts::CLIENT_VERSION.to_be_bytes());
    frame.extend_from_slice(&2064u16.to_be_bytes());
    frame.extend_from_slice(&seq.to_be_bytes());
    frame.extend_from_slice(&UIN.to_be_bytes());
    frame.extend_from_slice(&[0x03, 0x07, 0x00]);
    frame.extend_from_slice(&2u32.to_be_bytes());
    frame.extend_from_slice(&0u32.to_be_bytes());
    frame.extend_from_slice(&0u32.to_be_bytes());
    frame.extend_from_slice(&body);
    frame.push(0x03);
    frame
}

fn captcha_challenge(seq: u32) -> Vec<u8> {
    let mut picture_body = Vec::new();
    picture_body.extend_from_slice(&130u16.to_be_bytes());
    picture_body.extend_from_slice(&53u16.to_be_bytes());
    picture_body.extend_from_slice(&[0x89, 0x50, 0x4E, 0x47]);
    gateway_frame(seq, &[(0x104, &[0xC4; 8]), (0x105, &picture_body)])
}

fn rejection(seq: u32) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&1u16.to_be_bytes());
    body.extend_from_slice(&5u16.to_be_bytes());
    body.extend_from_slice(b"error");
    body.extend_from_slice(&14u16.to_be_bytes());
    body.extend_from_slice(b"wrong password");
    gateway_frame(seq, &[(0x146, &body)])
}

// ─── the state machine ───────────────────────────────────────────────────────

#[test]
fn successful_login_merges_tokens() {
    let transport = MemTransport::default();
    // The first request of a fresh session is seq 0.
    transport.queue(&gateway_frame(0, &[(0x10A, &[1, 2, 3]), (0x143, &[4, 5])]));

    let mut session = Session::new(transport.clone(), context());
    assert_eq!(*session.state(), LoginState::Idle);

    let outcome = session.login(GATEWAY, Duration::from_secs(5)).unwrap();
    let LoginOutcome::LoggedIn(tokens) = outcome else {
        panic!("expected LoggedIn, got {outcome:?}");
    };
    assert_eq!(tokens.tgt, vec![1, 2, 3]);
    assert_eq!(tokens.d2, vec![4, 5]);

    assert_eq!(*session.state(), LoginState::LoggedIn);
    assert_eq!(session.tokens().unwrap().tgt, vec![1, 2, 3]);
    assert_eq!(session.context().tokens.d2, vec![4, 5]);

    // One frame went out, and it was a 2064/seq-0 request.
    let wire = transport.0.borrow();
    assert!(wire.connected);
    assert_eq!(wire.outbox[5..7], 2064u16.to_be_bytes());
    assert_eq!(wire.outbox[7..11], 0u32.to_be_bytes());
}

#[test]
fn captcha_round_trip() {
    let transport = MemTransport::default();
    transport.queue(&captcha_challenge(0));

    let mut session = Session::new(transport.clone(), context());
    let outcome = session.login(GATEWAY, Duration::from_secs(5)).unwrap();

    let LoginOutcome::CaptchaRequired(picture) = outcome else {
        panic!("expected a captcha, got {outcome:?}");
    };
    assert_eq!((picture.width, picture.height), (130, 53));
    assert_eq!(picture.png, vec![0x89, 0x50, 0x4E, 0x47]);
    assert_eq!(*session.state(), LoginState::AwaitingCaptcha);
    // Tokens are not available while the captcha is pending.
    assert!(matches!(session.tokens().unwrap_err(), Error::CaptchaRequired));

    // The answer goes out as seq 1; script the ticket grant for it.
    transport.queue(&gateway_frame(1, &[(0x10A, &[9]), (0x143, &[8])]));
    let outcome = session.submit_captcha("abcd", Duration::from_secs(5)).unwrap();
    assert!(matches!(outcome, LoginOutcome::LoggedIn(_)));
    assert_eq!(*session.state(), LoginState::LoggedIn);
}

#[test]
fn sms_round_trip() {
    let transport = MemTransport::default();
    transport.queue(&gateway_frame(
        0,
        &[(0x174, &[0xAB; 6]), (0x17A, &9u32.to_be_bytes())],
    ));

    let mut session = Session::new(transport.clone(), context());
    let outcome = session.login(GATEWAY, Duration::from_secs(5)).unwrap();
    assert_eq!(outcome, LoginOutcome::SmsCodeRequired { sms_app_id: 9 });
    assert_eq!(*session.state(), LoginState::AwaitingSms);

    // Asking for a resend keeps the session parked on the challenge.
    transport.queue(&gateway_frame(
        1,
        &[(0x174, &[0xAC; 6]), (0x17A, &9u32.to_be_bytes())],
    ));
    let outcome = session.request_sms(Duration::from_secs(5)).unwrap();
    assert_eq!(outcome, LoginOutcome::SmsCodeRequired { sms_app_id: 9 });
    assert_eq!(*session.state(), LoginState::AwaitingSms);

    // The code submission earns the tickets.
    transport.queue(&gateway_frame(2, &[(0x10A, &[5, 5]), (0x143, &[6])]));
    let outcome = session.submit_sms_code("123456", Duration::from_secs(5)).unwrap();
    assert!(matches!(outcome, LoginOutcome::LoggedIn(_)));
    assert_eq!(*session.state(), LoginState::LoggedIn);
    assert_eq!(session.tokens().unwrap().tgt, vec![5, 5]);
}

#[test]
fn rejection_fails_the_session() {
    let transport = MemTransport::default();
    transport.queue(&rejection(0));

    let mut session = Session::new(transport.clone(), context());
    let err = session.login(GATEWAY, Duration::from_secs(5)).unwrap_err();
    assert!(matches!(err, Error::LoginRejected { .. }));
    assert!(matches!(session.state(), LoginState::Failed { .. }));
    assert!(transport.0.borrow().closed);
}

#[test]
fn deadline_expiry_times_out() {
    let transport = MemTransport::default();
    let mut session = Session::new(transport.clone(), context());

    let err = session.login(GATEWAY, Duration::ZERO).unwrap_err();
    assert!(matches!(err, Error::Timeout));
    assert!(matches!(session.state(), LoginState::Failed { .. }));
    assert!(transport.0.borrow().closed);
}

#[test]
fn responses_match_by_sequence() {
    let transport = MemTransport::default();
    // A stray frame for a sequence nobody asked about, then the real one.
    transport.queue(&gateway_frame(42, &[(0x10A, &[0])]));
    transport.queue(&gateway_frame(0, &[(0x10A, &[7, 7])]));

    let mut session = Session::new(transport.clone(), context());
    let outcome = session.login(GATEWAY, Duration::from_secs(5)).unwrap();
    let LoginOutcome::LoggedIn(tokens) = outcome else {
        panic!("expected LoggedIn, got {outcome:?}");
    };
    assert_eq!(tokens.tgt, vec![7, 7]);
}

#[test]
fn login_twice_is_rejected() {
    let transport = MemTransport::default();
    transport.queue(&gateway_frame(0, &[(0x10A, &[1])]));

    let mut session = Session::new(transport, context());
    session.login(GATEWAY, Duration::from_secs(5)).unwrap();
    assert!(matches!(
        session.login(GATEWAY, Duration::from_secs(5)).unwrap_err(),
        Error::ProtocolViolation { .. }
    ));
}

#[test]
fn factory_stamps_uin_and_password() {
    let factory = SessionFactory::new(context());

    let transport = MemTransport::default();
    transport.queue(&gateway_frame(0, &[(0x10A, &[1])]));

    let mut session = factory.create_session(20002, "hunter2", transport.clone());
    assert_eq!(session.context().uin, 20002);

    session.login(GATEWAY, Duration::from_secs(5)).unwrap();
    let wire = transport.0.borrow();
    // The outgoing frame carries the stamped uin.
    assert_eq!(wire.outbox[11..15], 20002u32.to_be_bytes());
}
