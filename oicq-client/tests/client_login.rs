use std::io::{Read, Write};
use std::net::{Ipv4Addr, TcpListener};
use std::time::Duration;

use oicq_crypto::tea::{self, TeaKey};
use oicq_client::{Client, LoginFlow};
use oicq_wtlogin::context::{KeySet, RequestContext, UserPassword, consts};

const SHARE_KEY: [u8; 16] = [0x11; 16];

fn template() -> RequestContext {
    RequestContext::new(
        0,
        UserPassword::from(""),
        1_500_000_000,
        KeySet::new([0x02; 25], SHARE_KEY, [0x22; 16]),
    )
}

/// Read one full SSO frame off a socket: begin(1) + total_size(2) + rest.
fn read_frame(stream: &mut impl Read) -> Vec<u8> {
    let mut head = [0u8; 3];
    stream.read_exact(&mut head).unwrap();
    let total_size = u16::from_be_bytes([head[1], head[2]]) as usize;
    let mut rest = vec![0u8; total_size - 1];
    stream.read_exact(&mut rest).unwrap();
    let mut frame = head.to_vec();
    frame.extend_from_slice(&rest);
    frame
}

fn success_frame(seq: u32, uin: u32) -> Vec<u8> {
    let mut inner = Vec::new();
    inner.extend_from_slice(&9u16.to_be_bytes());
    inner.extend_from_slice(&2u16.to_be_bytes());
    for (id, body) in [(0x010Au16, &[1u8, 2, 3][..]), (0x0143, &[4, 5][..])] {
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
    frame.extend_from_slice(&uin.to_be_bytes());
    frame.extend_from_slice(&[0x03, 0x07, 0x00]);
    frame.extend_from_slice(&2u32.to_be_bytes());
    frame.extend_from_slice(&0u32.to_be_bytes());
    frame.extend_from_slice(&0u32.to_be_bytes());
    frame.extend_from_slice(&body);
    frame.push(0x03);
    frame
}

#[tokio::test]
async fn login_against_loopback_gateway() {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_frame(&mut stream);

        // The request head carries cmd 2064 and the client's uin.
        assert_eq!(request[5..7], 2064u16.to_be_bytes());
        let seq = u32::from_be_bytes(request[7..11].try_into().unwrap());
        let uin = u32::from_be_bytes(request[11..15].try_into().unwrap());
        assert_eq!(uin, 10001);

        stream.write_all(&success_frame(seq, uin)).unwrap();
    });

    let client = Client::new(template(), (Ipv4Addr::LOCALHOST, port))
        .with_deadline(Duration::from_secs(10));

    match client.login(10001, "password").await.unwrap() {
        LoginFlow::LoggedIn(session) => {
            let tokens = session.tokens().unwrap();
            assert_eq!(tokens.tgt, vec![1, 2, 3]);
            assert_eq!(tokens.d2, vec![4, 5]);
        }
        LoginFlow::Captcha(_) => panic!("unexpected captcha"),
        LoginFlow::Sms(_) => panic!("unexpected sms challenge"),
    }

    server.join().unwrap();
}

#[tokio::test]
async fn refused_connection_surfaces_as_transport_error() {
    // Bind then drop to get a port with nothing listening.
    let port = {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        listener.local_addr().unwrap().port()
    };

    let client = Client::new(template(), (Ipv4Addr::LOCALHOST, port))
        .with_deadline(Duration::from_secs(2));

    let err = client.login(10001, "password").await.unwrap_err();
    assert!(matches!(err, oicq_wtlogin::Error::Transport(_)), "got {err}");
}
