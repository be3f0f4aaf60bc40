//! Per-session request context: identity, device strings, key material
//! and the wire sequence counters.

use std::cell::OnceCell;

use oicq_crypto::{ecdh, md5};

use crate::Result;
use crate::response::SessionTokens;

/// Client build constants for the protocol revision this crate speaks.
pub mod consts {
    /// MD5 of the APK signing certificate.
    pub const APK_SIGNATURE_MD5: [u8; 16] = [
        0xA6, 0xB7, 0x45, 0xBF, 0x24, 0xA2, 0xC2, 0x77, 0x52, 0x77, 0x16, 0xF6, 0xF3, 0x6E,
        0xB6, 0x8D,
    ];
    /// Client build timestamp (GMT 2014-07-21 08:08:42), echoed in TLV 0x177.
    pub const BUILD_TIME: u32 = 1_405_930_122;
    pub const OS_TYPE: &str = "android";
    pub const APK_VERSION: &str = "5.0.0";
    pub const SDK_VERSION: &str = "5.2.2.98";
    pub const APK_ID: &str = "com.tencent.mobileqq";
    pub const CLIENT_VERSION: u16 = 8001;
    pub const APP_ID: u32 = 537_039_093;
    pub const BITMAP: u32 = 0x7F7C;
    pub const GET_SIG: u32 = 0x0001_0400;
    pub const GET_SIG1: u32 = 0x001E_1060;
    pub const DEFAULT_DOMAIN: &str = "game.qq.com";
    /// Both wire sequence counters wrap at this modulus.
    pub const SEQ_MODULUS: u32 = 200;
}

/// Windows-style locale identifiers the client may report.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(u32)]
pub enum LocaleId {
    EnUs = 1033,
    #[default]
    ZhCn = 2052,
    ZhHk = 1028,
}

/// How the device is attached to the network, reported in TLV 0x141.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(u16)]
pub enum ConnectionType {
    #[default]
    Other = 0,
    Wifi = 1,
    Cellular = 2,
}

/// A user credential: always carried as the 16-byte password digest.
#[derive(Clone, Copy)]
pub struct UserPassword(pub [u8; 16]);

impl From<&str> for UserPassword {
    fn from(password: &str) -> Self {
        Self(md5!(password.as_bytes()))
    }
}

impl From<[u8; 16]> for UserPassword {
    fn from(digest: [u8; 16]) -> Self {
        Self(digest)
    }
}

impl std::fmt::Debug for UserPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print even the digest of a credential.
        f.write_str("UserPassword(…)")
    }
}

// ─── Key material ────────────────────────────────────────────────────────────

/// Session key material: the ECDH result plus a random fallback key.
#[derive(Clone)]
pub struct KeySet {
    /// Compressed local ECDH public point, sent in `Ecdh`-mode bodies.
    pub pub_key: [u8; 25],
    /// `md5(ecdh shared x)`: the TEA key for `Ecdh`-mode bodies.
    pub share_key: [u8; 16],
    /// Random per-session key for `Kc`-mode bodies.
    pub random_key: [u8; 16],
}

impl KeySet {
    pub fn new(pub_key: [u8; 25], share_key: [u8; 16], random_key: [u8; 16]) -> Self {
        Self { pub_key, share_key, random_key }
    }

    /// Run the ECDH agreement against the gateway key and roll a fresh
    /// random key. Called once per session.
    pub fn generate() -> Result<Self> {
        let (pub_key, share_key) = ecdh::generate_keypair()?;
        let mut random_key = [0u8; 16];
        getrandom::getrandom(&mut random_key).expect("getrandom failed");
        Ok(Self { pub_key, share_key, random_key })
    }
}

impl std::fmt::Debug for KeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeySet(pub={:02x}{:02x}…)", self.pub_key[0], self.pub_key[1])
    }
}

// ─── Request context ─────────────────────────────────────────────────────────

/// Mutable per-connection state threaded through request building.
///
/// Cheap to clone before uin/password are stamped in, which is how the
/// session factory hands out per-user copies of a common template.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub uin: u32,
    pub password_md5: [u8; 16],
    /// Server epoch seconds as of session start.
    pub server_time: u32,
    pub locale: LocaleId,
    pub os_version: String,
    pub imei: String,
    pub wifi_mac: String,
    pub android_id: String,
    pub keys: KeySet,
    pub sim_operator: String,
    pub connection_type: ConnectionType,
    pub apn: String,
    pub apk_version: String,
    pub apk_signature: [u8; 16],
    /// Credential blobs delivered by a successful login.
    pub tokens: SessionTokens,
    /// Opaque ksid carried over from a previous session, if any.
    pub ksid: Vec<u8>,
    guid: OnceCell<[u8; 16]>,
    request_seq: u32,
    client_seq: u32,
}

impl RequestContext {
    pub fn new(uin: u32, password: UserPassword, server_time: u32, keys: KeySet) -> Self {
        Self {
            uin,
            password_md5: password.0,
            server_time,
            locale: LocaleId::default(),
            os_version: String::new(),
            imei: String::new(),
            wifi_mac: String::new(),
            android_id: String::new(),
            keys,
            sim_operator: String::new(),
            connection_type: ConnectionType::default(),
            apn: String::new(),
            apk_version: consts::APK_VERSION.to_string(),
            apk_signature: consts::APK_SIGNATURE_MD5,
            tokens: SessionTokens::default(),
            ksid: Vec::new(),
            guid: OnceCell::new(),
            request_seq: 0,
            client_seq: 0,
        }
    }

    /// The device GUID: `md5(imei ‖ wifi_mac)`, computed once per session.
    pub fn guid(&self) -> [u8; 16] {
        *self
            .guid
            .get_or_init(|| md5!(self.imei.as_bytes(), self.wifi_mac.as_bytes()))
    }

    /// Take the next request sequence number (post-increment, mod 200).
    pub fn acquire_request_seq(&mut self) -> u32 {
        let seq = self.request_seq;
        self.request_seq = (self.request_seq + 1) % consts::SEQ_MODULUS;
        seq
    }

    /// Take the next client sequence number (post-increment, mod 200).
    pub fn acquire_client_seq(&mut self) -> u32 {
        let seq = self.client_seq;
        self.client_seq = (self.client_seq + 1) % consts::SEQ_MODULUS;
        seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RequestContext {
        let keys = KeySet::new([2u8; 25], [3u8; 16], [4u8; 16]);
        RequestContext::new(10001, UserPassword::from("password"), 1_500_000_000, keys)
    }

    #[test]
    fn sequence_counters_wrap_at_200() {
        let mut ctx = context();
        assert_eq!(ctx.acquire_request_seq(), 0);
        assert_eq!(ctx.acquire_request_seq(), 1);
        for _ in 2..consts::SEQ_MODULUS {
            ctx.acquire_request_seq();
        }
        assert_eq!(ctx.acquire_request_seq(), 0);

        // The two counters advance independently.
        assert_eq!(ctx.acquire_client_seq(), 0);
        assert_eq!(ctx.acquire_client_seq(), 1);
    }

    #[test]
    fn guid_is_cached_and_deterministic() {
        let mut ctx = context();
        ctx.imei = "867335032183349".to_string();
        ctx.wifi_mac = "00:11:22:33:44:55".to_string();

        let first = ctx.guid();
        assert_eq!(first, ctx.guid());
        assert_eq!(
            first,
            md5!(b"867335032183349", b"00:11:22:33:44:55")
        );
    }

    #[test]
    fn password_digest_matches_plaintext_hash() {
        let from_plain = UserPassword::from("hunter2");
        let from_digest = UserPassword::from(md5!(b"hunter2"));
        assert_eq!(from_plain.0, from_digest.0);
    }
}
