//! SSO request framing: the outer head, the TLV body, and the two
//! body-encryption regimes.
//!
//! ```text
//! begin(1) total_size(2) client_version(2) cmd(2) seq(4) uin(4)
//!   0x03 0x07 retry(1) ext_type=2(4) app_client_type=0(4) ext_instance=0(4)
//!   body(...) end(1)
//! ```
//!
//! Big-endian throughout. `total_size` counts the 27-byte head plus its
//! own two bytes plus the encrypted body; the begin/end markers sit
//! outside it.

use log::debug;
use oicq_codec::io::{Reader, Writer};
use oicq_crypto::tea;

use crate::context::{RequestContext, consts};
use crate::tlv::{RawTlv, Tlv, TlvBuilder, TlvReader};
use crate::{Error, Result};

/// Bytes of the outer head not counting the body, the end marker, or the
/// `total_size` field itself.
pub const REQUEST_HEAD_SIZE: u16 = 27;

/// Frame delimiters.
const BEGIN_MARKER: u8 = 0x02;
const END_MARKER: u8 = 0x03;

/// The two session-key regimes for body encryption.
///
/// `Ecdh` rides the key agreement and is the only option before any
/// ticket exists; `Kc` reuses the session's random key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EncryptMode {
    Ecdh,
    Kc,
}

/// A request class: command pair, key regime, and its TLV body.
pub trait WireRequest {
    const CMD: u16;
    const SUB_CMD: u16;
    const MODE: EncryptMode;

    fn write_tlvs(
        &self,
        builder: &mut TlvBuilder<'_, '_>,
        context: &RequestContext,
        seq: u32,
    ) -> Result<()>;
}

/// Serialize `request` into `out` as one complete SSO frame.
///
/// Acquires the request sequence number (returned, for matching the
/// response) and the client sequence number; the head revision spoken
/// here no longer embeds the latter, but the counter advances per frame
/// all the same.
pub fn build_request<R: WireRequest>(
    out: &mut Vec<u8>,
    request: &R,
    context: &mut RequestContext,
) -> Result<u32> {
    let seq = context.acquire_request_seq();
    context.acquire_client_seq();

    // Inner body: sub-command, block count, blocks.
    let mut inner = Vec::new();
    {
        let mut w = Writer::growable(&mut inner);
        w.write_u16_be(R::SUB_CMD)?;
        let count_pos = w.position();
        w.write_u16_be(0)?;
        let count = {
            let mut builder = TlvBuilder::new(&mut w);
            request.write_tlvs(&mut builder, context, seq)?;
            builder.count()
        };
        let end = w.position();
        w.seek(count_pos)?;
        w.write_u16_be(count)?;
        w.seek(end)?;
    }

    // Outer frame around the encrypted body.
    let mut w = Writer::growable(out);
    w.write_u8(BEGIN_MARKER)?;
    let size_pos = w.position();
    w.write_u16_be(0)?;
    w.write_u16_be(consts::CLIENT_VERSION)?;
    w.write_u16_be(R::CMD)?;
    w.write_u32_be(seq)?;
    w.write_u32_be(context.uin)?;
    w.write_u8(0x03)?;
    w.write_u8(0x07)?;
    w.write_u8(0)?; // retry
    w.write_u32_be(2)?; // ext type
    w.write_u32_be(0)?; // app client type
    w.write_u32_be(0)?; // ext instance

    let body_start = w.position();
    encrypt_body(&mut w, &inner, R::MODE, context)?;
    let body_size = w.position() - body_start;
    let end = w.position();

    let total = REQUEST_HEAD_SIZE as usize + 2 + body_size;
    let total = u16::try_from(total)
        .map_err(|_| Error::protocol(format!("frame of {total} bytes overflows total_size")))?;
    w.seek(size_pos)?;
    w.write_u16_be(total)?;
    w.seek(end)?;
    w.write_u8(END_MARKER)?;

    debug!(
        "built sso frame: cmd={} sub_cmd={} seq={} body={}B",
        R::CMD,
        R::SUB_CMD,
        seq,
        body_size
    );
    Ok(seq)
}

/// Write the key preamble and the TEA-encrypted inner body.
fn encrypt_body(
    w: &mut Writer<'_>,
    inner: &[u8],
    mode: EncryptMode,
    context: &RequestContext,
) -> Result<()> {
    let key = match mode {
        EncryptMode::Ecdh => {
            w.write_u16_be(0x0101)?;
            w.write_bytes(&context.keys.random_key)?;
            w.write_u16_be(0x0102)?;
            w.write_u16_be(context.keys.pub_key.len() as u16)?;
            w.write_bytes(&context.keys.pub_key)?;
            tea::TeaKey::from_bytes(&context.keys.share_key)?
        }
        EncryptMode::Kc => {
            w.write_u16_be(0x0102)?;
            w.write_bytes(&context.keys.random_key)?;
            w.write_u16_be(0x0102)?;
            w.write_u16_be(0)?;
            tea::TeaKey::from_bytes(&context.keys.random_key)?
        }
    };
    w.write_bytes(&tea::encrypt(inner, &key))?;
    Ok(())
}

// ─── response framing ────────────────────────────────────────────────────────

/// A decrypted, split-up response frame.
#[derive(Debug)]
pub struct ResponseFrame {
    pub cmd: u16,
    pub seq: u32,
    pub uin: u32,
    pub sub_cmd: u16,
    pub blocks: Vec<RawTlv>,
}

/// Parse one complete response frame.
///
/// The body is TEA ciphertext alone; responses carry no key preamble,
/// the key follows from the regime of the request being answered.
pub fn parse_response(
    frame: &[u8],
    context: &RequestContext,
    mode: EncryptMode,
) -> Result<ResponseFrame> {
    let mut r = Reader::new(frame);
    if r.read_u8()? != BEGIN_MARKER {
        return Err(Error::protocol("missing frame begin marker"));
    }
    let total_size = r.read_u16_be()? as usize;
    if frame.len() != total_size + 2 {
        return Err(Error::protocol(format!(
            "frame length {} does not match total_size {total_size}",
            frame.len()
        )));
    }
    let _client_version = r.read_u16_be()?;
    let cmd = r.read_u16_be()?;
    let seq = r.read_u32_be()?;
    let uin = r.read_u32_be()?;
    r.skip(3)?; // constants
    r.skip(12)?; // ext type, app client type, ext instance

    let body_len = frame
        .len()
        .checked_sub(r.position() + 1)
        .ok_or_else(|| Error::protocol("frame too short for a body"))?;
    let body = r.read_bytes(body_len)?;
    if r.read_u8()? != END_MARKER {
        return Err(Error::protocol("missing frame end marker"));
    }

    let key = match mode {
        EncryptMode::Ecdh => tea::TeaKey::from_bytes(&context.keys.share_key)?,
        EncryptMode::Kc => tea::TeaKey::from_bytes(&context.keys.random_key)?,
    };
    let inner = tea::decrypt(body, &key)?;

    let mut r = Reader::new(&inner);
    let sub_cmd = r.read_u16_be()?;
    let count = r.read_u16_be()? as usize;
    let blocks = TlvReader::from_reader(r).read_all(count)?;

    debug!("parsed sso frame: cmd={cmd} sub_cmd={sub_cmd} seq={seq} blocks={count}");
    Ok(ResponseFrame { cmd, seq, uin, sub_cmd, blocks })
}

// ─── request classes ─────────────────────────────────────────────────────────

/// The initial password-login request of the handshake.
///
/// Assembled entirely from the session context plus build constants; the
/// tgtgt key is rolled fresh per attempt and protects the 0x106/0x144
/// sub-bodies.
#[derive(Clone, Debug)]
pub struct RequestTgtgt {
    pub app_id: u32,
    pub sub_app_id: u32,
    pub client_version: u32,
    pub client_ip: [u8; 4],
    pub tgtgt_key: [u8; 16],
    pub bitmap: u32,
    pub get_sig: u32,
    pub get_sig1: u32,
    pub sub_app_id_list: Vec<u32>,
    pub apk_id: String,
    /// Domains granted cookie access on success.
    pub domains: Vec<String>,
    /// Random word for the 0x106 plaintext.
    pub rand: u32,
}

impl RequestTgtgt {
    /// Build from context defaults with fresh random material.
    pub fn new() -> Self {
        let mut tgtgt_key = [0u8; 16];
        getrandom::getrandom(&mut tgtgt_key).expect("getrandom failed");
        let mut rand = [0u8; 4];
        getrandom::getrandom(&mut rand).expect("getrandom failed");
        Self::with_key(tgtgt_key, u32::from_be_bytes(rand))
    }

    /// Deterministic twin of [`RequestTgtgt::new`].
    pub fn with_key(tgtgt_key: [u8; 16], rand: u32) -> Self {
        Self {
            app_id: consts::APP_ID,
            sub_app_id: consts::APP_ID,
            client_version: consts::CLIENT_VERSION as u32,
            client_ip: [0; 4],
            tgtgt_key,
            bitmap: consts::BITMAP,
            get_sig: consts::GET_SIG,
            get_sig1: consts::GET_SIG1,
            sub_app_id_list: Vec::new(),
            apk_id: consts::APK_ID.to_string(),
            domains: vec![consts::DEFAULT_DOMAIN.to_string()],
            rand,
        }
    }
}

impl Default for RequestTgtgt {
    fn default() -> Self {
        Self::new()
    }
}

impl WireRequest for RequestTgtgt {
    const CMD: u16 = 2064;
    const SUB_CMD: u16 = 9;
    const MODE: EncryptMode = EncryptMode::Ecdh;

    fn write_tlvs(
        &self,
        builder: &mut TlvBuilder<'_, '_>,
        context: &RequestContext,
        seq: u32,
    ) -> Result<()> {
        let guid = context.guid();

        builder.write(&Tlv::T106 {
            app_id: self.app_id,
            sub_app_id: self.sub_app_id,
            client_version: self.client_version,
            uin: context.uin,
            server_time: context.server_time,
            client_ip: self.client_ip,
            password_md5: context.password_md5,
            tgtgt_key: self.tgtgt_key,
            guid,
            rand: self.rand,
        })?;
        builder.write(&Tlv::T100 {
            app_id: self.app_id,
            sub_app_id: self.sub_app_id,
            client_version: self.client_version,
            sig_map: self.get_sig1,
        })?;
        builder.write(&Tlv::T107 {
            pic_type: 0,
            cap_type: 0,
            pic_size: 0,
            ret_type: 1,
        })?;
        builder.write(&Tlv::T116 {
            bitmap: self.bitmap,
            get_sig: self.get_sig,
            sub_app_id_list: self.sub_app_id_list.clone(),
        })?;
        builder.write(&Tlv::T145 { guid })?;
        builder.write(&Tlv::T154 { seq })?;
        builder.write(&Tlv::T141 {
            sim_operator: context.sim_operator.clone(),
            network_type: context.connection_type as u16,
            apn: context.apn.clone(),
        })?;
        builder.write(&Tlv::T8 { locale_id: context.locale as u32 })?;
        builder.write(&Tlv::T147 {
            app_id: self.app_id,
            apk_version: context.apk_version.clone(),
            apk_signature: context.apk_signature.to_vec(),
        })?;
        builder.write(&Tlv::T142 { apk_id: self.apk_id.clone() })?;
        builder.write(&Tlv::T177 {
            build_time: consts::BUILD_TIME,
            sdk_version: consts::SDK_VERSION.to_string(),
        })?;
        if !self.domains.is_empty() {
            builder.write(&Tlv::T16B { domains: self.domains.clone() })?;
        }

        if !context.ksid.is_empty() {
            builder.write(&Tlv::T108 { ksid: context.ksid.clone() })?;
        }
        if !context.wifi_mac.is_empty() {
            builder.write(&Tlv::T187 { wifi_mac: context.wifi_mac.clone() })?;
        }
        if !context.android_id.is_empty() {
            builder.write(&Tlv::T188 { android_id: context.android_id.clone() })?;
        }
        if !context.imei.is_empty() {
            builder.write(&Tlv::T109 { imei: context.imei.clone() })?;
            builder.write(&Tlv::T144 {
                tgtgt_key: self.tgtgt_key,
                blocks: vec![
                    Tlv::T109 { imei: context.imei.clone() },
                    Tlv::T124 {
                        os_type: consts::OS_TYPE.to_string(),
                        os_version: context.os_version.clone(),
                        network_type: context.connection_type as u16,
                        sim_operator: context.sim_operator.clone(),
                        address: Vec::new(),
                        apn: context.apn.clone(),
                    },
                    Tlv::T128 {
                        new_install: false,
                        read_guid: true,
                        guid_changed: false,
                        dev_report: 0x0100_0000,
                        model: context.os_version.clone(),
                        guid,
                        brand: String::new(),
                    },
                    Tlv::T16E { device_name: context.android_id.clone() },
                ],
            })?;
        }
        Ok(())
    }
}

/// Ask the gateway to (re)send the verification text message.
#[derive(Clone, Debug)]
pub struct RequestSmsSend {
    /// The SMS sig from the 0x174 block of the challenge response.
    pub sig: Vec<u8>,
    /// Companion 0x104 sig, echoed when the challenge carried one.
    pub verify_sig: Option<Vec<u8>>,
    pub sms_app_id: u32,
}

impl WireRequest for RequestSmsSend {
    const CMD: u16 = 2064;
    const SUB_CMD: u16 = 8;
    const MODE: EncryptMode = EncryptMode::Ecdh;

    fn write_tlvs(
        &self,
        builder: &mut TlvBuilder<'_, '_>,
        context: &RequestContext,
        _seq: u32,
    ) -> Result<()> {
        builder.write(&Tlv::T8 { locale_id: context.locale as u32 })?;
        if let Some(verify_sig) = &self.verify_sig {
            builder.write(&Tlv::T104 { sig: verify_sig.clone() })?;
        }
        builder.write(&Tlv::T116 {
            bitmap: consts::BITMAP,
            get_sig: consts::GET_SIG,
            sub_app_id_list: Vec::new(),
        })?;
        builder.write(&Tlv::T174 { sig: self.sig.clone() })?;
        builder.write(&Tlv::T17A { sms_app_id: self.sms_app_id })?;
        Ok(())
    }
}

/// Submit the code received by text message.
#[derive(Clone, Debug)]
pub struct RequestSmsVerify {
    pub code: String,
    /// The SMS sig from the 0x174 block of the challenge response.
    pub sig: Vec<u8>,
    /// Companion 0x104 sig, echoed when the challenge carried one.
    pub verify_sig: Option<Vec<u8>>,
}

impl WireRequest for RequestSmsVerify {
    const CMD: u16 = 2064;
    const SUB_CMD: u16 = 7;
    const MODE: EncryptMode = EncryptMode::Ecdh;

    fn write_tlvs(
        &self,
        builder: &mut TlvBuilder<'_, '_>,
        context: &RequestContext,
        _seq: u32,
    ) -> Result<()> {
        builder.write(&Tlv::T8 { locale_id: context.locale as u32 })?;
        if let Some(verify_sig) = &self.verify_sig {
            builder.write(&Tlv::T104 { sig: verify_sig.clone() })?;
        }
        builder.write(&Tlv::T116 {
            bitmap: consts::BITMAP,
            get_sig: consts::GET_SIG,
            sub_app_id_list: Vec::new(),
        })?;
        builder.write(&Tlv::T174 { sig: self.sig.clone() })?;
        builder.write(&Tlv::T17C { sms_code: self.code.clone() })?;
        Ok(())
    }
}

/// The captcha answer round of the handshake.
#[derive(Clone, Debug)]
pub struct RequestCaptchaVerify {
    /// The user's transcription of the picture.
    pub code: String,
    /// The sig from the 0x104 block of the challenge response.
    pub sig: Vec<u8>,
}

impl WireRequest for RequestCaptchaVerify {
    const CMD: u16 = 2064;
    const SUB_CMD: u16 = 2;
    const MODE: EncryptMode = EncryptMode::Ecdh;

    fn write_tlvs(
        &self,
        builder: &mut TlvBuilder<'_, '_>,
        context: &RequestContext,
        seq: u32,
    ) -> Result<()> {
        builder.write(&Tlv::T2 { code: self.code.clone(), sign: self.sig.clone() })?;
        builder.write(&Tlv::T104 { sig: self.sig.clone() })?;
        builder.write(&Tlv::T116 {
            bitmap: consts::BITMAP,
            get_sig: consts::GET_SIG,
            sub_app_id_list: Vec::new(),
        })?;
        builder.write(&Tlv::T154 { seq })?;
        builder.write(&Tlv::T8 { locale_id: context.locale as u32 })?;
        Ok(())
    }
}
