//! The numbered TLV blocks composed into wtlogin request bodies.
//!
//! Every block is `[id: u16 BE][len: u16 BE][body]`, back to back; the
//! enclosing frame carries the count. Each id has a fixed layout of its
//! own, modelled here as one closed sum type. [`TlvBuilder`] emits blocks
//! with length backfilling; [`TlvReader`] splits a response body back into
//! raw groups, which [`RawTlv::parse`] lifts into the typed catalogue for
//! the ids a gateway may send.

use oicq_codec::io::{Reader, Writer};
use oicq_crypto::{md5, tea};

use crate::{Error, Result};

// ─── helpers ─────────────────────────────────────────────────────────────────

/// Write a `u16 BE` length-prefixed byte run, truncating at `limit`.
fn write_prefixed(w: &mut Writer<'_>, data: &[u8], limit: Option<usize>) -> Result<()> {
    let take = match limit {
        Some(limit) => data.len().min(limit),
        None => data.len(),
    };
    if take > u16::MAX as usize {
        return Err(Error::protocol("length-prefixed run over 64 KiB"));
    }
    w.write_u16_be(take as u16)?;
    w.write_bytes(&data[..take])?;
    Ok(())
}

fn read_prefixed(r: &mut Reader<'_>) -> Result<Vec<u8>> {
    let len = r.read_u16_be()? as usize;
    Ok(r.read_bytes(len)?.to_vec())
}

fn read_prefixed_str(r: &mut Reader<'_>) -> Result<String> {
    String::from_utf8(read_prefixed(r)?)
        .map_err(|_| Error::Codec(oicq_codec::Error::InvalidUtf8))
}

/// TEA key protecting the TLV 0x106 sub-body.
fn t106_key(password_md5: &[u8; 16], uin: u32) -> [u8; 16] {
    md5!(password_md5, [0u8; 4], uin.to_be_bytes())
}

// ─── catalogue ───────────────────────────────────────────────────────────────

/// One wtlogin block, by catalogue id.
///
/// Write-side variants carry the source data; the serializer derives any
/// digests or encrypted sub-bodies on the way out.
#[derive(Clone, Debug, PartialEq)]
pub enum Tlv {
    /// Client identity stamp.
    T1 { uin: u32, server_time: u32, client_ip: [u8; 4] },
    /// Captcha answer.
    T2 { code: String, sign: Vec<u8> },
    /// Locale report.
    T8 { locale_id: u32 },
    /// Ping-style app identity, mirrored in the outer frame.
    T18 { app_id: u32, client_version: u32, uin: u32 },
    /// Signature request map.
    T100 { app_id: u32, sub_app_id: u32, client_version: u32, sig_map: u32 },
    /// Opaque verification sig echoed between captcha round trips.
    T104 { sig: Vec<u8> },
    /// Captcha picture pushed by the gateway.
    T105 { width: u16, height: u16, picture: Vec<u8> },
    /// The password proof, TEA-encrypted under a key derived from the
    /// password digest and uin.
    T106 {
        app_id: u32,
        sub_app_id: u32,
        client_version: u32,
        uin: u32,
        server_time: u32,
        client_ip: [u8; 4],
        password_md5: [u8; 16],
        tgtgt_key: [u8; 16],
        guid: [u8; 16],
        /// Caller-supplied random word mixed into the plaintext.
        rand: u32,
    },
    /// Captcha capability declaration.
    T107 { pic_type: u16, cap_type: u8, pic_size: u16, ret_type: u8 },
    /// Ksid carried over from an earlier session.
    T108 { ksid: Vec<u8> },
    /// Hashed IMEI.
    T109 { imei: String },
    /// The TGT ticket (A2).
    T10A { tgt: Vec<u8> },
    /// Non-numeric account alias.
    T112 { account: String },
    /// Requested ticket bitmap.
    T116 { bitmap: u32, get_sig: u32, sub_app_id_list: Vec<u32> },
    /// Device software survey. Strings are truncated to their slots.
    T124 {
        os_type: String,
        os_version: String,
        network_type: u16,
        sim_operator: String,
        address: Vec<u8>,
        apn: String,
    },
    /// Opaque exchange buffer, forwarded untouched.
    T127 { exchange_buf: Vec<u8> },
    /// Device identity survey.
    T128 {
        new_install: bool,
        read_guid: bool,
        guid_changed: bool,
        dev_report: u32,
        model: String,
        guid: [u8; 16],
        brand: String,
    },
    /// Network attachment report.
    T141 { sim_operator: String, network_type: u16, apn: String },
    /// Package id.
    T142 { apk_id: String },
    /// The D2 ticket.
    T143 { d2: Vec<u8> },
    /// Encrypted bundle of device-survey blocks, under the tgtgt key.
    T144 { tgtgt_key: [u8; 16], blocks: Vec<Tlv> },
    /// Device GUID.
    T145 { guid: [u8; 16] },
    /// Gateway-side rejection notice.
    T146 { code: u16, title: String, message: String },
    /// APK attestation.
    T147 { app_id: u32, apk_version: String, apk_signature: Vec<u8> },
    /// Application descriptor.
    T148 {
        app_name: String,
        sso_version: u32,
        app_id: u32,
        sub_app_id: u32,
        app_version: String,
    },
    /// Root detection verdict.
    T153 { rooted: bool },
    /// The request sequence echo.
    T154 { seq: u32 },
    /// Preferred captcha image format.
    T166 { image_type: u8 },
    /// The no-picture sig.
    T16A { no_pic_sig: Vec<u8> },
    /// Trusted domain list.
    T16B { domains: Vec<String> },
    /// Device display name.
    T16E { device_name: String },
    /// Rollback sig.
    T172 { rollback_sig: Vec<u8> },
    /// SMS verification sig.
    T174 { sig: Vec<u8> },
    /// SDK build stamp.
    T177 { build_time: u32, sdk_version: String },
    /// SMS relay app id.
    T17A { sms_app_id: u32 },
    /// Submitted SMS code.
    T17C { sms_code: String },
    /// Salt for the SMS password digest.
    T183 { salt: u64 },
    /// Salted SMS password digest.
    T184 { sms_password_md5: [u8; 16] },
    /// SMS channel capability marker.
    T185,
    /// Hashed WiFi MAC.
    T187 { wifi_mac: String },
    /// Hashed Android id.
    T188 { android_id: String },
}

impl Tlv {
    /// The catalogue id emitted in the block header.
    pub fn id(&self) -> u16 {
        match self {
            Self::T1 { .. } => 0x1,
            Self::T2 { .. } => 0x2,
            Self::T8 { .. } => 0x8,
            Self::T18 { .. } => 0x18,
            Self::T100 { .. } => 0x100,
            Self::T104 { .. } => 0x104,
            Self::T105 { .. } => 0x105,
            Self::T106 { .. } => 0x106,
            Self::T107 { .. } => 0x107,
            Self::T108 { .. } => 0x108,
            Self::T109 { .. } => 0x109,
            Self::T10A { .. } => 0x10A,
            Self::T112 { .. } => 0x112,
            Self::T116 { .. } => 0x116,
            Self::T124 { .. } => 0x124,
            Self::T127 { .. } => 0x127,
            Self::T128 { .. } => 0x128,
            Self::T141 { .. } => 0x141,
            Self::T142 { .. } => 0x142,
            Self::T143 { .. } => 0x143,
            Self::T144 { .. } => 0x144,
            Self::T145 { .. } => 0x145,
            Self::T146 { .. } => 0x146,
            Self::T147 { .. } => 0x147,
            Self::T148 { .. } => 0x148,
            Self::T153 { .. } => 0x153,
            Self::T154 { .. } => 0x154,
            Self::T166 { .. } => 0x166,
            Self::T16A { .. } => 0x16A,
            Self::T16B { .. } => 0x16B,
            Self::T16E { .. } => 0x16E,
            Self::T172 { .. } => 0x172,
            Self::T174 { .. } => 0x174,
            Self::T177 { .. } => 0x177,
            Self::T17A { .. } => 0x17A,
            Self::T17C { .. } => 0x17C,
            Self::T183 { .. } => 0x183,
            Self::T184 { .. } => 0x184,
            Self::T185 => 0x185,
            Self::T187 { .. } => 0x187,
            Self::T188 { .. } => 0x188,
        }
    }

    fn write_body(&self, w: &mut Writer<'_>) -> Result<()> {
        match self {
            Self::T1 { uin, server_time, client_ip } => {
                w.write_u16_be(1)?; // ip version
                let mut rand = [0u8; 4];
                getrandom::getrandom(&mut rand).expect("getrandom failed");
                w.write_bytes(&rand)?;
                w.write_u32_be(*uin)?;
                w.write_u32_be(*server_time)?;
                w.write_bytes(client_ip)?;
                w.write_u16_be(0)?;
            }
            Self::T2 { code, sign } => {
                w.write_u16_be(0)?; // sig version
                write_prefixed(w, code.as_bytes(), None)?;
                write_prefixed(w, sign, None)?;
            }
            Self::T8 { locale_id } => {
                w.write_u16_be(0)?;
                w.write_u32_be(*locale_id)?;
                w.write_u16_be(0)?;
            }
            Self::T18 { app_id, client_version, uin } => {
                w.write_u16_be(1)?; // ping version
                w.write_u32_be(0x0000_0600)?; // sso version
                w.write_u32_be(*app_id)?;
                w.write_u32_be(*client_version)?;
                w.write_u32_be(*uin)?;
                w.write_u16_be(0)?;
                w.write_u16_be(0)?;
            }
            Self::T100 { app_id, sub_app_id, client_version, sig_map } => {
                w.write_u16_be(1)?; // db buf version
                w.write_u32_be(5)?; // sso version
                w.write_u32_be(*app_id)?;
                w.write_u32_be(*sub_app_id)?;
                w.write_u32_be(*client_version)?;
                w.write_u32_be(*sig_map)?;
            }
            Self::T104 { sig } => w.write_bytes(sig)?,
            Self::T105 { width, height, picture } => {
                w.write_u16_be(*width)?;
                w.write_u16_be(*height)?;
                w.write_bytes(picture)?;
            }
            Self::T106 {
                app_id,
                sub_app_id,
                client_version,
                uin,
                server_time,
                client_ip,
                password_md5,
                tgtgt_key,
                guid,
                rand,
            } => {
                let mut plain = Vec::with_capacity(98);
                {
                    let mut body = Writer::growable(&mut plain);
                    body.write_u16_be(4)?; // tgtgt version
                    body.write_u32_be(*rand)?;
                    body.write_u32_be(5)?; // sso version
                    body.write_u32_be(*app_id)?;
                    body.write_u32_be(*client_version)?;
                    body.write_u64_be(*uin as u64)?;
                    body.write_u32_be(*server_time)?;
                    body.write_bytes(client_ip)?;
                    body.write_u8(1)?; // save password
                    body.write_bytes(password_md5)?;
                    body.write_bytes(tgtgt_key)?;
                    body.write_u32_be(0)?;
                    body.write_u8(1)?; // guid available
                    body.write_bytes(guid)?;
                    body.write_u32_be(*sub_app_id)?;
                    body.write_u32_be(1)?; // password login
                    body.write_u16_be(0)?; // no attach
                }
                debug_assert_eq!(plain.len(), 98);
                let key = tea::TeaKey::from_bytes(&t106_key(password_md5, *uin))?;
                w.write_bytes(&tea::encrypt(&plain, &key))?;
            }
            Self::T107 { pic_type, cap_type, pic_size, ret_type } => {
                w.write_u16_be(*pic_type)?;
                w.write_u8(*cap_type)?;
                w.write_u16_be(*pic_size)?;
                w.write_u8(*ret_type)?;
            }
            Self::T108 { ksid } => w.write_bytes(ksid)?,
            Self::T109 { imei } => w.write_bytes(&md5!(imei.as_bytes()))?,
            Self::T10A { tgt } => w.write_bytes(tgt)?,
            Self::T112 { account } => w.write_bytes(account.as_bytes())?,
            Self::T116 { bitmap, get_sig, sub_app_id_list } => {
                w.write_u8(0)?; // version
                w.write_u32_be(*bitmap)?;
                w.write_u32_be(*get_sig)?;
                w.write_u8(sub_app_id_list.len() as u8)?;
                for sub_app_id in sub_app_id_list {
                    w.write_u32_be(*sub_app_id)?;
                }
            }
            Self::T124 { os_type, os_version, network_type, sim_operator, address, apn } => {
                write_prefixed(w, os_type.as_bytes(), Some(16))?;
                write_prefixed(w, os_version.as_bytes(), Some(16))?;
                w.write_u16_be(*network_type)?;
                write_prefixed(w, sim_operator.as_bytes(), Some(16))?;
                write_prefixed(w, address, Some(32))?;
                write_prefixed(w, apn.as_bytes(), Some(16))?;
            }
            Self::T127 { exchange_buf } => w.write_bytes(exchange_buf)?,
            Self::T128 { new_install, read_guid, guid_changed, dev_report, model, guid, brand } => {
                w.write_u16_be(0)?;
                w.write_u8(*new_install as u8)?;
                w.write_u8(*read_guid as u8)?;
                w.write_u8(*guid_changed as u8)?;
                w.write_u32_be(*dev_report)?;
                write_prefixed(w, model.as_bytes(), Some(32))?;
                write_prefixed(w, guid, Some(16))?;
                write_prefixed(w, brand.as_bytes(), Some(16))?;
            }
            Self::T141 { sim_operator, network_type, apn } => {
                w.write_u16_be(1)?; // version
                write_prefixed(w, sim_operator.as_bytes(), None)?;
                w.write_u16_be(*network_type)?;
                write_prefixed(w, apn.as_bytes(), None)?;
            }
            Self::T142 { apk_id } => {
                w.write_u16_be(0)?;
                write_prefixed(w, apk_id.as_bytes(), Some(32))?;
            }
            Self::T143 { d2 } => w.write_bytes(d2)?,
            Self::T144 { tgtgt_key, blocks } => {
                let mut plain = Vec::new();
                {
                    let mut inner = Writer::growable(&mut plain);
                    inner.write_u16_be(blocks.len() as u16)?;
                    let mut builder = TlvBuilder::new(&mut inner);
                    for block in blocks {
                        builder.write(block)?;
                    }
                }
                let key = tea::TeaKey::from_bytes(tgtgt_key)?;
                w.write_bytes(&tea::encrypt(&plain, &key))?;
            }
            Self::T145 { guid } => w.write_bytes(guid)?,
            Self::T146 { code, title, message } => {
                w.write_u16_be(*code)?;
                write_prefixed(w, title.as_bytes(), None)?;
                write_prefixed(w, message.as_bytes(), None)?;
            }
            Self::T147 { app_id, apk_version, apk_signature } => {
                w.write_u32_be(*app_id)?;
                write_prefixed(w, apk_version.as_bytes(), Some(32))?;
                write_prefixed(w, apk_signature, Some(32))?;
            }
            Self::T148 { app_name, sso_version, app_id, sub_app_id, app_version } => {
                write_prefixed(w, app_name.as_bytes(), Some(32))?;
                w.write_u32_be(*sso_version)?;
                w.write_u32_be(*app_id)?;
                w.write_u32_be(*sub_app_id)?;
                write_prefixed(w, app_version.as_bytes(), Some(32))?;
            }
            Self::T153 { rooted } => w.write_u16_be(*rooted as u16)?,
            Self::T154 { seq } => w.write_u32_be(*seq)?,
            Self::T166 { image_type } => w.write_u8(*image_type)?,
            Self::T16A { no_pic_sig } => w.write_bytes(no_pic_sig)?,
            Self::T16B { domains } => {
                w.write_u16_be(domains.len() as u16)?;
                for domain in domains {
                    write_prefixed(w, domain.as_bytes(), None)?;
                }
            }
            Self::T16E { device_name } => w.write_bytes(device_name.as_bytes())?,
            Self::T172 { rollback_sig } => w.write_bytes(rollback_sig)?,
            Self::T174 { sig } => w.write_bytes(sig)?,
            Self::T177 { build_time, sdk_version } => {
                w.write_u8(1)?;
                w.write_u32_be(*build_time)?;
                write_prefixed(w, sdk_version.as_bytes(), None)?;
            }
            Self::T17A { sms_app_id } => w.write_u32_be(*sms_app_id)?,
            Self::T17C { sms_code } => write_prefixed(w, sms_code.as_bytes(), None)?,
            Self::T183 { salt } => w.write_u64_be(*salt)?,
            Self::T184 { sms_password_md5 } => w.write_bytes(sms_password_md5)?,
            Self::T185 => {
                w.write_u8(1)?;
                w.write_u8(1)?;
            }
            Self::T187 { wifi_mac } => w.write_bytes(&md5!(wifi_mac.as_bytes()))?,
            Self::T188 { android_id } => w.write_bytes(&md5!(android_id.as_bytes()))?,
        }
        Ok(())
    }
}

// ─── builder ─────────────────────────────────────────────────────────────────

/// Emits `[id][len][body]` groups with length backfilling and keeps the
/// running count for the enclosing frame.
pub struct TlvBuilder<'w, 'b> {
    w: &'w mut Writer<'b>,
    count: u16,
}

impl<'w, 'b> TlvBuilder<'w, 'b> {
    pub fn new(w: &'w mut Writer<'b>) -> Self {
        Self::with_count(w, 0)
    }

    pub fn with_count(w: &'w mut Writer<'b>, initial_count: u16) -> Self {
        Self { w, count: initial_count }
    }

    /// Blocks written so far.
    pub fn count(&self) -> u16 {
        self.count
    }

    pub fn write(&mut self, tlv: &Tlv) -> Result<()> {
        self.w.write_u16_be(tlv.id())?;
        let len_pos = self.w.position();
        self.w.write_u16_be(0)?;
        let body_start = self.w.position();
        tlv.write_body(self.w)?;
        let end = self.w.position();

        let body_len = end - body_start;
        if body_len > u16::MAX as usize {
            return Err(Error::protocol(format!(
                "tlv 0x{:x} body of {body_len} bytes overflows its length field",
                tlv.id()
            )));
        }
        self.w.seek(len_pos)?;
        self.w.write_u16_be(body_len as u16)?;
        self.w.seek(end)?;
        self.count += 1;
        Ok(())
    }
}

// ─── reader ──────────────────────────────────────────────────────────────────

/// An undecoded `[id][len][body]` group from a response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawTlv {
    pub id: u16,
    pub body: Vec<u8>,
}

impl RawTlv {
    /// Lift into the typed catalogue.
    ///
    /// Covers the ids a gateway response may legitimately carry; anything
    /// else (including the client-only encrypted blocks) is a protocol
    /// violation for the frame.
    pub fn parse(&self) -> Result<Tlv> {
        let mut r = Reader::new(&self.body);
        let tlv = match self.id {
            0x104 => Tlv::T104 { sig: self.body.clone() },
            0x105 => Tlv::T105 {
                width: r.read_u16_be()?,
                height: r.read_u16_be()?,
                picture: r.rest().to_vec(),
            },
            0x10A => Tlv::T10A { tgt: self.body.clone() },
            0x143 => Tlv::T143 { d2: self.body.clone() },
            0x146 => Tlv::T146 {
                code: r.read_u16_be()?,
                title: read_prefixed_str(&mut r)?,
                message: read_prefixed_str(&mut r)?,
            },
            0x16A => Tlv::T16A { no_pic_sig: self.body.clone() },
            0x172 => Tlv::T172 { rollback_sig: self.body.clone() },
            0x174 => Tlv::T174 { sig: self.body.clone() },
            0x17A => Tlv::T17A { sms_app_id: r.read_u32_be()? },
            id => {
                return Err(Error::protocol(format!(
                    "unexpected tlv 0x{id:x} in a gateway response"
                )));
            }
        };
        Ok(tlv)
    }
}

/// Splits a body into raw blocks.
pub struct TlvReader<'a> {
    r: Reader<'a>,
}

impl<'a> TlvReader<'a> {
    pub fn new(body: &'a [u8]) -> Self {
        Self { r: Reader::new(body) }
    }

    /// Wrap a cursor already positioned at the first block header.
    pub fn from_reader(r: Reader<'a>) -> Self {
        Self { r }
    }

    pub fn read(&mut self) -> Result<RawTlv> {
        let id = self.r.read_u16_be()?;
        let len = self.r.read_u16_be()? as usize;
        let body = self
            .r
            .read_bytes(len)
            .map_err(|_| Error::protocol(format!("tlv 0x{id:x} truncated")))?;
        Ok(RawTlv { id, body: body.to_vec() })
    }

    pub fn read_all(&mut self, count: usize) -> Result<Vec<RawTlv>> {
        (0..count).map(|_| self.read()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(tlvs: &[Tlv]) -> (Vec<u8>, u16) {
        let mut buf = Vec::new();
        let mut w = Writer::growable(&mut buf);
        let mut builder = TlvBuilder::new(&mut w);
        for tlv in tlvs {
            builder.write(tlv).unwrap();
        }
        let count = builder.count();
        (buf, count)
    }

    #[test]
    fn header_length_matches_body() {
        let (buf, count) = build(&[Tlv::T154 { seq: 7 }]);
        assert_eq!(count, 1);
        assert_eq!(buf[..2], 0x0154u16.to_be_bytes());
        let len = u16::from_be_bytes(buf[2..4].try_into().unwrap()) as usize;
        assert_eq!(len, buf.len() - 4);
        assert_eq!(buf[4..], 7u32.to_be_bytes());
    }

    #[test]
    fn count_advances_per_block() {
        let (_, count) = build(&[
            Tlv::T154 { seq: 0 },
            Tlv::T8 { locale_id: 2052 },
            Tlv::T145 { guid: [9; 16] },
        ]);
        assert_eq!(count, 3);
    }

    #[test]
    fn initial_count_offsets() {
        let mut buf = Vec::new();
        let mut w = Writer::growable(&mut buf);
        let mut builder = TlvBuilder::with_count(&mut w, 5);
        builder.write(&Tlv::T166 { image_type: 1 }).unwrap();
        assert_eq!(builder.count(), 6);
    }

    #[test]
    fn t106_encrypts_to_112_bytes() {
        let tlv = Tlv::T106 {
            app_id: 16,
            sub_app_id: 100,
            client_version: 8001,
            uin: 10001,
            server_time: 1_500_000_000,
            client_ip: [0; 4],
            password_md5: [1; 16],
            tgtgt_key: [2; 16],
            guid: [3; 16],
            rand: 0xDEAD_BEEF,
        };
        let (buf, _) = build(std::slice::from_ref(&tlv));
        // 98-byte plaintext, padded by the cipher to align_up(98 + 10, 8).
        assert_eq!(buf.len() - 4, tea::output_len(98));
        assert_eq!(buf.len() - 4, 112);
    }

    #[test]
    fn t106_decrypts_under_derived_key() {
        let password_md5 = [7u8; 16];
        let uin = 10001u32;
        let tlv = Tlv::T106 {
            app_id: 16,
            sub_app_id: 100,
            client_version: 8001,
            uin,
            server_time: 1_500_000_000,
            client_ip: [10, 0, 0, 1],
            password_md5,
            tgtgt_key: [2; 16],
            guid: [3; 16],
            rand: 42,
        };
        let (buf, _) = build(std::slice::from_ref(&tlv));
        let key = tea::TeaKey::from_bytes(&t106_key(&password_md5, uin)).unwrap();
        let plain = tea::decrypt(&buf[4..], &key).unwrap();
        assert_eq!(plain.len(), 98);
        assert_eq!(plain[..2], [0u8, 4]); // tgtgt version
        assert_eq!(plain[2..6], 42u32.to_be_bytes()); // rand word
        // uin sits after ver/rand/ssover/appid/clientver as a u64.
        assert_eq!(plain[18..26], (uin as u64).to_be_bytes());
    }

    #[test]
    fn t144_bundle_roundtrips_through_tea() {
        let tgtgt_key = [9u8; 16];
        let tlv = Tlv::T144 {
            tgtgt_key,
            blocks: vec![
                Tlv::T109 { imei: "867335032183349".into() },
                Tlv::T16E { device_name: "pixel".into() },
            ],
        };
        let (buf, _) = build(std::slice::from_ref(&tlv));

        let key = tea::TeaKey::from_bytes(&tgtgt_key).unwrap();
        let plain = tea::decrypt(&buf[4..], &key).unwrap();

        let mut r = Reader::new(&plain);
        assert_eq!(r.read_u16_be().unwrap(), 2);
        let mut reader = TlvReader::from_reader(r);
        let first = reader.read().unwrap();
        assert_eq!(first.id, 0x109);
        assert_eq!(first.body, md5!(b"867335032183349"));
        let second = reader.read().unwrap();
        assert_eq!(second.id, 0x16E);
        assert_eq!(second.body, b"pixel");
    }

    #[test]
    fn t124_truncates_each_slot() {
        let tlv = Tlv::T124 {
            os_type: "a".repeat(40),
            os_version: "b".repeat(40),
            network_type: 2,
            sim_operator: "c".repeat(40),
            address: vec![0xAB; 64],
            apn: "d".repeat(40),
        };
        let (buf, _) = build(std::slice::from_ref(&tlv));
        let mut r = Reader::new(&buf[4..]);
        assert_eq!(read_prefixed(&mut r).unwrap().len(), 16);
        assert_eq!(read_prefixed(&mut r).unwrap().len(), 16);
        assert_eq!(r.read_u16_be().unwrap(), 2);
        assert_eq!(read_prefixed(&mut r).unwrap().len(), 16);
        assert_eq!(read_prefixed(&mut r).unwrap().len(), 32);
        assert_eq!(read_prefixed(&mut r).unwrap().len(), 16);
        assert!(r.is_empty());
    }

    #[test]
    fn t177_layout() {
        let tlv = Tlv::T177 {
            build_time: 1_405_930_122,
            sdk_version: "5.2.2.98".into(),
        };
        let (buf, _) = build(std::slice::from_ref(&tlv));
        let body = &buf[4..];
        assert_eq!(body[0], 1);
        assert_eq!(body[1..5], 1_405_930_122u32.to_be_bytes());
        assert_eq!(body[5..7], 8u16.to_be_bytes());
        assert_eq!(body[7..], *b"5.2.2.98");
    }

    #[test]
    fn response_blocks_parse_back() {
        let picture = vec![0x89, 0x50, 0x4E, 0x47];
        let (buf, count) = build(&[
            Tlv::T105 { width: 130, height: 53, picture: picture.clone() },
            Tlv::T146 { code: 1, title: "denied".into(), message: "wrong password".into() },
            Tlv::T10A { tgt: vec![0xAA; 8] },
        ]);

        let mut reader = TlvReader::new(&buf);
        let raw = reader.read_all(count as usize).unwrap();

        assert_eq!(
            raw[0].parse().unwrap(),
            Tlv::T105 { width: 130, height: 53, picture }
        );
        assert_eq!(
            raw[1].parse().unwrap(),
            Tlv::T146 { code: 1, title: "denied".into(), message: "wrong password".into() }
        );
        assert_eq!(raw[2].parse().unwrap(), Tlv::T10A { tgt: vec![0xAA; 8] });
    }

    #[test]
    fn truncated_block_is_a_protocol_violation() {
        let (mut buf, _) = build(&[Tlv::T154 { seq: 1 }]);
        buf.truncate(buf.len() - 2);
        let mut reader = TlvReader::new(&buf);
        assert!(matches!(
            reader.read().unwrap_err(),
            Error::ProtocolViolation { .. }
        ));
    }

    #[test]
    fn client_only_block_rejected_in_response() {
        let raw = RawTlv { id: 0x106, body: vec![0; 16] };
        assert!(matches!(raw.parse().unwrap_err(), Error::ProtocolViolation { .. }));
    }
}
