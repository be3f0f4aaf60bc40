//! Byte-level layout checks for the block catalogue.

use oicq_codec::io::Writer;
use oicq_crypto::md5;
use oicq_wtlogin::tlv::{Tlv, TlvBuilder};

/// Serialize one block and return its body (header stripped).
fn body_of(tlv: &Tlv) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut w = Writer::growable(&mut buf);
    let mut builder = TlvBuilder::new(&mut w);
    builder.write(tlv).unwrap();
    assert_eq!(buf[..2], tlv.id().to_be_bytes());
    let len = u16::from_be_bytes(buf[2..4].try_into().unwrap()) as usize;
    assert_eq!(len, buf.len() - 4);
    buf.split_off(4)
}

#[test]
fn t1_identity_stamp() {
    let body = body_of(&Tlv::T1 {
        uin: 10001,
        server_time: 1_500_000_000,
        client_ip: [10, 0, 0, 1],
    });
    assert_eq!(body.len(), 2 + 4 + 4 + 4 + 4 + 2);
    assert_eq!(body[..2], 1u16.to_be_bytes());
    // body[2..6] is the random word.
    assert_eq!(body[6..10], 10001u32.to_be_bytes());
    assert_eq!(body[10..14], 1_500_000_000u32.to_be_bytes());
    assert_eq!(body[14..18], [10, 0, 0, 1]);
    assert_eq!(body[18..], 0u16.to_be_bytes());
}

#[test]
fn t2_captcha_answer() {
    let body = body_of(&Tlv::T2 { code: "ab".into(), sign: vec![0xFF, 0xEE] });
    assert_eq!(
        body,
        [0, 0, 0, 2, b'a', b'b', 0, 2, 0xFF, 0xEE]
    );
}

#[test]
fn t8_locale() {
    let body = body_of(&Tlv::T8 { locale_id: 2052 });
    assert_eq!(body.len(), 8);
    assert_eq!(body[2..6], 2052u32.to_be_bytes());
}

#[test]
fn t18_ping_identity() {
    let body = body_of(&Tlv::T18 { app_id: 16, client_version: 8001, uin: 10001 });
    assert_eq!(body.len(), 2 + 4 + 4 + 4 + 4 + 2 + 2);
    assert_eq!(body[..2], 1u16.to_be_bytes());
    assert_eq!(body[6..10], 16u32.to_be_bytes());
    assert_eq!(body[10..14], 8001u32.to_be_bytes());
    assert_eq!(body[14..18], 10001u32.to_be_bytes());
}

#[test]
fn t100_sig_request() {
    let body = body_of(&Tlv::T100 {
        app_id: 16,
        sub_app_id: 100,
        client_version: 8001,
        sig_map: 0x001E_1060,
    });
    assert_eq!(body.len(), 22);
    assert_eq!(body[..2], 1u16.to_be_bytes());
    assert_eq!(body[2..6], 5u32.to_be_bytes());
    assert_eq!(body[6..10], 16u32.to_be_bytes());
    assert_eq!(body[10..14], 100u32.to_be_bytes());
    assert_eq!(body[14..18], 8001u32.to_be_bytes());
    assert_eq!(body[18..22], 0x001E_1060u32.to_be_bytes());
}

#[test]
fn t107_capability() {
    let body = body_of(&Tlv::T107 { pic_type: 1, cap_type: 2, pic_size: 3, ret_type: 4 });
    assert_eq!(body, [0, 1, 2, 0, 3, 4]);
}

#[test]
fn opaque_blocks_pass_through() {
    assert_eq!(body_of(&Tlv::T108 { ksid: vec![1, 2] }), [1, 2]);
    assert_eq!(body_of(&Tlv::T10A { tgt: vec![3] }), [3]);
    assert_eq!(body_of(&Tlv::T127 { exchange_buf: vec![4, 5] }), [4, 5]);
    assert_eq!(body_of(&Tlv::T143 { d2: vec![6] }), [6]);
    assert_eq!(body_of(&Tlv::T172 { rollback_sig: vec![7] }), [7]);
    assert_eq!(body_of(&Tlv::T174 { sig: vec![8] }), [8]);
    assert_eq!(body_of(&Tlv::T112 { account: "user".into() }), *b"user");
    assert_eq!(body_of(&Tlv::T16E { device_name: "pixel".into() }), *b"pixel");
}

#[test]
fn t116_ticket_bitmap() {
    let body = body_of(&Tlv::T116 {
        bitmap: 0x7F7C,
        get_sig: 0x0001_0400,
        sub_app_id_list: vec![2, 3],
    });
    assert_eq!(body[0], 0);
    assert_eq!(body[1..5], 0x7F7Cu32.to_be_bytes());
    assert_eq!(body[5..9], 0x0001_0400u32.to_be_bytes());
    assert_eq!(body[9], 2);
    assert_eq!(body[10..14], 2u32.to_be_bytes());
    assert_eq!(body[14..18], 3u32.to_be_bytes());
}

#[test]
fn t128_device_identity() {
    let body = body_of(&Tlv::T128 {
        new_install: false,
        read_guid: true,
        guid_changed: false,
        dev_report: 0x0100_0000,
        model: "sailfish".into(),
        guid: [9; 16],
        brand: "google".into(),
    });
    assert_eq!(body[..2], 0u16.to_be_bytes());
    assert_eq!(body[2..5], [0, 1, 0]);
    assert_eq!(body[5..9], 0x0100_0000u32.to_be_bytes());
    assert_eq!(body[9..11], 8u16.to_be_bytes());
    assert_eq!(body[11..19], *b"sailfish");
    assert_eq!(body[19..21], 16u16.to_be_bytes());
    assert_eq!(body[21..37], [9; 16]);
    assert_eq!(body[37..39], 6u16.to_be_bytes());
    assert_eq!(body[39..45], *b"google");
}

#[test]
fn t141_network_report() {
    let body = body_of(&Tlv::T141 {
        sim_operator: "CMCC".into(),
        network_type: 1,
        apn: "wifi".into(),
    });
    assert_eq!(body[..2], 1u16.to_be_bytes());
    assert_eq!(body[2..4], 4u16.to_be_bytes());
    assert_eq!(body[4..8], *b"CMCC");
    assert_eq!(body[8..10], 1u16.to_be_bytes());
    assert_eq!(body[10..12], 4u16.to_be_bytes());
    assert_eq!(body[12..16], *b"wifi");
}

#[test]
fn t142_apk_id_truncates() {
    let body = body_of(&Tlv::T142 { apk_id: "x".repeat(40) });
    assert_eq!(body[..2], 0u16.to_be_bytes());
    assert_eq!(body[2..4], 32u16.to_be_bytes());
    assert_eq!(body.len(), 4 + 32);
}

#[test]
fn t145_guid() {
    assert_eq!(body_of(&Tlv::T145 { guid: [0xAB; 16] }), [0xAB; 16]);
}

#[test]
fn t147_attestation() {
    let body = body_of(&Tlv::T147 {
        app_id: 16,
        apk_version: "5.0.0".into(),
        apk_signature: vec![0xA6; 16],
    });
    assert_eq!(body[..4], 16u32.to_be_bytes());
    assert_eq!(body[4..6], 5u16.to_be_bytes());
    assert_eq!(body[6..11], *b"5.0.0");
    assert_eq!(body[11..13], 16u16.to_be_bytes());
    assert_eq!(body[13..], [0xA6; 16]);
}

#[test]
fn t148_descriptor() {
    let body = body_of(&Tlv::T148 {
        app_name: "qq".into(),
        sso_version: 5,
        app_id: 16,
        sub_app_id: 100,
        app_version: "5.0.0".into(),
    });
    assert_eq!(body[..2], 2u16.to_be_bytes());
    assert_eq!(body[2..4], *b"qq");
    assert_eq!(body[4..8], 5u32.to_be_bytes());
    assert_eq!(body[8..12], 16u32.to_be_bytes());
    assert_eq!(body[12..16], 100u32.to_be_bytes());
    assert_eq!(body[16..18], 5u16.to_be_bytes());
    assert_eq!(body[18..], *b"5.0.0");
}

#[test]
fn small_fixed_blocks() {
    assert_eq!(body_of(&Tlv::T153 { rooted: true }), [0, 1]);
    assert_eq!(body_of(&Tlv::T153 { rooted: false }), [0, 0]);
    assert_eq!(body_of(&Tlv::T154 { seq: 7 }), 7u32.to_be_bytes());
    assert_eq!(body_of(&Tlv::T166 { image_type: 1 }), [1]);
    assert_eq!(body_of(&Tlv::T17A { sms_app_id: 9 }), 9u32.to_be_bytes());
    assert_eq!(body_of(&Tlv::T183 { salt: 0x1122_3344 }), 0x1122_3344u64.to_be_bytes());
    assert_eq!(body_of(&Tlv::T184 { sms_password_md5: [3; 16] }), [3; 16]);
    assert_eq!(body_of(&Tlv::T185), [1, 1]);
}

#[test]
fn t16b_domain_list() {
    let body = body_of(&Tlv::T16B {
        domains: vec!["game.qq.com".into(), "qun.qq.com".into()],
    });
    assert_eq!(body[..2], 2u16.to_be_bytes());
    assert_eq!(body[2..4], 11u16.to_be_bytes());
    assert_eq!(body[4..15], *b"game.qq.com");
    assert_eq!(body[15..17], 10u16.to_be_bytes());
    assert_eq!(body[17..], *b"qun.qq.com");
}

#[test]
fn t17c_sms_code() {
    assert_eq!(body_of(&Tlv::T17C { sms_code: "123456".into() }), {
        let mut expected = 6u16.to_be_bytes().to_vec();
        expected.extend_from_slice(b"123456");
        expected
    });
}

#[test]
fn hashed_device_blocks() {
    assert_eq!(
        body_of(&Tlv::T109 { imei: "867335032183349".into() }),
        md5!(b"867335032183349")
    );
    assert_eq!(
        body_of(&Tlv::T187 { wifi_mac: "00:11:22:33:44:55".into() }),
        md5!(b"00:11:22:33:44:55")
    );
    assert_eq!(
        body_of(&Tlv::T188 { android_id: "9774d56d682e549c".into() }),
        md5!(b"9774d56d682e549c")
    );
}
