//! ECDH key agreement over `secp192k1`.
//!
//! The gateway publishes a fixed uncompressed public key; the client sends
//! its own compressed 25-byte point inside the login frame and both sides
//! take `md5(shared_x)` as the 16-byte TEA session key.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::{Error, Result, md5};

/// The gateway's long-term ECDH public key (uncompressed SEC1 point).
pub const SERVER_PUBLIC_KEY: [u8; 49] = [
    0x04, 0x92, 0x8D, 0x88, 0x50, 0x67, 0x30, 0x88, 0xB3, 0x43, 0x26, 0x4E, 0x0C, 0x6B, 0xAC,
    0xB8, 0x49, 0x6D, 0x69, 0x77, 0x99, 0xF3, 0x72, 0x11, 0xDE, 0xB2, 0x5B, 0xB7, 0x39, 0x06,
    0xCB, 0x08, 0x9F, 0xEA, 0x96, 0x39, 0xB4, 0xE0, 0x26, 0x04, 0x98, 0xB5, 0x1A, 0x99, 0x2D,
    0x50, 0x81, 0x3D, 0xA8,
];

// secp192k1 domain parameters (SEC2): y² = x³ + 3 over F_p.
const FIELD_P: [u8; 24] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFE, 0xFF, 0xFF, 0xEE, 0x37,
];
const ORDER_N: [u8; 24] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE, 0x26, 0xF2, 0xFC,
    0x17, 0x0F, 0x69, 0x46, 0x6A, 0x74, 0xDE, 0xFD, 0x8D,
];
const GEN_X: [u8; 24] = [
    0xDB, 0x4F, 0xF1, 0x0E, 0xC0, 0x57, 0xE9, 0xAE, 0x26, 0xB0, 0x7D, 0x02, 0x80, 0xB7, 0xF4,
    0x34, 0x1D, 0xA5, 0xD1, 0xB1, 0xEA, 0xE0, 0x6C, 0x7D,
];
const GEN_Y: [u8; 24] = [
    0x9B, 0x2F, 0x2F, 0x6D, 0x9C, 0x56, 0x28, 0xA7, 0x84, 0x41, 0x63, 0xD0, 0x15, 0xBE, 0x86,
    0x34, 0x40, 0x82, 0xAA, 0x88, 0xD9, 0x5E, 0x2F, 0x9D,
];

const CURVE_B: u32 = 3;

/// An affine point; `None` plays the point at infinity.
type Point = Option<(BigUint, BigUint)>;

struct Curve {
    p: BigUint,
    n: BigUint,
    g: (BigUint, BigUint),
}

fn curve() -> Curve {
    Curve {
        p: BigUint::from_bytes_be(&FIELD_P),
        n: BigUint::from_bytes_be(&ORDER_N),
        g: (BigUint::from_bytes_be(&GEN_X), BigUint::from_bytes_be(&GEN_Y)),
    }
}

impl Curve {
    fn inv(&self, value: &BigUint) -> BigUint {
        // p is prime, so Fermat gives the inverse.
        value.modpow(&(&self.p - 2u32), &self.p)
    }

    fn sub(&self, a: &BigUint, b: &BigUint) -> BigUint {
        ((a + &self.p) - b) % &self.p
    }

    fn on_curve(&self, x: &BigUint, y: &BigUint) -> bool {
        let lhs = (y * y) % &self.p;
        let rhs = (x * x * x + BigUint::from(CURVE_B)) % &self.p;
        lhs == rhs
    }

    fn double(&self, point: &Point) -> Point {
        let (x, y) = match point {
            Some(p) => p,
            None => return None,
        };
        if y.is_zero() {
            return None;
        }
        // λ = 3x² / 2y (a = 0 on this curve)
        let lambda = (x * x * 3u32 % &self.p) * self.inv(&(y * 2u32 % &self.p)) % &self.p;
        let x3 = self.sub(&(&lambda * &lambda % &self.p), &(x * 2u32 % &self.p));
        let y3 = self.sub(&(&lambda * self.sub(x, &x3) % &self.p), y);
        Some((x3, y3))
    }

    fn add(&self, a: &Point, b: &Point) -> Point {
        let (ax, ay) = match a {
            Some(p) => p,
            None => return b.clone(),
        };
        let (bx, by) = match b {
            Some(p) => p,
            None => return a.clone(),
        };
        if ax == bx {
            return if ay == by { self.double(a) } else { None };
        }
        let lambda = self.sub(by, ay) * self.inv(&self.sub(bx, ax)) % &self.p;
        let x3 = self.sub(&self.sub(&(&lambda * &lambda % &self.p), ax), bx);
        let y3 = self.sub(&(&lambda * self.sub(ax, &x3) % &self.p), ay);
        Some((x3, y3))
    }

    fn mul(&self, scalar: &BigUint, base: &Point) -> Point {
        let mut acc: Point = None;
        for i in (0..scalar.bits()).rev() {
            acc = self.double(&acc);
            if scalar.bit(i) {
                acc = self.add(&acc, base);
            }
        }
        acc
    }
}

fn parse_uncompressed(curve: &Curve, bytes: &[u8; 49]) -> Result<Point> {
    if bytes[0] != 0x04 {
        return Err(Error::CryptoInit { reason: "peer key is not an uncompressed point" });
    }
    let x = BigUint::from_bytes_be(&bytes[1..25]);
    let y = BigUint::from_bytes_be(&bytes[25..49]);
    if !curve.on_curve(&x, &y) {
        return Err(Error::CryptoInit { reason: "peer key is not on secp192k1" });
    }
    Ok(Some((x, y)))
}

fn coordinate_bytes(value: &BigUint) -> [u8; 24] {
    let raw = value.to_bytes_be();
    let mut out = [0u8; 24];
    out[24 - raw.len()..].copy_from_slice(&raw);
    out
}

fn compress(point: &(BigUint, BigUint)) -> [u8; 25] {
    let mut out = [0u8; 25];
    out[0] = if point.1.bit(0) { 0x03 } else { 0x02 };
    out[1..].copy_from_slice(&coordinate_bytes(&point.0));
    out
}

/// Generate a fresh keypair and agree with the gateway key.
///
/// Returns the compressed 25-byte public point and the 16-byte session key
/// `md5(shared_x)`. The private scalar is not retained: key material lives
/// for one session and the agreement happens exactly once.
pub fn generate_keypair() -> Result<([u8; 25], [u8; 16])> {
    let mut secret = [0u8; 24];
    getrandom::getrandom(&mut secret).expect("getrandom failed");
    do_generate_keypair(&secret)
}

/// Deterministic twin of [`generate_keypair`] taking the private scalar.
pub fn do_generate_keypair(secret: &[u8; 24]) -> Result<([u8; 25], [u8; 16])> {
    let curve = curve();
    let d = BigUint::from_bytes_be(secret) % &curve.n;
    if d.is_zero() {
        return Err(Error::CryptoInit { reason: "degenerate private scalar" });
    }

    let public = curve
        .mul(&d, &Some(curve.g.clone()))
        .ok_or(Error::CryptoInit { reason: "keygen produced the identity" })?;

    let peer = parse_uncompressed(&curve, &SERVER_PUBLIC_KEY)?;
    let shared = curve
        .mul(&d, &peer)
        .ok_or(Error::CryptoInit { reason: "degenerate shared secret" })?;

    Ok((compress(&public), md5!(coordinate_bytes(&shared.0))))
}
