//! MD5 digest helpers.

/// Calculate the MD5 digest of one or more byte slices concatenated.
#[macro_export]
macro_rules! md5 {
    ( $( $x:expr ),+ ) => {{
        use md5::{Digest, Md5};
        let mut h = Md5::new();
        $( h.update($x); )+
        let out: [u8; 16] = h.finalize().into();
        out
    }};
}

/// Render a 16-byte digest as 32 lowercase hex characters.
pub fn md5_hex(digest: &[u8; 16]) -> String {
    let mut out = String::with_capacity(32);
    for byte in digest {
        out.push(char::from_digit((byte >> 4) as u32, 16).unwrap_or('0'));
        out.push(char::from_digit((byte & 0x0F) as u32, 16).unwrap_or('0'));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_answer() {
        let digest = md5!(b"test");
        assert_eq!(md5_hex(&digest), "098f6bcd4621d373cade4e832627b4f6");
    }

    #[test]
    fn concatenation_matches_single_buffer() {
        assert_eq!(md5!(b"ab", b"cd"), md5!(b"abcd"));
    }
}
