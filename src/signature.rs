//! HMAC-SHA256 webhook signature verification.
//!
//! LINE signs every delivery with the channel secret over the raw request body and sends the
//! base64 encoded digest in the `x-line-signature` header.

use base64::engine::general_purpose;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Sign a payload and return the base64 encoded digest, as LINE would send it.
#[cfg(test)]
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac = new_mac(secret);
    mac.update(payload);
    general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

/// Returns true only if `signature` is the base64 HMAC-SHA256 of the exact `payload` bytes.
/// An absent, empty or undecodable header is rejected. The digest comparison is constant time.
pub fn verify(payload: &[u8], signature: Option<&str>, secret: &str) -> bool {
    let signature = match signature.map(str::trim) {
        Some(signature) if !signature.is_empty() => signature,
        _ => return false,
    };

    let expected = match general_purpose::STANDARD.decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = new_mac(secret);
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

fn new_mac(secret: &str) -> HmacSha256 {
    <HmacSha256 as Mac>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_channel_secret";
    const BODY: &[u8] = br#"{"destination":"U1","events":[]}"#;

    #[test]
    fn test_sign_and_verify() {
        let signature = sign_payload(SECRET, BODY);
        assert!(verify(BODY, Some(&signature), SECRET));
        assert!(!verify(BODY, Some(&signature), "wrong_secret"));
        assert!(!verify(b"{\"events\":[]}", Some(&signature), SECRET));
    }

    #[test]
    fn test_known_digest() {
        // echo -n 'hello world' | openssl dgst -sha256 -hmac key -binary | base64
        let signature = sign_payload("key", b"hello world");
        assert_eq!(signature, "C6BvH5pjAEYeQ0VFNdw8QiPkex01cHPXU26ukOwJW+E=");
    }

    #[test]
    fn test_missing_or_empty_header_fails_closed() {
        assert!(!verify(BODY, None, SECRET));
        assert!(!verify(BODY, Some(""), SECRET));
        assert!(!verify(BODY, Some("   "), SECRET));
    }

    #[test]
    fn test_malformed_header() {
        assert!(!verify(BODY, Some("not base64 !!"), SECRET));

        // Valid base64 of the wrong length.
        assert!(!verify(BODY, Some("c2hvcnQ="), SECRET));
    }

    #[test]
    fn test_body_is_verified_byte_for_byte() {
        let signature = sign_payload(SECRET, BODY);
        let mut reformatted = BODY.to_vec();
        reformatted.push(b'\n');
        assert!(!verify(&reformatted, Some(&signature), SECRET));
    }
}
