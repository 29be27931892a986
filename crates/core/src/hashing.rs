//! HMAC-SHA256 hex digests for signed download links.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute an HMAC-SHA256 hex digest of `data` keyed with `secret`.
pub fn hmac_sha256_hex(secret: &[u8], data: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(data);
    let tag = mac.finalize().into_bytes();
    format!("{tag:x}")
}
