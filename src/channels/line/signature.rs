//! `x-line-signature` verification
//!
//! LINE signs each delivery with base64(HMAC-SHA256(channel secret, body)).

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Check `signature` against the raw request body in constant time
///
/// # Errors
///
/// Returns `Error::Signature` if the signature is not valid base64 or does
/// not match
pub fn verify(channel_secret: &str, body: &[u8], signature: &str) -> Result<()> {
    let expected = STANDARD
        .decode(signature.trim())
        .map_err(|_| Error::Signature)?;

    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes()).map_err(|_| Error::Signature)?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| Error::Signature)
}

/// Signature LINE would send for `body`
///
/// # Errors
///
/// Returns `Error::Signature` if the secret cannot key the MAC
pub fn sign(channel_secret: &str, body: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes()).map_err(|_| Error::Signature)?;
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
