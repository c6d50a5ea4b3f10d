/// RSA-PSS signatures over SHA-256 content digests.
///
/// The 32 digest bytes are the signed message, so PSS hashes them once more
/// with SHA-256 before encoding. Stored signatures depend on this: a
/// signature over the bare digest bytes does not verify. Salt length is the
/// maximum the modulus allows, and the verifier expects exactly that length.
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::Pss;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::crypto::hash::{ContentDigest, DIGEST_LEN};
use crate::crypto::keys::parse_private_key;
use crate::error::{IntegrityError, Result};

/// Standard base64 text of a raw RSA-PSS signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    pub fn from_raw(bytes: &[u8]) -> Self {
        Self(STANDARD.encode(bytes))
    }

    /// Wrap text loaded from storage. Validation happens on verify.
    pub fn from_stored(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn decode(&self) -> std::result::Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.0)
    }
}

/// Largest PSS salt for a modulus of `modulus_bits` with a SHA-256 digest.
///
/// Returns `None` when the modulus is too small to hold any PSS encoding.
pub(crate) fn max_salt_len(modulus_bits: usize) -> Option<usize> {
    let em_len = modulus_bits.saturating_sub(1).div_ceil(8);
    em_len.checked_sub(DIGEST_LEN + 2)
}

/// The hash PSS encodes for a content digest: SHA-256 over the 32 digest bytes.
pub(crate) fn message_hash(digest: &ContentDigest) -> [u8; DIGEST_LEN] {
    Sha256::digest(digest.as_bytes()).into()
}

pub(crate) fn pss_padding(modulus_bits: usize) -> Option<Pss> {
    max_salt_len(modulus_bits).map(Pss::new_with_salt::<Sha256>)
}

/// Sign a content digest with a PKCS#8 PEM private key.
pub fn sign_digest(digest: &ContentDigest, private_key_pem: &str) -> Result<Signature> {
    let private_key = parse_private_key(private_key_pem).map_err(IntegrityError::Signing)?;

    let modulus_bits = private_key.n().bits();
    let padding = pss_padding(modulus_bits).ok_or_else(|| {
        IntegrityError::Signing(format!("{modulus_bits}-bit key is too small for PSS"))
    })?;

    let raw = private_key
        .sign_with_rng(&mut OsRng, padding, &message_hash(digest))
        .map_err(|e| IntegrityError::Signing(e.to_string()))?;

    debug!(digest = %digest, modulus_bits, "Signed content digest");
    Ok(Signature::from_raw(&raw))
}

/// Sign digest text as stored by the persistence layer.
pub fn sign_hex_digest(digest_hex: &str, private_key_pem: &str) -> Result<Signature> {
    let digest = ContentDigest::from_hex(digest_hex)
        .map_err(|e| IntegrityError::Signing(format!("malformed digest: {e}")))?;
    sign_digest(&digest, private_key_pem)
}
