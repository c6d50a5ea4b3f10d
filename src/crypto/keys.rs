/// RSA key pair generation and PEM (de)serialization.
///
/// Private keys travel as PKCS#8 PEM, public keys as SubjectPublicKeyInfo
/// PEM. Both formats carry their own algorithm markers, so no extra
/// metadata is needed to parse them back.
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::crypto::sensitive::SensitiveString;
use crate::error::{IntegrityError, Result};

/// Modulus size for newly generated keys.
pub const RSA_KEY_BITS: usize = 2048;

/// A freshly generated key pair in its portable text form.
///
/// The private half only ever exists here transiently, before it is wrapped
/// by the vault.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub public_key: String,
    private_key: SensitiveString,
}

impl KeyPair {
    /// Generate a new RSA-2048 key pair (e = 65537) from the OS CSPRNG.
    pub fn generate() -> Result<Self> {
        let private = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
            .map_err(|e| IntegrityError::KeyGeneration(e.to_string()))?;
        let public = RsaPublicKey::from(&private);

        let mut private_pem = private
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| IntegrityError::KeyGeneration(format!("PKCS#8 encoding failed: {e}")))?;
        let public_key = public
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| IntegrityError::KeyGeneration(format!("SPKI encoding failed: {e}")))?;

        Ok(Self {
            public_key,
            private_key: SensitiveString::new(std::mem::take(&mut *private_pem)),
        })
    }

    pub fn private_key_pem(&self) -> &str {
        self.private_key.as_str()
    }
}

pub(crate) fn parse_private_key(pem: &str) -> std::result::Result<RsaPrivateKey, String> {
    RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| format!("invalid PKCS#8 private key: {e}"))
}

pub(crate) fn parse_public_key(pem: &str) -> std::result::Result<RsaPublicKey, String> {
    RsaPublicKey::from_public_key_pem(pem).map_err(|e| format!("invalid SPKI public key: {e}"))
}
