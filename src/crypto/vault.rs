/// Envelope encryption of serialized private keys under the process KEK.
///
/// Token layout before encoding is
/// `[version(1B) | nonce(24B) | XChaCha20-Poly1305 ciphertext_with_tag]`,
/// carried as URL-safe base64 text so it fits in a text column. Each token
/// gets a fresh random nonce and the same associated-data label.
use std::fmt;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroize;

use crate::crypto::kdf::Kek;
use crate::crypto::sensitive::SensitiveString;
use crate::error::{IntegrityError, Result};

pub const TOKEN_VERSION: u8 = 0x01;

const NONCE_LEN: usize = 24;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = 1 + NONCE_LEN;

/// Associated data bound into every wrapped key.
const PRIVATE_KEY_AAD: &[u8] = b"docseal:private-key:v1";

/// A wrapped private key as stored by the persistence layer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedPrivateKey(String);

impl EncryptedPrivateKey {
    /// Wrap text loaded from storage. Validation happens on decrypt.
    pub fn from_stored(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EncryptedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptedPrivateKey({} chars)", self.0.len())
    }
}

/// Encrypts private keys for storage and decrypts them for a single signing operation.
///
/// Holds nothing but the injected KEK, so it can be shared across threads.
#[derive(Clone, Debug)]
pub struct PrivateKeyVault {
    kek: Kek,
}

impl PrivateKeyVault {
    pub fn new(kek: Kek) -> Self {
        Self { kek }
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(self.kek.key().as_bytes().into())
    }

    pub fn encrypt(&self, private_key_pem: &str) -> Result<EncryptedPrivateKey> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let payload = Payload {
            msg: private_key_pem.as_bytes(),
            aad: PRIVATE_KEY_AAD,
        };
        let ciphertext = self
            .cipher()
            .encrypt(XNonce::from_slice(&nonce), payload)
            .map_err(|e| IntegrityError::Encryption(e.to_string()))?;

        let mut token = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        token.push(TOKEN_VERSION);
        token.extend_from_slice(&nonce);
        token.extend_from_slice(&ciphertext);

        debug!(bytes = token.len(), "Wrapped private key");
        Ok(EncryptedPrivateKey(URL_SAFE.encode(token)))
    }

    /// Recover the PEM. Any failure yields no plaintext at all.
    pub fn decrypt(&self, encrypted: &EncryptedPrivateKey) -> Result<SensitiveString> {
        let token = URL_SAFE
            .decode(encrypted.as_str())
            .map_err(|e| IntegrityError::Decryption(format!("malformed token encoding: {e}")))?;

        if token.len() < HEADER_LEN + TAG_LEN {
            return Err(IntegrityError::Decryption(format!(
                "token too short: {} bytes (minimum {})",
                token.len(),
                HEADER_LEN + TAG_LEN
            )));
        }

        let version = token[0];
        if version != TOKEN_VERSION {
            return Err(IntegrityError::Decryption(format!(
                "unsupported token version: {version}"
            )));
        }

        let payload = Payload {
            msg: &token[HEADER_LEN..],
            aad: PRIVATE_KEY_AAD,
        };
        // A wrong KEK and a tampered token look the same here.
        let plaintext = self
            .cipher()
            .decrypt(XNonce::from_slice(&token[1..HEADER_LEN]), payload)
            .map_err(|_| IntegrityError::Decryption("authentication failed".into()))?;

        let pem = String::from_utf8(plaintext).map_err(|e| {
            let mut bytes = e.into_bytes();
            bytes.zeroize();
            IntegrityError::Decryption("decrypted key is not UTF-8".into())
        })?;

        Ok(SensitiveString::new(pem))
    }
}
