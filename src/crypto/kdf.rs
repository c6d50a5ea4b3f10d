/// Derivation of the process-wide key-encryption key (KEK) from the server secret.
///
/// The KEK is a pure function of the secret: the same secret always yields
/// the same KEK, and there is no salt or rotation path. Changing the secret
/// makes every previously wrapped private key undecryptable.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::sensitive::SensitiveBytes32;
use crate::error::{IntegrityError, Result};

/// Context string for BLAKE3's key-derivation mode. Must never change.
const BLAKE3_KEK_CONTEXT: &str = "docseal 2024-01-01 private-key vault KEK v1";

/// How the KEK is derived from the server secret.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum KekDerivation {
    /// SHA-256 of the secret.
    ///
    /// Same key bytes as the earlier Fernet-based service, but its Fernet
    /// tokens are not readable by this vault; those keys must be re-enrolled.
    #[default]
    Sha256,
    /// BLAKE3 derive-key mode with a fixed context string.
    Blake3,
}

/// The key-encryption key. Immutable once derived.
#[derive(Clone, Debug)]
pub struct Kek {
    key: SensitiveBytes32,
    derivation: KekDerivation,
}

impl Kek {
    pub fn derive(server_secret: &[u8], derivation: KekDerivation) -> Result<Self> {
        if server_secret.is_empty() {
            return Err(IntegrityError::Config(
                "server secret must not be empty".into(),
            ));
        }

        let key: [u8; 32] = match derivation {
            KekDerivation::Sha256 => Sha256::digest(server_secret).into(),
            KekDerivation::Blake3 => blake3_derive(server_secret),
        };

        Ok(Self {
            key: SensitiveBytes32::new(key),
            derivation,
        })
    }

    pub(crate) fn key(&self) -> &SensitiveBytes32 {
        &self.key
    }

    pub fn derivation(&self) -> KekDerivation {
        self.derivation
    }
}

fn blake3_derive(ikm: &[u8]) -> [u8; 32] {
    let mut output = [0u8; 32];
    let mut deriver = blake3::Hasher::new_derive_key(BLAKE3_KEK_CONTEXT);
    deriver.update(ikm);
    let mut reader = deriver.finalize_xof();
    reader.fill(&mut output);
    output
}
