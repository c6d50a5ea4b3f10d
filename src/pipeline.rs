/// Document integrity pipeline.
///
/// Coordinates the document lifecycle against a store:
/// 1. Enroll an identity: generate a key pair, wrap the private half, store both
/// 2. Register an uploaded document (state `Uploaded`)
/// 3. Sign: hash the stamped bytes, unwrap the owner's key, sign the digest,
///    record everything in one store call (state `Signed`)
/// 4. Verify: re-hash candidate bytes, look up the exact digest, check the
///    stored signature against the owner's public key
///
/// A private key is unwrapped only for the duration of one signing call.
use std::io::Read;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::crypto::hash::{self, ContentDigest, DEFAULT_CHUNK_SIZE};
use crate::crypto::keys::KeyPair;
use crate::crypto::vault::PrivateKeyVault;
use crate::crypto::{sign, verify};
use crate::error::{IntegrityError, Result};
use crate::state::{
    Attestation, DocumentRecord, DocumentState, DocumentStore, KeyStore, SignedContent,
    UserKeyRecord,
};

/// Configuration for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Read size used when hashing document streams.
    pub hash_chunk_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            hash_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Result of signing a document.
#[derive(Debug, Clone)]
pub enum SignOutcome {
    /// Digest recorded together with a signature from the owner's key.
    Attested(DocumentRecord),
    /// Owner has no key pair; only the digest was recorded.
    Unattested(DocumentRecord),
}

impl SignOutcome {
    pub fn record(&self) -> &DocumentRecord {
        match self {
            Self::Attested(record) | Self::Unattested(record) => record,
        }
    }

    pub fn is_attested(&self) -> bool {
        matches!(self, Self::Attested(_))
    }
}

/// Result of verifying candidate bytes.
#[derive(Debug, Clone)]
pub enum VerifyOutcome {
    /// No signed document has this digest.
    NoRecord { digest: ContentDigest },
    /// Digest matches a document that was recorded without a signature.
    Unattested { record: DocumentRecord },
    /// Digest matches, but the owner's public key is no longer on file.
    SignerKeyMissing { record: DocumentRecord },
    Valid { record: DocumentRecord },
    /// Well-formed inputs, but the signature does not verify.
    SignatureMismatch { record: DocumentRecord },
    /// Stored signature or key could not be parsed.
    Malformed { record: DocumentRecord, reason: String },
}

impl VerifyOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    pub fn record(&self) -> Option<&DocumentRecord> {
        match self {
            Self::NoRecord { .. } => None,
            Self::Unattested { record }
            | Self::SignerKeyMissing { record }
            | Self::Valid { record }
            | Self::SignatureMismatch { record }
            | Self::Malformed { record, .. } => Some(record),
        }
    }
}

pub struct IntegrityPipeline<S> {
    store: S,
    vault: PrivateKeyVault,
    config: PipelineConfig,
}

impl<S: KeyStore + DocumentStore> IntegrityPipeline<S> {
    pub fn new(store: S, vault: PrivateKeyVault, config: PipelineConfig) -> Self {
        Self {
            store,
            vault,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Generate and store a key pair for `identity`.
    pub fn enroll(&self, identity: &str) -> Result<UserKeyRecord> {
        if self.store.key_pair(identity)?.is_some() {
            return Err(IntegrityError::KeyPairExists(identity.to_string()));
        }

        let pair = KeyPair::generate()?;
        let encrypted_private_key = self.vault.encrypt(pair.private_key_pem())?;
        let record = UserKeyRecord {
            identity: identity.to_string(),
            public_key: pair.public_key.clone(),
            encrypted_private_key,
            created_at: Utc::now(),
        };

        self.store.insert_key_pair(record.clone())?;
        info!(identity, "Enrolled signing key pair");
        Ok(record)
    }

    /// Register an uploaded document for `owner`.
    pub fn upload(&self, owner: &str, original_file: &str) -> Result<DocumentRecord> {
        let record = DocumentRecord::new(owner, original_file);
        self.store.insert_document(record.clone())?;
        info!(document_id = %record.id, owner, "Document uploaded");
        Ok(record)
    }

    /// Hash and sign the stamped bytes of an uploaded document.
    ///
    /// Nothing is recorded unless every step succeeds. An undecryptable key
    /// is an error, never a fallback to the unattested path.
    pub fn sign_document<R: Read + ?Sized>(
        &self,
        document_id: Uuid,
        signed_file: &str,
        reader: &mut R,
    ) -> Result<SignOutcome> {
        let document = self
            .store
            .document(document_id)?
            .ok_or(IntegrityError::DocumentNotFound(document_id))?;
        if !matches!(document.state, DocumentState::Uploaded) {
            return Err(IntegrityError::InvalidState {
                id: document_id,
                expected: "uploaded",
            });
        }

        let digest = hash::hash_reader_with_chunk_size(reader, self.config.hash_chunk_size)?;

        let attestation = match self.store.key_pair(&document.owner)? {
            Some(key_record) => {
                let private_key = self.vault.decrypt(&key_record.encrypted_private_key)?;
                let signature = sign::sign_digest(&digest, private_key.as_str())?;
                Attestation::Attested { signature }
            }
            None => {
                warn!(
                    document_id = %document_id,
                    owner = %document.owner,
                    "Owner has no key pair, recording digest without signature"
                );
                Attestation::Unattested
            }
        };

        let attested = matches!(attestation, Attestation::Attested { .. });
        let record = self.store.record_signature(
            document_id,
            SignedContent {
                digest,
                attestation,
                signed_file: signed_file.to_string(),
                signed_at: Utc::now(),
            },
        )?;

        info!(document_id = %document_id, digest = %digest, attested, "Document signed");
        Ok(if attested {
            SignOutcome::Attested(record)
        } else {
            SignOutcome::Unattested(record)
        })
    }

    /// Check whether candidate bytes match a signed, attested document.
    pub fn verify_document<R: Read + ?Sized>(&self, reader: &mut R) -> Result<VerifyOutcome> {
        let digest = hash::hash_reader_with_chunk_size(reader, self.config.hash_chunk_size)?;

        let Some(record) = self.store.find_by_digest(&digest)? else {
            info!(digest = %digest, "No document matches digest");
            return Ok(VerifyOutcome::NoRecord { digest });
        };

        let signature = match record.signed().map(|content| content.attestation.clone()) {
            Some(Attestation::Attested { signature }) => signature,
            Some(Attestation::Unattested) => return Ok(VerifyOutcome::Unattested { record }),
            // The store only indexes signed documents.
            None => {
                return Err(IntegrityError::Store(format!(
                    "digest index points at unsigned document {}",
                    record.id
                )))
            }
        };

        let Some(key_record) = self.store.key_pair(&record.owner)? else {
            warn!(document_id = %record.id, owner = %record.owner, "Signer public key missing");
            return Ok(VerifyOutcome::SignerKeyMissing { record });
        };

        let outcome = match verify::verify_digest(&digest, &signature, &key_record.public_key) {
            Ok(true) => VerifyOutcome::Valid { record },
            Ok(false) => VerifyOutcome::SignatureMismatch { record },
            Err(e) => {
                warn!(document_id = %record.id, error = %e, "Stored signature data is malformed");
                VerifyOutcome::Malformed {
                    record,
                    reason: e.to_string(),
                }
            }
        };

        info!(digest = %digest, valid = outcome.is_valid(), "Verification complete");
        Ok(outcome)
    }
}
