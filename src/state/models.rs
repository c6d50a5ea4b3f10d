/// Records exchanged with the persistence layer.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{ContentDigest, EncryptedPrivateKey, Signature};

/// An identity's key pair as stored: public key in clear, private key wrapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserKeyRecord {
    pub identity: String,
    /// SPKI PEM.
    pub public_key: String,
    pub encrypted_private_key: EncryptedPrivateKey,
    pub created_at: DateTime<Utc>,
}

/// Whether a signed document carries a cryptographic signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attestation {
    /// Owner had no key pair at signing time; only the digest was recorded.
    Unattested,
    Attested { signature: Signature },
}

/// Everything recorded when a document moves to the signed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedContent {
    pub digest: ContentDigest,
    pub attestation: Attestation,
    /// Reference to the stamped file whose bytes were hashed.
    pub signed_file: String,
    pub signed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentState {
    Uploaded,
    Signed(SignedContent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    /// Identity of the uploader, whose key signs the document.
    pub owner: String,
    pub original_file: String,
    pub state: DocumentState,
    pub created_at: DateTime<Utc>,
}

impl DocumentRecord {
    pub fn new(owner: impl Into<String>, original_file: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            owner: owner.into(),
            original_file: original_file.into(),
            state: DocumentState::Uploaded,
            created_at: Utc::now(),
        }
    }

    pub fn signed(&self) -> Option<&SignedContent> {
        match &self.state {
            DocumentState::Signed(content) => Some(content),
            DocumentState::Uploaded => None,
        }
    }

    pub fn digest(&self) -> Option<&ContentDigest> {
        self.signed().map(|content| &content.digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash_bytes;

    #[test]
    fn test_new_document_is_uploaded() {
        let doc = DocumentRecord::new("alice", "uploads/contract.pdf");
        assert_eq!(doc.state, DocumentState::Uploaded);
        assert!(doc.digest().is_none());
    }

    #[test]
    fn test_signed_document_json_shape() {
        let mut doc = DocumentRecord::new("alice", "uploads/contract.pdf");
        doc.state = DocumentState::Signed(SignedContent {
            digest: hash_bytes(b"stamped"),
            attestation: Attestation::Attested {
                signature: Signature::from_stored("c2ln"),
            },
            signed_file: "signed/contract.pdf".into(),
            signed_at: Utc::now(),
        });

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["state"]["status"], "signed");
        assert_eq!(json["state"]["attestation"]["kind"], "attested");
        assert_eq!(json["state"]["digest"], hash_bytes(b"stamped").to_hex());

        let back: DocumentRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, doc);
    }
}
