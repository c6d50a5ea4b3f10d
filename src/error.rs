use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum IntegrityError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// The stored private key could not be recovered. Distinct from "no key on file".
    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    /// Structurally invalid verification input. A signature that simply does
    /// not match is not an error.
    #[error("Malformed verification input: {0}")]
    Verification(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("A key pair already exists for identity {0}")]
    KeyPairExists(String),

    #[error("A signed document with digest {0} already exists")]
    DuplicateDigest(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    #[error("Document {id} is not in the {expected} state")]
    InvalidState { id: Uuid, expected: &'static str },
}

pub type Result<T> = std::result::Result<T, IntegrityError>;
