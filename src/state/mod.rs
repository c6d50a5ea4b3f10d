/// Persistence seam for the integrity pipeline.
///
/// The core only computes values; the store owns uniqueness:
/// - one key pair per identity
/// - one signed document per content digest
pub mod memory;
pub mod models;

use uuid::Uuid;

use crate::crypto::ContentDigest;
use crate::error::Result;

pub use memory::MemoryStore;
pub use models::{Attestation, DocumentRecord, DocumentState, SignedContent, UserKeyRecord};

pub trait KeyStore: Send + Sync {
    /// Insert a new key pair. Fails with `KeyPairExists` if the identity already has one.
    fn insert_key_pair(&self, record: UserKeyRecord) -> Result<()>;

    fn key_pair(&self, identity: &str) -> Result<Option<UserKeyRecord>>;
}

pub trait DocumentStore: Send + Sync {
    fn insert_document(&self, record: DocumentRecord) -> Result<()>;

    fn document(&self, id: Uuid) -> Result<Option<DocumentRecord>>;

    /// Move a document from `Uploaded` to `Signed` in one step.
    ///
    /// Fails with `DocumentNotFound`, `InvalidState` when the document is
    /// already signed, or `DuplicateDigest` when another signed document
    /// has the same digest. Nothing is written on failure.
    fn record_signature(&self, id: Uuid, content: SignedContent) -> Result<DocumentRecord>;

    /// Exact-match lookup of a signed document by digest.
    fn find_by_digest(&self, digest: &ContentDigest) -> Result<Option<DocumentRecord>>;
}
