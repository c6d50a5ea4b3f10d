/// In-process store with optional JSON snapshot persistence.
///
/// Used by the CLI and the tests. All tables live behind one `RwLock`, so
/// `record_signature` checks and writes under a single write guard.
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::models::{DocumentRecord, DocumentState, SignedContent, UserKeyRecord};
use super::{DocumentStore, KeyStore};
use crate::crypto::ContentDigest;
use crate::error::{IntegrityError, Result};

#[derive(Default)]
struct Tables {
    key_pairs: HashMap<String, UserKeyRecord>,
    documents: HashMap<Uuid, DocumentRecord>,
    by_digest: HashMap<ContentDigest, Uuid>,
}

/// On-disk form. The digest index is rebuilt on load.
#[derive(Serialize, Deserialize, Default)]
struct Snapshot {
    key_pairs: Vec<UserKeyRecord>,
    documents: Vec<DocumentRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot written by [`MemoryStore::save_snapshot`]. A missing file is an empty store.
    pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No snapshot yet, starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot: Snapshot = serde_json::from_str(&content)?;
        let mut tables = Tables::default();

        for record in snapshot.key_pairs {
            if tables.key_pairs.contains_key(&record.identity) {
                return Err(IntegrityError::KeyPairExists(record.identity));
            }
            tables.key_pairs.insert(record.identity.clone(), record);
        }
        for record in snapshot.documents {
            if let Some(digest) = record.digest() {
                if tables.by_digest.insert(*digest, record.id).is_some() {
                    return Err(IntegrityError::DuplicateDigest(digest.to_hex()));
                }
            }
            tables.documents.insert(record.id, record);
        }

        info!(
            path = %path.display(),
            key_pairs = tables.key_pairs.len(),
            documents = tables.documents.len(),
            "Loaded store snapshot"
        );
        Ok(Self {
            tables: RwLock::new(tables),
        })
    }

    /// Write all records as JSON, replacing the file via rename.
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let snapshot = {
            let tables = self.read()?;
            let mut documents: Vec<_> = tables.documents.values().cloned().collect();
            documents.sort_by_key(|d| d.id);
            let mut key_pairs: Vec<_> = tables.key_pairs.values().cloned().collect();
            key_pairs.sort_by(|a, b| a.identity.cmp(&b.identity));
            Snapshot {
                key_pairs,
                documents,
            }
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "Saved store snapshot");
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| IntegrityError::Store("store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| IntegrityError::Store("store lock poisoned".into()))
    }
}

impl KeyStore for MemoryStore {
    fn insert_key_pair(&self, record: UserKeyRecord) -> Result<()> {
        let mut tables = self.write()?;
        if tables.key_pairs.contains_key(&record.identity) {
            return Err(IntegrityError::KeyPairExists(record.identity));
        }
        tables.key_pairs.insert(record.identity.clone(), record);
        Ok(())
    }

    fn key_pair(&self, identity: &str) -> Result<Option<UserKeyRecord>> {
        Ok(self.read()?.key_pairs.get(identity).cloned())
    }
}

impl DocumentStore for MemoryStore {
    fn insert_document(&self, record: DocumentRecord) -> Result<()> {
        if !matches!(record.state, DocumentState::Uploaded) {
            return Err(IntegrityError::InvalidState {
                id: record.id,
                expected: "uploaded",
            });
        }
        let mut tables = self.write()?;
        if tables.documents.contains_key(&record.id) {
            return Err(IntegrityError::Store(format!("document {} already exists", record.id)));
        }
        tables.documents.insert(record.id, record);
        Ok(())
    }

    fn document(&self, id: Uuid) -> Result<Option<DocumentRecord>> {
        Ok(self.read()?.documents.get(&id).cloned())
    }

    fn record_signature(&self, id: Uuid, content: SignedContent) -> Result<DocumentRecord> {
        let mut tables = self.write()?;

        if let Some(existing) = tables.by_digest.get(&content.digest) {
            if *existing != id {
                return Err(IntegrityError::DuplicateDigest(content.digest.to_hex()));
            }
        }

        let digest = content.digest;
        let record = tables
            .documents
            .get_mut(&id)
            .ok_or(IntegrityError::DocumentNotFound(id))?;
        if !matches!(record.state, DocumentState::Uploaded) {
            return Err(IntegrityError::InvalidState {
                id,
                expected: "uploaded",
            });
        }
        record.state = DocumentState::Signed(content);
        let updated = record.clone();

        tables.by_digest.insert(digest, id);
        Ok(updated)
    }

    fn find_by_digest(&self, digest: &ContentDigest) -> Result<Option<DocumentRecord>> {
        let tables = self.read()?;
        Ok(tables
            .by_digest
            .get(digest)
            .and_then(|id| tables.documents.get(id))
            .cloned())
    }
}
