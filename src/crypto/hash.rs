/// SHA-256 content digests for documents.
///
/// The digest is both an integrity fingerprint and the value that gets
/// signed, so it must use the same hash function as the PSS signer.
use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::error::Result;

/// Raw SHA-256 output length in bytes.
pub const DIGEST_LEN: usize = 32;

/// Length of the hex text form.
pub const DIGEST_HEX_LEN: usize = DIGEST_LEN * 2;

/// Default read size for streaming hashing.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Upper bound on the read buffer. Larger requests are clamped.
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

#[derive(Error, Debug, PartialEq)]
pub enum DigestFormatError {
    #[error("expected 64 hex characters, got {0}")]
    Length(usize),

    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// SHA-256 digest of some byte content. Its text form is lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest([u8; DIGEST_LEN]);

impl ContentDigest {
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse stored digest text. Uppercase input is accepted.
    pub fn from_hex(s: &str) -> std::result::Result<Self, DigestFormatError> {
        if s.len() != DIGEST_HEX_LEN {
            return Err(DigestFormatError::Length(s.len()));
        }
        let mut bytes = [0u8; DIGEST_LEN];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// The raw digest bytes, which is what gets signed.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = DigestFormatError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<ContentDigest> for String {
    fn from(digest: ContentDigest) -> Self {
        digest.to_hex()
    }
}

/// Hash an in-memory buffer.
pub fn hash_bytes(data: &[u8]) -> ContentDigest {
    ContentDigest::from_bytes(Sha256::digest(data).into())
}

/// Hash a file on disk without loading it fully into memory.
pub fn hash_file<P: AsRef<Path>>(path: P) -> Result<ContentDigest> {
    let mut file = File::open(path)?;
    hash_reader(&mut file)
}

/// Hash any reader, start to end, using [`DEFAULT_CHUNK_SIZE`] reads.
pub fn hash_reader<R: Read + ?Sized>(reader: &mut R) -> Result<ContentDigest> {
    hash_reader_with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
}

/// Hash any reader with an explicit read size, clamped to `1..=MAX_CHUNK_SIZE`.
/// The digest does not depend on it.
pub fn hash_reader_with_chunk_size<R: Read + ?Sized>(
    reader: &mut R,
    chunk_size: usize,
) -> Result<ContentDigest> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; chunk_size.clamp(1, MAX_CHUNK_SIZE)];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(ContentDigest::from_bytes(hasher.finalize().into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Cursor;

    use crate::error::IntegrityError;

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::BrokenPipe, "source gone"))
        }
    }

    #[test]
    fn test_known_vector() {
        assert_eq!(
            hash_bytes(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            hash_bytes(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hash_deterministic() {
        let data = b"hello docseal";
        assert_eq!(hash_bytes(data), hash_bytes(data));
    }

    #[test]
    fn test_chunk_size_does_not_change_digest() {
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        let expected = hash_bytes(&data);

        for chunk_size in [1, 7, 4096, DEFAULT_CHUNK_SIZE, 1 << 20] {
            let digest = hash_reader_with_chunk_size(&mut Cursor::new(&data), chunk_size).unwrap();
            assert_eq!(digest, expected, "chunk size {chunk_size}");
        }
    }

    #[test]
    fn test_oversized_chunk_is_clamped() {
        let digest = hash_reader_with_chunk_size(&mut Cursor::new(b"abc"), usize::MAX).unwrap();
        assert_eq!(digest, hash_bytes(b"abc"));
    }

    #[test]
    fn test_single_byte_difference() {
        let mut data = vec![0u8; 1024];
        let original = hash_bytes(&data);
        data[512] ^= 0x01;
        assert_ne!(hash_bytes(&data), original);
    }

    #[test]
    fn test_no_collisions_across_corpus() {
        let mut seen = HashSet::new();
        for i in 0..2_000u32 {
            let fixture = format!("fixture-{i}").into_bytes();
            assert!(seen.insert(hash_bytes(&fixture)), "collision at fixture {i}");
        }
        // Prefixes of one buffer are distinct inputs too.
        let buffer = vec![0x5Au8; 512];
        for len in 0..=buffer.len() {
            assert!(seen.insert(hash_bytes(&buffer[..len])), "collision at prefix {len}");
        }
    }

    #[test]
    fn test_read_failure_is_io_error() {
        let result = hash_reader(&mut FailingReader);
        assert!(matches!(result, Err(IntegrityError::Io(_))));
    }

    #[test]
    fn test_hash_file_matches_bytes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"file contents").unwrap();
        assert_eq!(hash_file(file.path()).unwrap(), hash_bytes(b"file contents"));
    }

    #[test]
    fn test_from_hex_normalizes_and_validates() {
        let digest = hash_bytes(b"abc");
        let upper = digest.to_hex().to_uppercase();
        assert_eq!(ContentDigest::from_hex(&upper).unwrap(), digest);

        assert_eq!(
            ContentDigest::from_hex("abcd"),
            Err(DigestFormatError::Length(4))
        );
        let not_hex = "z".repeat(DIGEST_HEX_LEN);
        assert!(matches!(
            ContentDigest::from_hex(&not_hex),
            Err(DigestFormatError::Hex(_))
        ));
    }

    #[test]
    fn test_text_form_is_lowercase_hex() {
        let digest = hash_bytes(b"abc");
        let text = digest.to_string();
        assert_eq!(text.len(), DIGEST_HEX_LEN);
        assert!(text.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_eq!(hex::encode(digest.as_bytes()), text);
    }

    #[test]
    fn test_serde_rejects_bad_digest() {
        let json = serde_json::to_string(&hash_bytes(b"x")).unwrap();
        let back: ContentDigest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash_bytes(b"x"));
        assert!(serde_json::from_str::<ContentDigest>("\"nothex\"").is_err());
    }
}
