/// Cryptographic building blocks: content hashing, RSA key pairs,
/// the private-key vault, and PSS signing/verification.
pub mod hash;
pub mod kdf;
pub mod keys;
pub mod sensitive;
pub mod sign;
pub mod vault;
pub mod verify;

pub use hash::{hash_bytes, hash_file, hash_reader, ContentDigest};
pub use kdf::{Kek, KekDerivation};
pub use keys::KeyPair;
pub use sensitive::SensitiveString;
pub use sign::{sign_digest, sign_hex_digest, Signature};
pub use vault::{EncryptedPrivateKey, PrivateKeyVault};
pub use verify::{is_valid, verify_digest, verify_hex_digest};
