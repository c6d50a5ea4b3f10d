/// Verification of RSA-PSS signatures over content digests.
///
/// `Ok(false)` means the inputs were well formed but the signature does not
/// match. `Err(Verification)` means an input could not even be parsed.
/// Neither case is ever treated as valid.
use rsa::traits::PublicKeyParts;
use tracing::warn;

use crate::crypto::hash::ContentDigest;
use crate::crypto::keys::parse_public_key;
use crate::crypto::sign::{message_hash, pss_padding, Signature};
use crate::error::{IntegrityError, Result};

pub fn verify_digest(
    digest: &ContentDigest,
    signature: &Signature,
    public_key_pem: &str,
) -> Result<bool> {
    let public_key = parse_public_key(public_key_pem).map_err(IntegrityError::Verification)?;

    let raw = signature
        .decode()
        .map_err(|e| IntegrityError::Verification(format!("signature is not base64: {e}")))?;
    if raw.len() != public_key.size() {
        return Err(IntegrityError::Verification(format!(
            "signature is {} bytes, key modulus is {} bytes",
            raw.len(),
            public_key.size()
        )));
    }

    let modulus_bits = public_key.n().bits();
    let padding = pss_padding(modulus_bits).ok_or_else(|| {
        IntegrityError::Verification(format!("{modulus_bits}-bit key is too small for PSS"))
    })?;

    Ok(public_key.verify(padding, &message_hash(digest), &raw).is_ok())
}

/// Verify using digest and signature text as stored by the persistence layer.
pub fn verify_hex_digest(digest_hex: &str, signature: &str, public_key_pem: &str) -> Result<bool> {
    let digest = ContentDigest::from_hex(digest_hex)
        .map_err(|e| IntegrityError::Verification(format!("malformed digest: {e}")))?;
    verify_digest(&digest, &Signature::from_stored(signature), public_key_pem)
}

/// Collapse malformed input and mismatch into `false`, logging the former.
pub fn is_valid(digest: &ContentDigest, signature: &Signature, public_key_pem: &str) -> bool {
    match verify_digest(digest, signature, public_key_pem) {
        Ok(valid) => valid,
        Err(e) => {
            warn!(digest = %digest, error = %e, "Rejecting structurally invalid signature input");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    use super::*;
    use crate::crypto::hash::hash_bytes;
    use crate::crypto::keys::test_keys::{alice, bob};
    use crate::crypto::sign::sign_digest;

    #[test]
    fn test_sign_verify_roundtrip() {
        let digest = hash_bytes(b"contract v1");
        let signature = sign_digest(&digest, alice().private_key_pem()).unwrap();
        assert!(verify_digest(&digest, &signature, &alice().public_key).unwrap());
    }

    #[test]
    fn test_two_signatures_both_verify() {
        let digest = hash_bytes(b"contract v1");
        let s1 = sign_digest(&digest, alice().private_key_pem()).unwrap();
        let s2 = sign_digest(&digest, alice().private_key_pem()).unwrap();
        assert_ne!(s1, s2);
        assert!(verify_digest(&digest, &s1, &alice().public_key).unwrap());
        assert!(verify_digest(&digest, &s2, &alice().public_key).unwrap());
    }

    #[test]
    fn test_wrong_digest_is_false() {
        let signature = sign_digest(&hash_bytes(b"contract v1"), alice().private_key_pem()).unwrap();
        let other = hash_bytes(b"contract v2");
        assert!(!verify_digest(&other, &signature, &alice().public_key).unwrap());
    }

    #[test]
    fn test_wrong_public_key_is_false() {
        let digest = hash_bytes(b"contract v1");
        let signature = sign_digest(&digest, alice().private_key_pem()).unwrap();
        assert!(!verify_digest(&digest, &signature, &bob().public_key).unwrap());
    }

    #[test]
    fn test_tampered_signature_is_false() {
        let digest = hash_bytes(b"contract v1");
        let signature = sign_digest(&digest, alice().private_key_pem()).unwrap();
        let mut raw = signature.decode().unwrap();
        raw[100] ^= 0x80;
        let tampered = Signature::from_raw(&raw);
        assert!(!verify_digest(&digest, &tampered, &alice().public_key).unwrap());
    }

    #[test]
    fn test_malformed_inputs_are_errors() {
        let digest = hash_bytes(b"contract v1");
        let signature = sign_digest(&digest, alice().private_key_pem()).unwrap();

        let bad_key = verify_digest(&digest, &signature, "garbage");
        assert!(matches!(bad_key, Err(IntegrityError::Verification(_))));

        let not_base64 = verify_digest(&digest, &Signature::from_stored("***"), &alice().public_key);
        assert!(matches!(not_base64, Err(IntegrityError::Verification(_))));

        let short = Signature::from_stored(STANDARD.encode([0u8; 16]));
        let wrong_len = verify_digest(&digest, &short, &alice().public_key);
        assert!(matches!(wrong_len, Err(IntegrityError::Verification(_))));

        let bad_digest = verify_hex_digest("xyz", signature.as_str(), &alice().public_key);
        assert!(matches!(bad_digest, Err(IntegrityError::Verification(_))));
    }

    #[test]
    fn test_hex_entry_point() {
        let digest = hash_bytes(b"contract v1");
        let signature = sign_digest(&digest, alice().private_key_pem()).unwrap();
        assert!(verify_hex_digest(&digest.to_hex(), signature.as_str(), &alice().public_key).unwrap());
    }

    #[test]
    fn test_is_valid_fails_closed() {
        let digest = hash_bytes(b"contract v1");
        let signature = sign_digest(&digest, alice().private_key_pem()).unwrap();
        assert!(is_valid(&digest, &signature, &alice().public_key));
        assert!(!is_valid(&digest, &signature, "garbage"));
        assert!(!is_valid(&digest, &Signature::from_stored(""), &alice().public_key));
        assert!(!is_valid(&hash_bytes(b"other"), &signature, &alice().public_key));
    }

    /// Stored record from an existing deployment: SPKI key, hex digest and
    /// base64 signature exactly as the previous signer wrote them.
    const DEPLOYED_PUBLIC_KEY: &str = "\
-----BEGIN PUBLIC KEY-----
MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEA4cUVrPK0X+azb+lprEIK
g7/yNV/WfVIPtCngIEu9v6/8OAL6br+DxR7ydxFdWcN0fgxVZIoHbSEVMJwJdgYY
B8vQz0uhUqjLRbAR12d0o9M1l1/K7eSMs/AlXC3ssS0PHiHqmik4JP62ly64MG8s
rz9Dfmp6rsvuDoY51kpwzbCeisb+N2ATJdnrDJScKlzyETb5wFoHKVgGI3/1jaCE
5ZQnlNva6jKLMRVeyXi1l7RZ3MCUirTF6UewNxx6zoz1DRoZlY9LXJMz/OOOffLn
H8Gk/hDoOmQdWq58cBh520OJtQT9HK1bpWhp6TKq5m32MMu1r6cClGL0mryVTwA+
jwIDAQAB
-----END PUBLIC KEY-----
";
    const DEPLOYED_CONTENT: &[u8] = b"signed contract, page 3 stamped\n";
    const DEPLOYED_DIGEST: &str = "061325bbc399b111a84999b6a2093c5851168215c18dfaa7522d5078bbe81546";
    const DEPLOYED_SIGNATURE: &str = "RSO/NtXQn0nLHMW1raVRPcQ+5qi8e3jQniyI9RJEuyjd15T+XpmOZ6KZGRmks7c35Z6VX2cMj9u6BDSZRz34YrJthw5INc7f1YVzfdngfocelgoVCC1XBwY+5lrGVV1Ei2ffQkad/XIem8Tg65aHdSYWAke8PispMGIqQp/Oz3sxe2jrKK4HXeEPGGgnWku8BIk5MukbzPkqhW4HqVvcGvNuArPE3QM0j50Gr5RUZO+rxRQsh5rKgHwD7mauOFpHfZNqlM3mDbjPz+YjH4GVgRlH5NoubGMwLlXM9PZdlY1m0w1q7TjX4GSZDjOEhY+PGiucbHRPfoMXqZQFoCKF/A==";

    #[test]
    fn test_verifies_signature_from_deployed_signer() {
        assert_eq!(hash_bytes(DEPLOYED_CONTENT).to_hex(), DEPLOYED_DIGEST);
        assert!(verify_hex_digest(DEPLOYED_DIGEST, DEPLOYED_SIGNATURE, DEPLOYED_PUBLIC_KEY).unwrap());
        assert!(!verify_hex_digest(
            &hash_bytes(b"signed contract, page 3 stamped").to_hex(),
            DEPLOYED_SIGNATURE,
            DEPLOYED_PUBLIC_KEY
        )
        .unwrap());
    }

    #[test]
    fn test_signature_does_not_cover_bare_digest_bytes() {
        let digest = hash_bytes(b"contract v1");
        let signature = sign_digest(&digest, alice().private_key_pem()).unwrap();
        let public_key = parse_public_key(&alice().public_key).unwrap();
        let padding = pss_padding(public_key.n().bits()).unwrap();
        let raw = signature.decode().unwrap();
        assert!(public_key.verify(padding, digest.as_bytes(), &raw).is_err());
    }
}
