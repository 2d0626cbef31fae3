//! Ed25519 signing over canonical payloads.
//!
//! Signatures are a function purely of the canonical serialization of the
//! payload and the signing key; wall-clock time never enters the message.

use crate::canonical::canonical_string;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Marks secret material that must decode to well-formed Ed25519 key bytes.
pub const SECRET_PREFIX: &str = "ed25519:";

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("signing secret is empty")]
    EmptySecret,

    #[error("signing secret malformed: {0}")]
    MalformedSecret(String),
}

/// A detached signature plus the exact message that was signed.
#[derive(Clone, Debug)]
pub struct SignatureEnvelope {
    pub signature: String,
    pub public_key: String,
    pub message: String,
}

pub struct Keypair {
    signing_key: SigningKey,
    public_key: String,
}

impl Keypair {
    /// Derive a deterministic keypair from opaque secret material.
    ///
    /// Accepted forms:
    /// - base58 64-byte keypair (the seed half is used),
    /// - base58 32-byte seed,
    /// - any other non-empty string, hashed with SHA-256 into a seed.
    ///
    /// The hashed-string path keeps arbitrary secrets usable but carries
    /// only whatever entropy the string had; it is a fallback, not an
    /// equivalent of a generated seed. Prefixing the secret with
    /// `ed25519:` disables the fallback and requires well-formed key
    /// bytes.
    pub fn from_secret(secret: &str) -> Result<Self, KeyError> {
        if secret.is_empty() {
            return Err(KeyError::EmptySecret);
        }

        let (material, strict) = match secret.strip_prefix(SECRET_PREFIX) {
            Some(rest) => (rest, true),
            None => (secret, false),
        };

        let seed: [u8; 32] = match decode_seed(material) {
            Some(seed) => seed,
            None if strict => {
                return Err(KeyError::MalformedSecret(
                    "expected base58 32-byte seed or 64-byte keypair after prefix".to_string(),
                ));
            }
            None => Sha256::digest(material.as_bytes()).into(),
        };

        let signing_key = SigningKey::from_bytes(&seed);
        let public_key = bs58::encode(signing_key.verifying_key().as_bytes()).into_string();

        Ok(Self { signing_key, public_key })
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Sign the canonical form of `payload`.
    ///
    /// Deterministic for equal payload and key.
    pub fn sign(&self, payload: &Value) -> SignatureEnvelope {
        let message = canonical_string(payload);
        let signature = self.signing_key.sign(message.as_bytes());

        SignatureEnvelope {
            signature: bs58::encode(signature.to_bytes()).into_string(),
            public_key: self.public_key.clone(),
            message,
        }
    }
}

/// Decode base58 secret material into a 32-byte seed.
///
/// 64-byte input is treated as seed || public key, keeping externally
/// generated keypair exports usable.
fn decode_seed(material: &str) -> Option<[u8; 32]> {
    let bytes = bs58::decode(material).into_vec().ok()?;
    match bytes.len() {
        32 => bytes.try_into().ok(),
        64 => bytes[..32].try_into().ok(),
        _ => None,
    }
}

/// Check a detached signature over the canonical form of `payload`.
///
/// Every decode or verification failure reports as `false`; this path
/// never errors.
pub fn verify_signature(payload: &Value, signature_b58: &str, public_key_b58: &str) -> bool {
    let message = canonical_string(payload);

    let Ok(signature_bytes) = bs58::decode(signature_b58).into_vec() else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&signature_bytes) else {
        return false;
    };

    let Ok(public_bytes) = bs58::decode(public_key_b58).into_vec() else {
        return false;
    };
    let Ok(public_array) = <[u8; 32]>::try_from(public_bytes.as_slice()) else {
        return false;
    };
    let Ok(public_key) = VerifyingKey::from_bytes(&public_array) else {
        return false;
    };

    public_key.verify(message.as_bytes(), &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flip_last_char(text: &str) -> String {
        let mut out: String = text.chars().collect();
        let last = out.pop().expect("non-empty");
        out.push(if last == 'A' { 'B' } else { 'A' });
        out
    }

    #[test]
    fn sign_verify_round_trip() {
        let keypair = Keypair::from_secret("test-attester-secret").expect("derive");
        let payload = json!({ "pool_id": "p1", "participant_count": 2 });

        let envelope = keypair.sign(&payload);
        assert!(verify_signature(&payload, &envelope.signature, &envelope.public_key));
    }

    #[test]
    fn tampered_signature_fails() {
        let keypair = Keypair::from_secret("test-attester-secret").expect("derive");
        let payload = json!({ "pool_id": "p1" });

        let envelope = keypair.sign(&payload);
        let tampered = flip_last_char(&envelope.signature);
        assert!(!verify_signature(&payload, &tampered, &envelope.public_key));
    }

    #[test]
    fn tampered_payload_fails() {
        let keypair = Keypair::from_secret("test-attester-secret").expect("derive");
        let payload = json!({ "pool_id": "p1" });
        let envelope = keypair.sign(&payload);

        let other = json!({ "pool_id": "p2" });
        assert!(!verify_signature(&other, &envelope.signature, &envelope.public_key));
    }

    #[test]
    fn derivation_is_deterministic() {
        let first = Keypair::from_secret("same-secret").expect("derive");
        let second = Keypair::from_secret("same-secret").expect("derive");
        assert_eq!(first.public_key(), second.public_key());

        let payload = json!({ "n": 1 });
        assert_eq!(first.sign(&payload).signature, second.sign(&payload).signature);
    }

    #[test]
    fn base58_seed_and_fallback_derive_different_keys() {
        let seed_b58 = bs58::encode([7u8; 32]).into_string();
        let from_seed = Keypair::from_secret(&seed_b58).expect("derive");
        let from_string = Keypair::from_secret("definitely not base58 key bytes!").expect("derive");
        assert_ne!(from_seed.public_key(), from_string.public_key());
    }

    #[test]
    fn prefixed_seed_matches_bare_seed() {
        let seed_b58 = bs58::encode([9u8; 32]).into_string();
        let bare = Keypair::from_secret(&seed_b58).expect("derive");
        let prefixed = Keypair::from_secret(&format!("{SECRET_PREFIX}{seed_b58}")).expect("derive");
        assert_eq!(bare.public_key(), prefixed.public_key());
    }

    #[test]
    fn keypair_bytes_match_their_seed() {
        let mut keypair_bytes = [3u8; 64];
        let seed: [u8; 32] = keypair_bytes[..32].try_into().unwrap();
        let expected = SigningKey::from_bytes(&seed);
        keypair_bytes[32..].copy_from_slice(expected.verifying_key().as_bytes());

        let from_keypair =
            Keypair::from_secret(&bs58::encode(keypair_bytes).into_string()).expect("derive");
        let from_seed = Keypair::from_secret(&bs58::encode(seed).into_string()).expect("derive");
        assert_eq!(from_keypair.public_key(), from_seed.public_key());
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(matches!(Keypair::from_secret(""), Err(KeyError::EmptySecret)));
    }

    #[test]
    fn prefixed_garbage_is_rejected() {
        let result = Keypair::from_secret("ed25519:not base58 at all!");
        assert!(matches!(result, Err(KeyError::MalformedSecret(_))));

        // Valid base58, wrong length.
        let short = bs58::encode([1u8; 16]).into_string();
        let result = Keypair::from_secret(&format!("{SECRET_PREFIX}{short}"));
        assert!(matches!(result, Err(KeyError::MalformedSecret(_))));
    }

    #[test]
    fn verify_tolerates_garbage_inputs() {
        let payload = json!({ "pool_id": "p1" });
        assert!(!verify_signature(&payload, "!!not-base58!!", "also-garbage"));
        assert!(!verify_signature(&payload, "", ""));

        // Decodable but wrong-length key material.
        let short = bs58::encode([1u8; 8]).into_string();
        assert!(!verify_signature(&payload, &short, &short));
    }
}
