//! Cryptographic operations for the ledger
//!
//! This module provides:
//! - Ed25519 key pair generation for caller identities
//! - SHA-256 hashing used by address derivation
//! - The off-curve test that makes derived addresses unsignable

use crate::types::Address;
use ed25519_dalek::{SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};

/// Ed25519 key pair backing one external identity
#[derive(Debug)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let signing_key = SigningKey::from_bytes(&rand::random::<[u8; 32]>());
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Create from seed (32 bytes) - deterministic generation
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Ledger address of this identity (the public key bytes)
    pub fn address(&self) -> Address {
        Address::new(self.verifying_key.to_bytes())
    }

    /// Private key bytes (USE WITH CAUTION - should be protected)
    pub fn secret_key(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

/// True if `bytes` cannot be an ed25519 public key.
///
/// Derived record addresses must satisfy this: an address that fails point
/// decompression can never correspond to an externally held signing key, so
/// assets held under it are movable only by protocol code.
pub fn is_off_curve(bytes: &[u8; 32]) -> bool {
    VerifyingKey::from_bytes(bytes).is_err()
}

/// Hash arbitrary bytes using SHA-256
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
