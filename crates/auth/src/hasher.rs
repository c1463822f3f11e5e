//! One-way credential hashing.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("hashing failed: {0}")]
    Failed(String),

    #[error("hashing task aborted: {0}")]
    Task(String),
}

/// Opaque one-way keyed hash with verification.
#[async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash(&self, plain: &str) -> Result<String, HashError>;

    async fn verify(&self, hash: &str, plain: &str) -> Result<bool, HashError>;
}

/// bcrypt work factor used when none is configured.
pub const DEFAULT_BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

/// bcrypt, run on the blocking pool. Used for passwords.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

#[async_trait]
impl CredentialHasher for BcryptHasher {
    async fn hash(&self, plain: &str) -> Result<String, HashError> {
        let plain = plain.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
            .await
            .map_err(|e| HashError::Task(e.to_string()))?
            .map_err(|e| HashError::Failed(e.to_string()))
    }

    async fn verify(&self, hash: &str, plain: &str) -> Result<bool, HashError> {
        let plain = plain.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash))
            .await
            .map_err(|e| HashError::Task(e.to_string()))?
            .map_err(|e| HashError::Failed(e.to_string()))
    }
}

/// Unsalted SHA-256 hex digest. Used for refresh tokens.
///
/// Refresh tokens are high-entropy signed JWTs longer than bcrypt's 72-byte
/// input limit, so bcrypt would compare only their (shared) header prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl Sha256Hasher {
    fn digest(plain: &str) -> String {
        hex::encode(Sha256::digest(plain.as_bytes()))
    }
}

#[async_trait]
impl CredentialHasher for Sha256Hasher {
    async fn hash(&self, plain: &str) -> Result<String, HashError> {
        Ok(Self::digest(plain))
    }

    async fn verify(&self, hash: &str, plain: &str) -> Result<bool, HashError> {
        Ok(constant_time_eq(hash.as_bytes(), Self::digest(plain).as_bytes()))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bcrypt_round_trip() {
        let hasher = BcryptHasher::new(4);
        let hash = hasher.hash("secret1").await.unwrap();
        assert_ne!(hash, "secret1");
        assert!(hasher.verify(&hash, "secret1").await.unwrap());
        assert!(!hasher.verify(&hash, "wrong").await.unwrap());
    }

    #[tokio::test]
    async fn bcrypt_rejects_malformed_hash() {
        let hasher = BcryptHasher::new(4);
        assert!(hasher.verify("not-a-bcrypt-hash", "x").await.is_err());
    }

    #[tokio::test]
    async fn sha256_distinguishes_long_inputs_with_shared_prefix() {
        let hasher = Sha256Hasher;
        let prefix = "x".repeat(100);
        let hash = hasher.hash(&format!("{prefix}a")).await.unwrap();
        assert!(hasher.verify(&hash, &format!("{prefix}a")).await.unwrap());
        assert!(!hasher.verify(&hash, &format!("{prefix}b")).await.unwrap());
    }

    #[test]
    fn constant_time_eq_handles_lengths() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
