use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// salted credential hash; the plaintext is never stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredential {
    salt: String,
    hash: String,
}

impl StoredCredential {
    /// hash a plaintext credential under a fresh random salt
    pub fn from_plaintext(plaintext: &str) -> Self {
        let salt = hex::encode(Uuid::new_v4().as_bytes());
        let hash = Self::digest(&salt, plaintext);
        Self { salt, hash }
    }

    /// check a candidate credential against the stored hash
    pub fn verify(&self, candidate: &str) -> bool {
        Self::digest(&self.salt, candidate) == self.hash
    }

    fn digest(salt: &str, plaintext: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(b":");
        hasher.update(plaintext.as_bytes());
        hex::encode(hasher.finalize())
    }
}
