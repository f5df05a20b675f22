use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::errors::CoreError;

/// Argon2id parameters for key derivation.
/// Written into the store header so existing stores keep opening after the
/// defaults change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MB)
    pub memory_cost: u32,
    /// Number of iterations (default: 3)
    pub time_cost: u32,
    /// Degree of parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_cost: 65_536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Cheaper parameters for hashing short local secrets such as the
    /// 4-digit unlock PIN, which is verified on every app unlock.
    pub fn for_pin() -> Self {
        Self {
            memory_cost: 19_456,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

/// Run Argon2id over `secret` and return 32 bytes of output.
pub fn derive_key(secret: &str, salt: &[u8; 16], params: &KdfParams) -> Result<[u8; 32], CoreError> {
    let argon2_params = Params::new(params.memory_cost, params.time_cost, params.parallelism, Some(32))
        .map_err(|e| CoreError::Encryption(format!("Invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; 32];
    argon2
        .hash_password_into(secret.as_bytes(), salt, &mut key)
        .map_err(|e| CoreError::Encryption(format!("Argon2 key derivation failed: {e}")))?;

    Ok(key)
}

/// A derived AES-256-GCM key bound to the salt and KDF params it came from.
///
/// The key is derived once when a store is opened; every write then only
/// needs a fresh nonce, so saving a single preference stays cheap.
pub struct StoreKey {
    key: [u8; 32],
    salt: [u8; 16],
    params: KdfParams,
}

impl StoreKey {
    pub fn derive(passphrase: &str, salt: [u8; 16], params: KdfParams) -> Result<Self, CoreError> {
        let key = derive_key(passphrase, &salt, &params)?;
        Ok(Self { key, salt, params })
    }

    pub fn salt(&self) -> &[u8; 16] {
        &self.salt
    }

    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    /// Encrypt under a fresh random nonce. Returns `(nonce, ciphertext)`;
    /// the ciphertext carries the 16-byte GCM tag.
    pub fn seal(&self, plaintext: &[u8]) -> Result<([u8; 12], Vec<u8>), CoreError> {
        let nonce = generate_nonce()?;
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CoreError::Encryption(format!("Failed to create cipher: {e}")))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| CoreError::Encryption(format!("Encryption failed: {e}")))?;
        Ok((nonce, ciphertext))
    }

    /// Decrypt and authenticate. A wrong passphrase and a tampered file are
    /// indistinguishable and both yield `CoreError::Decryption`.
    pub fn open(&self, nonce: &[u8; 12], ciphertext: &[u8]) -> Result<Vec<u8>, CoreError> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CoreError::Encryption(format!("Failed to create cipher: {e}")))?;
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CoreError::Decryption)
    }
}

impl std::fmt::Debug for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreKey")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Generate cryptographically secure random bytes for a salt.
pub fn generate_salt() -> Result<[u8; 16], CoreError> {
    let mut salt = [0u8; 16];
    getrandom::getrandom(&mut salt)
        .map_err(|e| CoreError::Encryption(format!("Failed to generate random salt: {e}")))?;
    Ok(salt)
}

/// Generate cryptographically secure random bytes for a nonce.
pub fn generate_nonce() -> Result<[u8; 12], CoreError> {
    let mut nonce = [0u8; 12];
    getrandom::getrandom(&mut nonce)
        .map_err(|e| CoreError::Encryption(format!("Failed to generate random nonce: {e}")))?;
    Ok(nonce)
}
