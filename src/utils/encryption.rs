//! Symmetric encryption for task payloads and stored personalisation.
//!
//! Ciphertext layout is `base64(nonce[12] || ciphertext || tag[16])`.

use aes_gcm::aead::{Aead, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, KeyInit, Nonce};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::AppError;

const NONCE_SIZE: usize = 12;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: ciphertext corrupted or key mismatch")]
    DecryptionFailed,

    #[error("Invalid key: expected 32 bytes as 64 hex characters, got {0} bytes")]
    InvalidKeyLength(usize),

    #[error("Invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    #[error("Payload serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<CryptoError> for AppError {
    fn from(error: CryptoError) -> Self {
        AppError::Internal {
            source: anyhow::Error::new(error),
        }
    }
}

/// AES-256-GCM encryptor shared by the API and the task workers.
#[derive(Clone)]
pub struct Encryptor {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for Encryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encryptor").finish_non_exhaustive()
    }
}

impl Encryptor {
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != 32 {
            return Err(CryptoError::InvalidKeyLength(key.len()));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        Ok(Self { cipher })
    }

    pub fn from_hex(hex_key: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_key.trim()).map_err(|_| CryptoError::InvalidKeyLength(0))?;
        Self::new(&bytes)
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(&combined))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, CryptoError> {
        let combined = BASE64
            .decode(encoded)
            .map_err(|e| CryptoError::InvalidCiphertext(e.to_string()))?;
        if combined.len() < NONCE_SIZE {
            return Err(CryptoError::InvalidCiphertext(format!(
                "expected at least {NONCE_SIZE} bytes, got {}",
                combined.len()
            )));
        }

        let (nonce, ciphertext) = combined.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)?;
        String::from_utf8(plaintext).map_err(|e| CryptoError::InvalidCiphertext(e.to_string()))
    }

    pub fn encrypt_json<T: Serialize>(&self, value: &T) -> Result<String, CryptoError> {
        self.encrypt(&serde_json::to_string(value)?)
    }

    pub fn decrypt_json<T: DeserializeOwned>(&self, encoded: &str) -> Result<T, CryptoError> {
        Ok(serde_json::from_str(&self.decrypt(encoded)?)?)
    }
}
