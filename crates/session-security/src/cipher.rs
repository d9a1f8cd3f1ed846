//! Cookie value encryption
//!
//! Identifiers travel to the client as `hex(nonce ‖ ciphertext ‖ tag)`,
//! sealed with ChaCha20-Poly1305 under a key derived from the configured
//! secret (SHA-256). Every encryption draws a fresh 12-byte nonce, so the
//! same identifier produces a different cookie value on each write.

use chacha20poly1305::aead::{Aead, KeyInit, OsRng};
use chacha20poly1305::{AeadCore, ChaCha20Poly1305, Key, Nonce};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// ChaCha20-Poly1305 nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Poly1305 tag length in bytes.
const TAG_LEN: usize = 16;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CipherError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("Malformed ciphertext: {0}")]
    Malformed(String),
    #[error("Decryption failed: wrong key or tampered data")]
    DecryptionFailed,
}

/// Symmetric cipher used for the session cookie value.
///
/// `decrypt` must fail with an error (never return a wrong plaintext) when
/// the value was not produced by `encrypt` under the same secret.
pub trait CookieCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError>;
    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError>;
}

#[derive(Clone)]
pub struct ChaChaCipher {
    key: [u8; 32],
}

impl ChaChaCipher {
    pub fn new(secret: &str) -> Self {
        Self {
            key: Sha256::digest(secret.as_bytes()).into(),
        }
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.key))
    }
}

impl std::fmt::Debug for ChaChaCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChaChaCipher").finish_non_exhaustive()
    }
}

impl CookieCipher for ChaChaCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher()
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(hex::encode(blob))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let blob = hex::decode(ciphertext).map_err(|e| CipherError::Malformed(e.to_string()))?;
        if blob.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::Malformed("value too short".into()));
        }

        let (nonce_bytes, sealed) = blob.split_at(NONCE_LEN);
        let plaintext = self
            .cipher()
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|_| CipherError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|e| CipherError::Malformed(e.to_string()))
    }
}

/// One-shot `encrypt(plaintext, secret)`.
pub fn encrypt(plaintext: &str, secret: &str) -> Result<String, CipherError> {
    ChaChaCipher::new(secret).encrypt(plaintext)
}

/// One-shot `decrypt(ciphertext, secret)`.
pub fn decrypt(ciphertext: &str, secret: &str) -> Result<String, CipherError> {
    ChaChaCipher::new(secret).decrypt(ciphertext)
}
