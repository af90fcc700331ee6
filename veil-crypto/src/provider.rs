//! The string-to-string transform applied to designated columns.
//!
//! Engines depend on `Arc<dyn EncryptionProvider>` and never see raw key
//! material. [`ChaChaProvider`] owns the process key; tests and
//! encryption-disabled deployments use [`PassthroughProvider`].

use crate::cipher::{decrypt, encrypt, EncryptedValue};
use crate::error::{CryptoError, CryptoResult};
use crate::key::EncryptionKey;

/// Symmetric encrypt/decrypt of a column's text value.
///
/// Implementations hold read-only key state and are safe to share across
/// threads. Both directions map empty input to empty output: emptiness is
/// not worth encrypting, and an empty stored value cannot be mistaken for
/// ciphertext.
pub trait EncryptionProvider: Send + Sync {
    /// Encrypts a plaintext column value into its stored form.
    fn encrypt(&self, plaintext: &str) -> CryptoResult<String>;

    /// Decrypts a stored column value back into plaintext.
    ///
    /// Malformed input fails with [`CryptoError::Decryption`].
    fn decrypt(&self, stored: &str) -> CryptoResult<String>;
}

/// ChaCha20-Poly1305 provider over the process-wide key.
pub struct ChaChaProvider {
    key: EncryptionKey,
}

impl ChaChaProvider {
    /// Binds the provider to the process key.
    #[must_use]
    pub const fn new(key: EncryptionKey) -> Self {
        Self { key }
    }
}

impl EncryptionProvider for ChaChaProvider {
    fn encrypt(&self, plaintext: &str) -> CryptoResult<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        Ok(encrypt(&self.key, plaintext.as_bytes())?.to_base64())
    }

    fn decrypt(&self, stored: &str) -> CryptoResult<String> {
        if stored.is_empty() {
            return Ok(String::new());
        }
        let encrypted = EncryptedValue::from_base64(stored)?;
        let plaintext = decrypt(&self.key, &encrypted)?;
        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::Decryption(format!("invalid UTF-8: {e}")))
    }
}

/// No-op provider. Values pass through unchanged.
pub struct PassthroughProvider;

impl EncryptionProvider for PassthroughProvider {
    fn encrypt(&self, plaintext: &str) -> CryptoResult<String> {
        Ok(plaintext.to_string())
    }

    fn decrypt(&self, stored: &str) -> CryptoResult<String> {
        Ok(stored.to_string())
    }
}
