//! Transparent column encryption for veil.
//!
//! Designated text columns are encrypted on write and decrypted on read at
//! the storage boundary; application code and queries over non-encrypted
//! columns never see ciphertext. The pieces:
//! - [`EncryptionKey`] — the process-wide 32-byte secret, supplied once at
//!   startup, zeroized on drop
//! - [`encrypt`]/[`decrypt`] — ChaCha20-Poly1305 with a fresh random nonce
//!   per encryption
//! - [`EncryptionProvider`] — the string-to-string transform engines call;
//!   [`ChaChaProvider`] for production, [`PassthroughProvider`] for tests
//! - [`ColumnCipherSet`] — the per-column binding built once at startup
//!   from schema `encrypted` flags via [`bind_encryption`]
//!
//! The stored format is `base64(nonce || ciphertext)`: text-safe, so an
//! encrypted value fits the text column it replaces. Because the nonce is
//! random per encryption, equal plaintexts produce different ciphertexts —
//! equality of encrypted columns is not observable across rows, and
//! lookups that rely on deterministic ciphertext are deliberately
//! unsupported.

mod cipher;
mod columns;
mod error;
mod key;
mod provider;

pub use cipher::{decrypt, encrypt, EncryptedValue, NONCE_SIZE, TAG_SIZE};
pub use columns::{bind_encryption, ColumnCipherSet};
pub use error::{CryptoError, CryptoResult};
pub use key::{EncryptionKey, KEY_SIZE};
pub use provider::{ChaChaProvider, EncryptionProvider, PassthroughProvider};
