//! Cipher backends for the secret vault.
//!
//! The vault's wire format is fixed; what varies is how the nonce and
//! ciphertext are produced. [`SecretCipher`] is that seam: the built-in
//! [`AesGcmCipher`] encrypts locally with a master key, and an external
//! key-management backend can be plugged in without touching the vault or
//! the repository.

use crate::config::VaultConfig;
use crate::errors::{Result, SourceplaneError};
use base64::Engine;
use ring::aead::{self, Aad, BoundKey, Nonce, NonceSequence, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;
use tracing::debug;

/// Size of AES-256-GCM nonce in bytes
pub const NONCE_SIZE: usize = 12;

/// Size of AES-256-GCM tag in bytes
pub const TAG_SIZE: usize = 16;

/// Where a secret lives: the config field name and, once known, the owning
/// datasource. Backends may use this to scope encryption keys; the value
/// itself never depends on it.
#[derive(Debug, Clone, Copy)]
pub struct SecretContext<'a> {
    pub field: &'a str,
    pub datasource_id: Option<&'a str>,
}

impl<'a> SecretContext<'a> {
    pub fn field(field: &'a str) -> Self {
        Self { field, datasource_id: None }
    }

    pub fn with_datasource(field: &'a str, datasource_id: &'a str) -> Self {
        Self { field, datasource_id: Some(datasource_id) }
    }
}

/// Pluggable cipher backend for protected values.
///
/// Implementations must be `Send + Sync`; they are shared behind an `Arc`
/// across concurrent protect/reveal calls.
pub trait SecretCipher: Send + Sync + std::fmt::Debug {
    /// Encrypt plaintext; returns `(ciphertext with tag appended, nonce)`.
    fn encrypt(&self, plaintext: &[u8], context: SecretContext<'_>) -> Result<(Vec<u8>, Vec<u8>)>;

    /// Decrypt a ciphertext produced by this cipher.
    ///
    /// Failures are reported as `SecretCorrupted`; by the time a decrypt is
    /// attempted the value has already been recognized as protected.
    fn decrypt(&self, ciphertext: &[u8], nonce: &[u8]) -> Result<Vec<u8>>;

    /// Key version identifier, for rotation tracking
    fn key_version(&self) -> &str;
}

/// Single-use nonce sequence for AES-GCM
struct SingleNonce {
    nonce: Option<[u8; NONCE_SIZE]>,
}

impl SingleNonce {
    fn new(nonce_bytes: [u8; NONCE_SIZE]) -> Self {
        Self { nonce: Some(nonce_bytes) }
    }
}

impl NonceSequence for SingleNonce {
    fn advance(&mut self) -> std::result::Result<Nonce, ring::error::Unspecified> {
        self.nonce.take().map(Nonce::assume_unique_for_key).ok_or(ring::error::Unspecified)
    }
}

/// Built-in AES-256-GCM cipher with a unique random nonce per secret.
///
/// The master key is a base64-encoded 32-byte value from configuration.
/// This cipher holds one key for all contexts; key scoping by context is
/// left to external backends.
#[derive(Clone)]
pub struct AesGcmCipher {
    key_bytes: Arc<[u8; 32]>,
    key_version: String,
    rng: Arc<SystemRandom>,
}

impl AesGcmCipher {
    /// Create a cipher from vault configuration
    pub fn new(config: &VaultConfig) -> Result<Self> {
        let key_bytes = base64::engine::general_purpose::STANDARD
            .decode(config.master_key_base64.expose_secret())
            .map_err(|e| {
                SourceplaneError::config(format!("Vault master key is not valid base64: {}", e))
            })?;

        if key_bytes.len() != 32 {
            return Err(SourceplaneError::config(format!(
                "Vault master key must be 32 bytes (256 bits), got {} bytes",
                key_bytes.len()
            )));
        }

        let mut key_array = [0u8; 32];
        key_array.copy_from_slice(&key_bytes);

        debug!(key_version = %config.key_version, "Secret cipher initialized");

        Ok(Self {
            key_bytes: Arc::new(key_array),
            key_version: config.key_version.clone(),
            rng: Arc::new(SystemRandom::new()),
        })
    }
}

impl SecretCipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &[u8], _context: SecretContext<'_>) -> Result<(Vec<u8>, Vec<u8>)> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| SourceplaneError::internal("Failed to generate random nonce"))?;

        let unbound_key = UnboundKey::new(&AES_256_GCM, &*self.key_bytes)
            .map_err(|_| SourceplaneError::internal("Failed to create encryption key"))?;
        let mut sealing_key = aead::SealingKey::new(unbound_key, SingleNonce::new(nonce_bytes));

        let mut ciphertext = plaintext.to_vec();
        ciphertext.reserve(TAG_SIZE);
        sealing_key
            .seal_in_place_append_tag(Aad::empty(), &mut ciphertext)
            .map_err(|_| SourceplaneError::internal("Failed to encrypt secret value"))?;

        Ok((ciphertext, nonce_bytes.to_vec()))
    }

    fn decrypt(&self, ciphertext: &[u8], nonce: &[u8]) -> Result<Vec<u8>> {
        if nonce.len() != NONCE_SIZE {
            return Err(SourceplaneError::secret_corrupted(format!(
                "invalid nonce length: expected {} bytes, got {}",
                NONCE_SIZE,
                nonce.len()
            )));
        }
        if ciphertext.len() < TAG_SIZE {
            return Err(SourceplaneError::secret_corrupted(
                "ciphertext too short (missing authentication tag)",
            ));
        }

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        nonce_bytes.copy_from_slice(nonce);

        let unbound_key = UnboundKey::new(&AES_256_GCM, &*self.key_bytes)
            .map_err(|_| SourceplaneError::internal("Failed to create decryption key"))?;
        let mut opening_key = aead::OpeningKey::new(unbound_key, SingleNonce::new(nonce_bytes));

        let mut buffer = ciphertext.to_vec();
        let plaintext = opening_key
            .open_in_place(Aad::empty(), &mut buffer)
            .map_err(|_| SourceplaneError::secret_corrupted("authentication failed"))?;

        Ok(plaintext.to_vec())
    }

    fn key_version(&self) -> &str {
        &self.key_version
    }
}

impl std::fmt::Debug for AesGcmCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmCipher")
            .field("key_version", &self.key_version)
            .field("key_bytes", &"[REDACTED]")
            .finish()
    }
}
