//! Secret protection for datasource configuration.
//!
//! Credentials embedded in datasource config never reach storage in
//! cleartext. The [`SecretVault`] converts plaintext to a self-describing
//! protected string and back; the cipher doing the actual work sits behind
//! the [`SecretCipher`] trait so the backend (local AES-256-GCM, an external
//! KMS) can be swapped without changing the protect/reveal contract.
//!
//! # Laws
//!
//! - `reveal(protect(v, ctx)) == v` for every value and context.
//! - `is_protected(s) == false` for any string the vault did not produce
//!   (structural check; see [`vault`] for the residual fabrication risk).
//! - `reveal` distinguishes "nothing to reveal" (`NotProtected`) from
//!   "revealing failed" (`SecretCorrupted`).

pub mod cipher;
pub mod types;
pub mod vault;

pub use cipher::{AesGcmCipher, SecretCipher, SecretContext};
pub use types::SecretString;
pub use vault::{SecretVault, PROTECTED_PREFIX};
