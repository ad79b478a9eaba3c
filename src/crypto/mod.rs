//! Cryptographic operations for SSH key generation.
//!
//! This module provides:
//! - Secure random ed25519 key generation
//! - SSH wire encoding of public keys
//! - OpenSSH and PKCS#8 private key export

mod keypair;
pub mod wire;

pub use keypair::{Keypair, KEYPAIR_LEN, SEED_LEN};
pub use wire::{WireFormatter, KEY_ALGORITHM};

/// Errors raised while generating or exporting keys.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("Secure random generator failed: {0}")]
    Random(#[from] rand::Error),

    #[error("OpenSSH export failed: {0}")]
    OpenSsh(#[from] ssh_key::Error),

    #[error("PKCS#8 export failed: {0}")]
    Pkcs8(#[from] ed25519_dalek::pkcs8::Error),

    #[error("Private key does not match its public key")]
    InconsistentKeypair,
}
