//! # Tessera Crypto
//!
//! Cryptographic primitives for the Tessera blockchain.
//!
//! This crate provides:
//! - **Keccak256 hashing** - used for block, vote, and evidence identities
//! - **BLS12-381 signatures** - aggregatable signatures for consensus votes
//!   and commits, with chain-scoped domain separation
//!
//! ## Example
//!
//! ```rust
//! use tessera_crypto::{keccak256, bls};
//!
//! // Hash some data
//! let hash = keccak256(b"hello world");
//!
//! // Generate a BLS key and sign a consensus message
//! let sk = bls::BlsPrivateKey::random();
//! let pk = sk.public_key();
//! let domain = bls::DomainTag::new_precommit("tessera-1");
//! let sig = sk.sign_with_domain(b"block hash", &domain);
//! assert!(sig.verify_with_domain(b"block hash", &pk, &domain));
//! ```

pub mod bls;
pub mod hash;

// Re-export commonly used items
pub use bls::{BlsPrivateKey, BlsPublicKey, BlsSignature, DomainTag, MessageType};
pub use hash::{keccak256, keccak256_concat, Hasher};

/// Common type alias for 32-byte hash
pub type Hash = [u8; 32];

/// Error types for cryptographic operations
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Invalid private key bytes
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Invalid public key bytes
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Invalid signature bytes
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// BLS operation failed
    #[error("BLS operation failed: {0}")]
    BlsError(String),

    /// Invalid input length
    #[error("invalid input length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex decoding error
    #[error("hex decoding error: {0}")]
    HexError(String),
}

impl From<hex::FromHexError> for CryptoError {
    fn from(e: hex::FromHexError) -> Self {
        CryptoError::HexError(e.to_string())
    }
}

/// Result type for cryptographic operations
pub type Result<T> = std::result::Result<T, CryptoError>;
