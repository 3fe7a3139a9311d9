//! # BLS12-381 Signatures for Consensus
//!
//! BLS (Boneh-Lynn-Shacham) signatures over the BLS12-381 curve. Their key
//! property is **aggregation**: the precommits backing a block commit are
//! combined into a single 96-byte signature that verifies against the
//! aggregated public keys of the signers.
//!
//! ## Security notes
//!
//! - **Domain separation**: every signature is scoped to a message type and a
//!   chain id via [`DomainTag`], so a prevote signature can never be replayed
//!   as a precommit or on another chain.
//! - **Canonical encoding**: keys and signatures are re-encoded on decode and
//!   rejected if non-canonical, preventing malleability.
//!
//! ## Key types
//!
//! - [`BlsPrivateKey`] - secret scalar for signing (32 bytes)
//! - [`BlsPublicKey`] - public key (48 bytes, G1 point)
//! - [`BlsSignature`] - signature (96 bytes, G2 point)
//!
//! ## Example
//!
//! ```rust
//! use tessera_crypto::bls::{BlsPrivateKey, BlsSignature, DomainTag};
//!
//! let keys: Vec<_> = (0..3).map(|_| BlsPrivateKey::random()).collect();
//! let pubkeys: Vec<_> = keys.iter().map(|k| k.public_key()).collect();
//! let domain = DomainTag::new_commit("tessera-1");
//!
//! let sigs: Vec<_> = keys.iter().map(|k| k.sign_with_domain(b"msg", &domain)).collect();
//! let sig_refs: Vec<_> = sigs.iter().collect();
//!
//! let aggregate = BlsSignature::aggregate(&sig_refs).unwrap();
//! let pk_refs: Vec<_> = pubkeys.iter().collect();
//! assert!(aggregate.verify_aggregate_with_domain(b"msg", &pk_refs, &domain));
//! ```

use crate::{CryptoError, Result};
use blst::min_pk::{AggregatePublicKey, AggregateSignature, PublicKey, SecretKey, Signature};
use blst::BLST_ERROR;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Base domain separation tag prefix for Tessera BLS signatures.
const DST_PREFIX: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_TESSERA_";

/// Message types for domain separation.
///
/// Each message type gets a unique domain tag so a signature produced in one
/// context cannot be reused in another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// Prevote consensus message
    Prevote,
    /// Precommit consensus message
    Precommit,
    /// Block commit (aggregated precommits)
    Commit,
}

impl MessageType {
    /// Get the string tag for this message type.
    pub fn as_tag(&self) -> &'static str {
        match self {
            MessageType::Prevote => "PREVOTE",
            MessageType::Precommit => "PRECOMMIT",
            MessageType::Commit => "COMMIT",
        }
    }
}

/// Domain separation tag for BLS signatures.
///
/// Scopes a signature to a protocol, message type, and chain id. Two chains
/// running the same software produce mutually unverifiable signatures.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainTag {
    message_type: MessageType,
    chain_id: String,
    /// Cached full DST bytes
    dst: Vec<u8>,
}

impl DomainTag {
    /// Create a new domain tag.
    pub fn new(message_type: MessageType, chain_id: impl Into<String>) -> Self {
        let chain_id = chain_id.into();
        let dst = Self::build_dst(message_type, &chain_id);
        Self {
            message_type,
            chain_id,
            dst,
        }
    }

    /// Create a domain tag for prevote messages.
    pub fn new_prevote(chain_id: impl Into<String>) -> Self {
        Self::new(MessageType::Prevote, chain_id)
    }

    /// Create a domain tag for precommit messages.
    pub fn new_precommit(chain_id: impl Into<String>) -> Self {
        Self::new(MessageType::Precommit, chain_id)
    }

    /// Create a domain tag for block commits.
    pub fn new_commit(chain_id: impl Into<String>) -> Self {
        Self::new(MessageType::Commit, chain_id)
    }

    /// Get the message type.
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Get the chain ID.
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Get the full DST bytes for signing.
    pub fn dst(&self) -> &[u8] {
        &self.dst
    }

    fn build_dst(message_type: MessageType, chain_id: &str) -> Vec<u8> {
        let mut dst = Vec::with_capacity(DST_PREFIX.len() + 16 + chain_id.len());
        dst.extend_from_slice(DST_PREFIX);
        dst.extend_from_slice(message_type.as_tag().as_bytes());
        dst.push(b'_');
        dst.extend_from_slice(chain_id.as_bytes());
        dst
    }
}

/// BLS private key (secret key)
///
/// A 32-byte scalar used for signing. Must be kept secret.
pub struct BlsPrivateKey {
    inner: SecretKey,
}

impl BlsPrivateKey {
    /// Generate a random BLS private key using a cryptographically secure RNG.
    pub fn random() -> Self {
        let mut ikm = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut ikm);
        let sk = SecretKey::key_gen(&ikm, &[]).expect("key generation failed");
        Self { inner: sk }
    }

    /// Create a BLS private key from a seed using BLS key derivation.
    ///
    /// # Arguments
    ///
    /// * `ikm` - Input keying material (at least 32 bytes)
    pub fn from_seed(ikm: &[u8]) -> Result<Self> {
        if ikm.len() < 32 {
            return Err(CryptoError::InvalidLength {
                expected: 32,
                actual: ikm.len(),
            });
        }
        let sk = SecretKey::key_gen(ikm, &[])
            .map_err(|_| CryptoError::InvalidPrivateKey("key generation failed".to_string()))?;
        Ok(Self { inner: sk })
    }

    /// Create a BLS private key from a 32-byte big-endian scalar.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let sk = SecretKey::from_bytes(bytes)
            .map_err(|e| CryptoError::InvalidPrivateKey(format!("{:?}", e)))?;
        Ok(Self { inner: sk })
    }

    /// Get the raw bytes of the private key.
    ///
    /// # Security
    ///
    /// The returned bytes are the secret key.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }

    /// Derive the public key from this private key.
    pub fn public_key(&self) -> BlsPublicKey {
        BlsPublicKey {
            inner: self.inner.sk_to_pk(),
        }
    }

    /// Sign a message under the given domain tag.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tessera_crypto::bls::{BlsPrivateKey, DomainTag};
    ///
    /// let sk = BlsPrivateKey::random();
    /// let domain = DomainTag::new_prevote("tessera-1");
    /// let sig = sk.sign_with_domain(b"block hash", &domain);
    /// ```
    pub fn sign_with_domain(&self, message: &[u8], domain: &DomainTag) -> BlsSignature {
        BlsSignature {
            inner: self.inner.sign(message, domain.dst(), &[]),
        }
    }
}

impl Clone for BlsPrivateKey {
    fn clone(&self) -> Self {
        let bytes = self.to_bytes();
        Self::from_bytes(&bytes).expect("cloning valid key should succeed")
    }
}

impl std::fmt::Debug for BlsPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlsPrivateKey")
            .field("public_key", &self.public_key().to_hex())
            .finish()
    }
}

/// BLS public key (48 bytes, G1 point)
///
/// Used for verifying signatures; can be aggregated with other public keys.
/// Implements `Ord` for deterministic ordering.
#[derive(Clone)]
pub struct BlsPublicKey {
    inner: PublicKey,
}

impl BlsPublicKey {
    /// Create a public key from compressed bytes (48 bytes).
    ///
    /// Validates that the bytes are a valid curve point in canonical form.
    pub fn from_bytes(bytes: &[u8; 48]) -> Result<Self> {
        let pk = PublicKey::from_bytes(bytes)
            .map_err(|e| CryptoError::InvalidPublicKey(format!("{:?}", e)))?;

        // Reject non-canonical encodings
        if pk.to_bytes() != *bytes {
            return Err(CryptoError::BlsError(
                "non-canonical public key encoding".to_string(),
            ));
        }

        Ok(Self { inner: pk })
    }

    /// Create a public key from a hex string.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes = hex::decode(hex)?;
        if bytes.len() != 48 {
            return Err(CryptoError::InvalidLength {
                expected: 48,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 48];
        arr.copy_from_slice(&bytes);
        Self::from_bytes(&arr)
    }

    /// Get the compressed public key bytes (48 bytes).
    pub fn to_bytes(&self) -> [u8; 48] {
        self.inner.to_bytes()
    }

    /// Get the hex-encoded public key.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl PartialEq for BlsPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for BlsPublicKey {}

impl PartialOrd for BlsPublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BlsPublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_bytes().cmp(&other.to_bytes())
    }
}

impl std::hash::Hash for BlsPublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state);
    }
}

impl std::fmt::Debug for BlsPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlsPublicKey")
            .field("bytes", &self.to_hex())
            .finish()
    }
}

impl Serialize for BlsPublicKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let bytes = self.to_bytes();
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(bytes))
        } else {
            serializer.serialize_bytes(&bytes)
        }
    }
}

impl<'de> Deserialize<'de> for BlsPublicKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            BlsPublicKey::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(deserializer)?;
            if bytes.len() != 48 {
                return Err(serde::de::Error::custom(format!(
                    "expected 48 bytes, got {}",
                    bytes.len()
                )));
            }
            let mut arr = [0u8; 48];
            arr.copy_from_slice(&bytes);
            BlsPublicKey::from_bytes(&arr).map_err(serde::de::Error::custom)
        }
    }
}

/// BLS signature (96 bytes, G2 point)
///
/// Can be aggregated with other signatures over the same message.
#[derive(Clone)]
pub struct BlsSignature {
    inner: Signature,
}

impl BlsSignature {
    /// Create a signature from compressed bytes (96 bytes).
    ///
    /// Validates canonical encoding to prevent malleability.
    pub fn from_bytes(bytes: &[u8; 96]) -> Result<Self> {
        let sig = Signature::from_bytes(bytes)
            .map_err(|e| CryptoError::InvalidSignature(format!("{:?}", e)))?;

        if sig.to_bytes() != *bytes {
            return Err(CryptoError::BlsError(
                "non-canonical signature encoding".to_string(),
            ));
        }

        Ok(Self { inner: sig })
    }

    /// Create a signature from a hex string.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes = hex::decode(hex)?;
        if bytes.len() != 96 {
            return Err(CryptoError::InvalidLength {
                expected: 96,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 96];
        arr.copy_from_slice(&bytes);
        Self::from_bytes(&arr)
    }

    /// Get the compressed signature bytes (96 bytes).
    pub fn to_bytes(&self) -> [u8; 96] {
        self.inner.to_bytes()
    }

    /// Get the hex-encoded signature.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Verify the signature against a message and public key under a domain.
    pub fn verify_with_domain(
        &self,
        message: &[u8],
        public_key: &BlsPublicKey,
        domain: &DomainTag,
    ) -> bool {
        let result = self
            .inner
            .verify(true, message, domain.dst(), &[], &public_key.inner, true);
        result == BLST_ERROR::BLST_SUCCESS
    }

    /// Aggregate multiple signatures into one.
    ///
    /// All signatures must be over the SAME message for the aggregate to be
    /// meaningful.
    pub fn aggregate(signatures: &[&BlsSignature]) -> Result<Self> {
        if signatures.is_empty() {
            return Err(CryptoError::BlsError(
                "cannot aggregate empty list".to_string(),
            ));
        }

        let sigs: Vec<&Signature> = signatures.iter().map(|s| &s.inner).collect();
        let agg = AggregateSignature::aggregate(&sigs, false)
            .map_err(|e| CryptoError::BlsError(format!("aggregation failed: {:?}", e)))?;

        Ok(Self {
            inner: agg.to_signature(),
        })
    }

    /// Verify an aggregated signature against the signers' public keys.
    ///
    /// All signers must have signed the SAME message under `domain`.
    pub fn verify_aggregate_with_domain(
        &self,
        message: &[u8],
        public_keys: &[&BlsPublicKey],
        domain: &DomainTag,
    ) -> bool {
        if public_keys.is_empty() {
            return false;
        }

        let pks: Vec<&PublicKey> = public_keys.iter().map(|pk| &pk.inner).collect();
        let agg_pk = match AggregatePublicKey::aggregate(&pks, false) {
            Ok(pk) => pk,
            Err(_) => return false,
        };

        let result = self.inner.verify(
            true,
            message,
            domain.dst(),
            &[],
            &agg_pk.to_public_key(),
            true,
        );
        result == BLST_ERROR::BLST_SUCCESS
    }
}

impl PartialEq for BlsSignature {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for BlsSignature {}

impl Default for BlsSignature {
    /// Create a placeholder signature for messages that are yet to be signed.
    fn default() -> Self {
        let sk = BlsPrivateKey::from_seed(&[0u8; 32]).expect("seed should work");
        sk.sign_with_domain(b"", &DomainTag::new_prevote(""))
    }
}

impl std::fmt::Debug for BlsSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlsSignature")
            .field("bytes", &self.to_hex())
            .finish()
    }
}

impl Serialize for BlsSignature {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let bytes = self.to_bytes();
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(bytes))
        } else {
            serializer.serialize_bytes(&bytes)
        }
    }
}

impl<'de> Deserialize<'de> for BlsSignature {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            BlsSignature::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(deserializer)?;
            if bytes.len() != 96 {
                return Err(serde::de::Error::custom(format!(
                    "expected 96 bytes, got {}",
                    bytes.len()
                )));
            }
            let mut arr = [0u8; 96];
            arr.copy_from_slice(&bytes);
            BlsSignature::from_bytes(&arr).map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let sk = BlsPrivateKey::random();
        let pk = sk.public_key();
        let domain = DomainTag::new_precommit("test-chain");

        let sig = sk.sign_with_domain(b"message", &domain);
        assert!(sig.verify_with_domain(b"message", &pk, &domain));
        assert!(!sig.verify_with_domain(b"other message", &pk, &domain));
    }

    #[test]
    fn test_domain_separation() {
        let sk = BlsPrivateKey::random();
        let pk = sk.public_key();

        let prevote = DomainTag::new_prevote("test-chain");
        let precommit = DomainTag::new_precommit("test-chain");
        let other_chain = DomainTag::new_prevote("other-chain");

        let sig = sk.sign_with_domain(b"message", &prevote);
        assert!(sig.verify_with_domain(b"message", &pk, &prevote));
        assert!(!sig.verify_with_domain(b"message", &pk, &precommit));
        assert!(!sig.verify_with_domain(b"message", &pk, &other_chain));
    }

    #[test]
    fn test_signature_bytes_roundtrip() {
        let sk = BlsPrivateKey::random();
        let domain = DomainTag::new_commit("test-chain");
        let sig = sk.sign_with_domain(b"message", &domain);

        let restored = BlsSignature::from_bytes(&sig.to_bytes()).unwrap();
        assert_eq!(sig, restored);
    }

    #[test]
    fn test_pubkey_bytes_roundtrip() {
        let pk = BlsPrivateKey::random().public_key();
        let restored = BlsPublicKey::from_bytes(&pk.to_bytes()).unwrap();
        assert_eq!(pk, restored);
    }

    #[test]
    fn test_from_seed_deterministic() {
        let a = BlsPrivateKey::from_seed(&[7u8; 32]).unwrap();
        let b = BlsPrivateKey::from_seed(&[7u8; 32]).unwrap();
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_aggregate_rejects_missing_signer() {
        let keys: Vec<_> = (0..4).map(|_| BlsPrivateKey::random()).collect();
        let domain = DomainTag::new_commit("test-chain");
        let message = b"block hash";

        // Only three of four sign
        let sigs: Vec<_> = keys[..3]
            .iter()
            .map(|k| k.sign_with_domain(message, &domain))
            .collect();
        let sig_refs: Vec<_> = sigs.iter().collect();
        let aggregate = BlsSignature::aggregate(&sig_refs).unwrap();

        let signer_pks: Vec<_> = keys[..3].iter().map(|k| k.public_key()).collect();
        let signer_refs: Vec<_> = signer_pks.iter().collect();
        assert!(aggregate.verify_aggregate_with_domain(message, &signer_refs, &domain));

        // Claiming the fourth validator signed must fail
        let all_pks: Vec<_> = keys.iter().map(|k| k.public_key()).collect();
        let all_refs: Vec<_> = all_pks.iter().collect();
        assert!(!aggregate.verify_aggregate_with_domain(message, &all_refs, &domain));
    }
}
