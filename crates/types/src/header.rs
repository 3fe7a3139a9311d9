//! Block headers, commits, and light blocks.
//!
//! The evidence subsystem never sees full blocks. It works with:
//! - [`Header`] / [`BlockMeta`] - the metadata the block store serves
//! - [`Commit`] - the aggregated precommit signatures finalizing a block
//! - [`SignedHeader`] / [`LightBlock`] - what a light client (or an attacker
//!   targeting one) presents as proof of a block

use serde::{Deserialize, Serialize};
use tessera_crypto::bls::{BlsPublicKey, BlsSignature, DomainTag};
use tessera_crypto::{Hash, Hasher};

use crate::validator::{Address, ValidatorSet};

/// A block header as stored in the block store and shown to light clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Chain identifier (prevents cross-chain replay)
    pub chain_id: String,
    /// Block height
    pub height: u64,
    /// Block time, Unix milliseconds
    pub time: u64,
    /// Hash of the parent block header
    pub parent_hash: Hash,
    /// Merkle root of the world state after this block
    pub state_root: Hash,
    /// Hash of the validator set that signed this block
    pub validators_hash: Hash,
    /// Address of the block proposer
    pub proposer: Address,
}

impl Header {
    /// Deterministic header hash: identity of the block.
    pub fn hash(&self) -> Hash {
        let mut hasher = Hasher::new();
        hasher.update(self.chain_id.as_bytes());
        hasher.update(&self.height.to_le_bytes());
        hasher.update(&self.time.to_le_bytes());
        hasher.update(&self.parent_hash);
        hasher.update(&self.state_root);
        hasher.update(&self.validators_hash);
        hasher.update(&self.proposer);
        hasher.finalize()
    }
}

/// Block metadata served by the block store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMeta {
    /// The block's header
    pub header: Header,
}

impl BlockMeta {
    /// Create block metadata from a header.
    pub fn new(header: Header) -> Self {
        Self { header }
    }
}

/// A block commit: the aggregated precommits that finalized a block.
///
/// `signers` is a bitmap over the validator set ordering at the commit's
/// height (bit `i` set means validator `i` signed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Height of the committed block
    pub height: u64,
    /// Hash of the committed block header
    pub block_hash: Hash,
    /// Aggregated BLS signature from the signers
    pub signature: BlsSignature,
    /// Bitmap indicating which validators signed (bit i = validator i)
    pub signers: Vec<u8>,
}

impl Commit {
    /// Create a new commit.
    pub fn new(height: u64, block_hash: Hash, signature: BlsSignature, signers: Vec<u8>) -> Self {
        Self {
            height,
            block_hash,
            signature,
            signers,
        }
    }

    /// The message the commit signers signed.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(40);
        bytes.extend(&self.height.to_le_bytes());
        bytes.extend(&self.block_hash);
        bytes
    }

    /// The BLS domain tag commits sign under.
    pub fn domain(chain_id: &str) -> DomainTag {
        DomainTag::new_commit(chain_id)
    }

    /// Indices of the validators recorded as signers.
    pub fn signer_indices(&self) -> Vec<usize> {
        let mut indices = Vec::new();
        for (byte_idx, byte) in self.signers.iter().enumerate() {
            for bit in 0..8 {
                if byte & (1 << bit) != 0 {
                    indices.push(byte_idx * 8 + bit);
                }
            }
        }
        indices
    }

    /// Total voting power of the recorded signers, resolved against a
    /// validator set. Indices outside the set contribute nothing.
    pub fn signed_power(&self, validators: &ValidatorSet) -> u64 {
        self.signer_indices()
            .iter()
            .filter_map(|&i| validators.get(i))
            .map(|v| v.power)
            .sum()
    }

    /// Verify the aggregated signature against the recorded signers.
    ///
    /// Returns false if any recorded signer index is outside the set: a
    /// bitmap claiming unknown signers cannot be checked and is treated as
    /// forged.
    pub fn verify_signatures(&self, chain_id: &str, validators: &ValidatorSet) -> bool {
        let indices = self.signer_indices();
        if indices.is_empty() {
            return false;
        }

        let mut pubkeys: Vec<&BlsPublicKey> = Vec::with_capacity(indices.len());
        for i in indices {
            match validators.get(i) {
                Some(v) => pubkeys.push(&v.pubkey),
                None => return false,
            }
        }

        self.signature.verify_aggregate_with_domain(
            &self.signing_bytes(),
            &pubkeys,
            &Self::domain(chain_id),
        )
    }
}

/// A header together with the commit that finalized it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedHeader {
    /// The block header
    pub header: Header,
    /// The commit over that header
    pub commit: Commit,
}

/// A signed header plus the validator set that produced it.
///
/// This is the unit a light client verifies, and the unit a light-client
/// attacker forges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightBlock {
    /// The signed header
    pub signed_header: SignedHeader,
    /// The validator set claimed to have signed it
    pub validator_set: ValidatorSet,
}

impl LightBlock {
    /// Height of the (possibly forged) block.
    pub fn height(&self) -> u64 {
        self.signed_header.header.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Validator;
    use tessera_crypto::bls::BlsPrivateKey;

    fn make_header(height: u64) -> Header {
        Header {
            chain_id: "test-chain".to_string(),
            height,
            time: 1_700_000_000_000,
            parent_hash: [1u8; 32],
            state_root: [2u8; 32],
            validators_hash: [3u8; 32],
            proposer: [4u8; 20],
        }
    }

    #[test]
    fn test_header_hash_depends_on_fields() {
        let a = make_header(5);
        let mut b = make_header(5);
        assert_eq!(a.hash(), b.hash());

        b.time += 1;
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_commit_signer_indices() {
        let commit = Commit::new(1, [0u8; 32], BlsSignature::default(), vec![0b0000_0101]);
        assert_eq!(commit.signer_indices(), vec![0, 2]);
    }

    #[test]
    fn test_commit_verify_signatures() {
        let keys: Vec<_> = (0..3).map(|_| BlsPrivateKey::random()).collect();
        let validators = ValidatorSet::new(
            keys.iter()
                .enumerate()
                .map(|(i, k)| Validator::new([i as u8; 20], k.public_key(), 10))
                .collect(),
        );

        let header = make_header(8);
        let mut commit = Commit::new(8, header.hash(), BlsSignature::default(), vec![0b0000_0111]);
        let domain = Commit::domain("test-chain");
        let sigs: Vec<_> = keys
            .iter()
            .map(|k| k.sign_with_domain(&commit.signing_bytes(), &domain))
            .collect();
        let sig_refs: Vec<_> = sigs.iter().collect();
        commit.signature = BlsSignature::aggregate(&sig_refs).unwrap();

        assert!(commit.verify_signatures("test-chain", &validators));
        assert_eq!(commit.signed_power(&validators), 30);
        assert!(!commit.verify_signatures("other-chain", &validators));
    }

    #[test]
    fn test_commit_out_of_range_signer_rejected() {
        let keys: Vec<_> = (0..2).map(|_| BlsPrivateKey::random()).collect();
        let validators = ValidatorSet::new(
            keys.iter()
                .enumerate()
                .map(|(i, k)| Validator::new([i as u8; 20], k.public_key(), 10))
                .collect(),
        );

        // Bitmap claims a third signer that does not exist
        let commit = Commit::new(1, [0u8; 32], BlsSignature::default(), vec![0b0000_0111]);
        assert!(!commit.verify_signatures("test-chain", &validators));
        assert_eq!(commit.signed_power(&validators), 20);
    }
}
