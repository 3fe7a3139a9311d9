//! Consensus vote messages.
//!
//! A [`Vote`] is a prevote or precommit for a block hash at a given height
//! and round. Votes are signed under a chain-scoped BLS domain tag so a vote
//! can never be replayed on another chain or as the other vote type.

use serde::{Deserialize, Serialize};
use tessera_crypto::bls::{BlsPublicKey, BlsSignature, DomainTag};
use tessera_crypto::Hash;

use crate::validator::Address;

/// NIL hash constant - represents "no block" in votes.
pub const NIL_HASH: Hash = [0u8; 32];

/// Vote type for consensus messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VoteType {
    /// First round of voting - the validator saw a valid proposal
    #[default]
    Prevote,
    /// Second round of voting - the validator saw a quorum of prevotes
    Precommit,
}

impl std::fmt::Display for VoteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteType::Prevote => write!(f, "Prevote"),
            VoteType::Precommit => write!(f, "Precommit"),
        }
    }
}

/// Vote message (prevote or precommit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Type of vote
    pub vote_type: VoteType,
    /// Block height
    pub height: u64,
    /// Round number
    pub round: u64,
    /// Hash of the block being voted for (`NIL_HASH` for a nil vote)
    pub block_hash: Hash,
    /// Address of the voting validator
    pub validator_address: Address,
    /// Validator's BLS signature over [`Vote::signing_bytes`]
    pub signature: BlsSignature,
}

impl Vote {
    /// Create a new unsigned vote.
    pub fn new(
        vote_type: VoteType,
        height: u64,
        round: u64,
        block_hash: Hash,
        validator_address: Address,
    ) -> Self {
        Self {
            vote_type,
            height,
            round,
            block_hash,
            validator_address,
            signature: BlsSignature::default(),
        }
    }

    /// Get the signing bytes for this vote.
    ///
    /// The vote type and chain id live in the domain tag, not the message,
    /// so the message carries only position and block identity.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(48);
        bytes.extend(&self.height.to_le_bytes());
        bytes.extend(&self.round.to_le_bytes());
        bytes.extend(&self.block_hash);
        bytes
    }

    /// The BLS domain tag this vote signs under.
    pub fn domain(&self, chain_id: &str) -> DomainTag {
        match self.vote_type {
            VoteType::Prevote => DomainTag::new_prevote(chain_id),
            VoteType::Precommit => DomainTag::new_precommit(chain_id),
        }
    }

    /// Verify the vote signature against a validator public key.
    pub fn verify(&self, chain_id: &str, pubkey: &BlsPublicKey) -> bool {
        self.signature
            .verify_with_domain(&self.signing_bytes(), pubkey, &self.domain(chain_id))
    }

    /// Check if this is a nil vote.
    pub fn is_nil(&self) -> bool {
        self.block_hash == NIL_HASH
    }
}
