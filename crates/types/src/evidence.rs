//! Evidence of validator misbehavior.
//!
//! Two kinds of provable Byzantine behavior exist:
//!
//! - [`DuplicateVoteEvidence`] - a validator signed two different blocks at
//!   the same height, round, and vote type (equivocation)
//! - [`LightClientAttackEvidence`] - a set of validators signed a forged
//!   header and presented it to a light client
//!
//! [`Evidence`] is the tagged union the pool, gossip, and block proposal all
//! traffic in. Its identity is [`Evidence::hash`], which is stable across a
//! serialization round-trip.

use serde::{Deserialize, Serialize};
use tessera_crypto::{keccak256, Hash, Hasher};
use thiserror::Error;

use crate::header::LightBlock;
use crate::validator::{Address, Validator, ValidatorSet};
use crate::vote::{Vote, VoteType};

/// Structural evidence errors, reported by constructors and
/// [`Evidence::validate_basic`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvidenceError {
    /// Votes are from different validators
    #[error("votes from different validators: {} vs {}", hex::encode(.0), hex::encode(.1))]
    DifferentValidators(Address, Address),

    /// Votes are at different heights
    #[error("votes at different heights: {0} vs {1}")]
    DifferentHeights(u64, u64),

    /// Votes are in different rounds
    #[error("votes in different rounds: {0} vs {1}")]
    DifferentRounds(u64, u64),

    /// Votes have different types (prevote vs precommit)
    #[error("votes have different types: {0} vs {1}")]
    DifferentVoteTypes(VoteType, VoteType),

    /// Votes are for the same block - not equivocation
    #[error("votes are for the same block - not equivocation")]
    SameBlockHash,

    /// Vote pair is not in canonical order
    #[error("vote pair not in canonical order (vote_a.block_hash must sort first)")]
    NonCanonicalVoteOrder,

    /// Validator not found in the validator set
    #[error("validator {} not found in validator set", hex::encode(.0))]
    ValidatorNotFound(Address),

    /// Evidence carries a zero total voting power
    #[error("total voting power must be positive")]
    ZeroTotalVotingPower,

    /// Common height is outside the valid range for the conflicting block
    #[error("invalid common height {common}: conflicting block is at height {conflicting}")]
    InvalidCommonHeight {
        /// Claimed common height
        common: u64,
        /// Height of the conflicting block
        conflicting: u64,
    },

    /// Conflicting block carries an empty validator set
    #[error("conflicting block has an empty validator set")]
    EmptyValidatorSet,

    /// Commit does not belong to the header it is attached to
    #[error("commit does not match the conflicting header (height or block hash differ)")]
    CommitHeaderMismatch,

    /// Commit records no signers
    #[error("commit records no signers")]
    EmptyCommit,
}

/// Proof that a validator signed two different blocks at the same
/// height/round/vote type.
///
/// The vote pair is canonically ordered: `vote_a.block_hash` sorts before
/// `vote_b.block_hash`, so the same equivocation always hashes identically
/// no matter which vote was seen first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateVoteEvidence {
    /// First conflicting vote (lower block hash)
    pub vote_a: Vote,
    /// Second conflicting vote (higher block hash)
    pub vote_b: Vote,
    /// Total voting power of the validator set at the offense height
    pub total_voting_power: u64,
    /// Voting power of the equivocating validator
    pub validator_power: u64,
    /// Time of the block at the offense height, Unix milliseconds
    pub timestamp: u64,
}

impl DuplicateVoteEvidence {
    /// Build evidence from two conflicting votes.
    ///
    /// Orders the pair canonically, resolves the validator's power from the
    /// set active at the offense height, and stamps the block time. The block
    /// time MUST come from committed block metadata, never the wall clock,
    /// so every replica derives identical evidence.
    pub fn new(
        vote_a: Vote,
        vote_b: Vote,
        block_time: u64,
        validators: &ValidatorSet,
    ) -> Result<Self, EvidenceError> {
        check_vote_pair(&vote_a, &vote_b)?;

        let validator = validators
            .get_by_address(&vote_a.validator_address)
            .ok_or(EvidenceError::ValidatorNotFound(vote_a.validator_address))?;

        let (vote_a, vote_b) = if vote_a.block_hash <= vote_b.block_hash {
            (vote_a, vote_b)
        } else {
            (vote_b, vote_a)
        };

        Ok(Self {
            total_voting_power: validators.total_power(),
            validator_power: validator.power,
            vote_a,
            vote_b,
            timestamp: block_time,
        })
    }

    /// Structural validation: a well-formed, canonically ordered vote pair.
    pub fn validate_basic(&self) -> Result<(), EvidenceError> {
        check_vote_pair(&self.vote_a, &self.vote_b)?;
        if self.vote_a.block_hash > self.vote_b.block_hash {
            return Err(EvidenceError::NonCanonicalVoteOrder);
        }
        if self.total_voting_power == 0 {
            return Err(EvidenceError::ZeroTotalVotingPower);
        }
        Ok(())
    }

    /// Height at which the equivocation happened.
    pub fn height(&self) -> u64 {
        self.vote_a.height
    }

    /// Address of the equivocating validator.
    pub fn validator_address(&self) -> Address {
        self.vote_a.validator_address
    }
}

/// The two votes must target different blocks from the same validator at the
/// same consensus position.
fn check_vote_pair(vote_a: &Vote, vote_b: &Vote) -> Result<(), EvidenceError> {
    if vote_a.validator_address != vote_b.validator_address {
        return Err(EvidenceError::DifferentValidators(
            vote_a.validator_address,
            vote_b.validator_address,
        ));
    }
    if vote_a.height != vote_b.height {
        return Err(EvidenceError::DifferentHeights(vote_a.height, vote_b.height));
    }
    if vote_a.round != vote_b.round {
        return Err(EvidenceError::DifferentRounds(vote_a.round, vote_b.round));
    }
    if vote_a.vote_type != vote_b.vote_type {
        return Err(EvidenceError::DifferentVoteTypes(
            vote_a.vote_type,
            vote_b.vote_type,
        ));
    }
    if vote_a.block_hash == vote_b.block_hash {
        return Err(EvidenceError::SameBlockHash);
    }
    Ok(())
}

/// Proof that validators signed a forged header diverging from the canonical
/// chain at (or after) `common_height`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightClientAttackEvidence {
    /// The forged block presented to the light client
    pub conflicting_block: LightBlock,
    /// Last height at which the forged chain agreed with the canonical one
    pub common_height: u64,
    /// Validators that signed the forged header; input to slashing
    pub byzantine_validators: Vec<Validator>,
    /// Total voting power of the validator set at `common_height`
    pub total_voting_power: u64,
    /// Time of the canonical block at `common_height`, Unix milliseconds
    pub timestamp: u64,
}

impl LightClientAttackEvidence {
    /// Reported offense height. This is the common height, not the height of
    /// the conflicting block: expiry and validator-set lookups key off the
    /// last honest state.
    pub fn height(&self) -> u64 {
        self.common_height
    }

    /// Identity of the attack.
    ///
    /// Binds BOTH the conflicting header and the common height: two attacks
    /// sharing a forged header but claiming different divergence points are
    /// distinct offenses and must hash differently.
    pub fn hash(&self) -> Hash {
        keccak256_attack_id(
            &self.conflicting_block.signed_header.header.hash(),
            self.common_height,
        )
    }

    /// Structural validation of the attack shape.
    pub fn validate_basic(&self) -> Result<(), EvidenceError> {
        let header = &self.conflicting_block.signed_header.header;
        let commit = &self.conflicting_block.signed_header.commit;

        if self.common_height == 0 || self.common_height > header.height {
            return Err(EvidenceError::InvalidCommonHeight {
                common: self.common_height,
                conflicting: header.height,
            });
        }
        if self.conflicting_block.validator_set.is_empty() {
            return Err(EvidenceError::EmptyValidatorSet);
        }
        if commit.height != header.height || commit.block_hash != header.hash() {
            return Err(EvidenceError::CommitHeaderMismatch);
        }
        if commit.signer_indices().is_empty() {
            return Err(EvidenceError::EmptyCommit);
        }
        if self.total_voting_power == 0 {
            return Err(EvidenceError::ZeroTotalVotingPower);
        }
        Ok(())
    }
}

fn keccak256_attack_id(header_hash: &Hash, common_height: u64) -> Hash {
    tessera_crypto::keccak256_concat(&[header_hash, &common_height.to_be_bytes()])
}

/// A provable act of validator misbehavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Evidence {
    /// Two conflicting votes by one validator at the same consensus position
    DuplicateVote(DuplicateVoteEvidence),
    /// A forged header presented to a light client
    LightClientAttack(LightClientAttackEvidence),
}

impl Evidence {
    /// Height at which the misbehavior occurred. For light-client attacks
    /// this is the common height.
    pub fn height(&self) -> u64 {
        match self {
            Evidence::DuplicateVote(ev) => ev.height(),
            Evidence::LightClientAttack(ev) => ev.height(),
        }
    }

    /// Time of the block under which the misbehavior occurred, Unix
    /// milliseconds. Deterministic across replicas.
    pub fn time(&self) -> u64 {
        match self {
            Evidence::DuplicateVote(ev) => ev.timestamp,
            Evidence::LightClientAttack(ev) => ev.timestamp,
        }
    }

    /// Canonical serialized form.
    pub fn bytes(&self) -> Vec<u8> {
        // In-memory evidence always encodes; failure is a programmer error.
        bincode::serialize(self).expect("evidence encoding is infallible")
    }

    /// Identity of the evidence, stable across serialization round-trips.
    pub fn hash(&self) -> Hash {
        match self {
            Evidence::DuplicateVote(_) => keccak256(&self.bytes()),
            Evidence::LightClientAttack(ev) => ev.hash(),
        }
    }

    /// Structural validation of the evidence.
    pub fn validate_basic(&self) -> Result<(), EvidenceError> {
        match self {
            Evidence::DuplicateVote(ev) => ev.validate_basic(),
            Evidence::LightClientAttack(ev) => ev.validate_basic(),
        }
    }
}

impl std::fmt::Display for Evidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Evidence::DuplicateVote(ev) => write!(
                f,
                "DuplicateVoteEvidence{{validator: {}, height: {}, round: {}}}",
                hex::encode(ev.validator_address()),
                ev.height(),
                ev.vote_a.round,
            ),
            Evidence::LightClientAttack(ev) => write!(
                f,
                "LightClientAttackEvidence{{common_height: {}, conflicting_height: {}, byzantine: {}}}",
                ev.common_height,
                ev.conflicting_block.height(),
                ev.byzantine_validators.len(),
            ),
        }
    }
}

/// The evidence included in a block, in proposal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EvidenceList(pub Vec<Evidence>);

impl EvidenceList {
    /// Hash of the list, bound into block headers.
    pub fn hash(&self) -> Hash {
        let mut hasher = Hasher::new();
        for ev in &self.0 {
            hasher.update(&ev.hash());
        }
        hasher.finalize()
    }

    /// Check whether the list contains evidence with the same identity.
    pub fn has(&self, evidence: &Evidence) -> bool {
        let hash = evidence.hash();
        self.0.iter().any(|ev| ev.hash() == hash)
    }

    /// Number of evidence items.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the evidence items.
    pub fn iter(&self) -> std::slice::Iter<'_, Evidence> {
        self.0.iter()
    }
}

impl From<Vec<Evidence>> for EvidenceList {
    fn from(evidence: Vec<Evidence>) -> Self {
        Self(evidence)
    }
}

impl<'a> IntoIterator for &'a EvidenceList {
    type Item = &'a Evidence;
    type IntoIter = std::slice::Iter<'a, Evidence>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
