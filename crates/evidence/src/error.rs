//! Error types for the evidence pool.

use tessera_storage::StorageError;
use tessera_types::{Address, EvidenceError};
use thiserror::Error;

/// Errors surfaced by [`crate::StateStore`] implementations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateStoreError {
    /// The latest state could not be loaded
    #[error("state not available: {0}")]
    Unavailable(String),

    /// No validator set is stored at the requested height
    #[error("no validator set at height {0}")]
    ValidatorsNotFound(u64),
}

/// Reasons a piece of evidence fails verification.
///
/// Returned to callers wrapped in [`PoolError::Invalid`]; the gossip reactor
/// uses this to decide whether to penalize the peer that sent the evidence.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// Evidence is structurally malformed
    #[error(transparent)]
    Structural(#[from] EvidenceError),

    /// Evidence has aged out of both the height and time windows
    #[error(
        "evidence expired: from height {height}/time {time}, \
         last block at height {last_height}/time {last_time}"
    )]
    Expired {
        /// Height the evidence was created at
        height: u64,
        /// Evidence timestamp, Unix milliseconds
        time: u64,
        /// Latest committed height
        last_height: u64,
        /// Latest committed block time
        last_time: u64,
    },

    /// The validator set at the offense height could not be loaded
    #[error("cannot load validator set at height {height}: {source}")]
    ValidatorSetUnavailable {
        /// Offense height
        height: u64,
        /// Underlying state store failure
        source: StateStoreError,
    },

    /// No block metadata is available at the offense height
    #[error("no block metadata at height {0}")]
    BlockMetaUnavailable(u64),

    /// Evidence reports a total voting power different from the actual set
    #[error("evidence total voting power {evidence} does not match validator set total {actual}")]
    TotalVotingPowerMismatch {
        /// Power claimed by the evidence
        evidence: u64,
        /// Power of the actual set
        actual: u64,
    },

    /// Evidence timestamp differs from the block time at the offense height
    #[error("evidence timestamp {evidence} does not match block time {block}")]
    TimestampMismatch {
        /// Timestamp carried by the evidence
        evidence: u64,
        /// Time of the block at the offense height
        block: u64,
    },

    /// The accused validator is not an active member of the set
    #[error(
        "validator {} is not in the validator set at height {height}",
        hex::encode(.address)
    )]
    ValidatorNotInSet {
        /// Accused validator
        address: Address,
        /// Offense height
        height: u64,
    },

    /// Evidence reports a validator power different from the actual power
    #[error("evidence validator power {evidence} does not match actual power {actual}")]
    ValidatorPowerMismatch {
        /// Power claimed by the evidence
        evidence: u64,
        /// Actual power of the validator
        actual: u64,
    },

    /// A vote signature does not verify against the validator's key
    #[error("invalid signature on vote {which}")]
    InvalidVoteSignature {
        /// Which vote of the pair failed ('a' or 'b')
        which: char,
    },

    /// The conflicting block is the canonical block - there is no attack
    #[error("conflicting block matches the canonical chain - no attack")]
    NotConflicting,

    /// The conflicting block's commit signature does not verify
    #[error("commit signature verification failed for conflicting block")]
    InvalidCommitSignature,

    /// The conflicting block's signers hold too little voting power
    #[error("conflicting block signed by {signed} of {total} voting power, needs more than 2/3")]
    InsufficientSigningPower {
        /// Voting power of the recorded signers
        signed: u64,
        /// Total voting power claimed by the evidence
        total: u64,
    },

    /// A listed byzantine validator is not in the conflicting validator set
    #[error(
        "byzantine validator {} is not in the conflicting validator set",
        hex::encode(.0)
    )]
    ByzantineValidatorNotInSet(Address),
}

/// Errors returned by the pool's public surface.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Evidence failed structural, cryptographic, or consensus validation
    #[error("invalid evidence: {0}")]
    Invalid(#[from] VerificationError),

    /// Evidence was already committed in a block
    #[error("evidence was already committed")]
    AlreadyCommitted,

    /// The same evidence appears twice in one submitted list
    #[error("duplicate evidence in submitted list")]
    Duplicate,

    /// The latest chain state could not be loaded at open
    #[error("cannot load state: {0}")]
    StateLoad(#[source] StateStoreError),

    /// The evidence database failed
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    /// Evidence could not be serialized for persistence
    #[error("serialization failure: {0}")]
    Serialization(String),
}
