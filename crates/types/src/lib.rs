//! # Tessera Types
//!
//! Core consensus data structures shared across the Tessera node:
//!
//! - [`Validator`] and [`ValidatorSet`] - validator identity and voting power
//! - [`Vote`] - prevote/precommit messages with domain-separated signing
//! - [`Header`], [`Commit`], [`SignedHeader`], [`LightBlock`] - block metadata
//!   as seen by light clients and the evidence subsystem
//! - [`Evidence`] - proofs of validator misbehavior (duplicate votes and
//!   light-client attacks)
//! - [`ConsensusParams`] and [`ChainState`] - the consensus view the evidence
//!   pool validates against

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod evidence;
pub mod header;
pub mod params;
pub mod state;
pub mod validator;
pub mod vote;

pub use evidence::{
    DuplicateVoteEvidence, Evidence, EvidenceError, EvidenceList, LightClientAttackEvidence,
};
pub use header::{BlockMeta, Commit, Header, LightBlock, SignedHeader};
pub use params::{ConsensusParams, EvidenceParams};
pub use state::ChainState;
pub use validator::{Address, Validator, ValidatorSet};
pub use vote::{Vote, VoteType, NIL_HASH};

/// A 32-byte hash, shared with the crypto crate.
pub type Hash = tessera_crypto::Hash;
