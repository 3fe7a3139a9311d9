//! # Tessera Evidence Pool
//!
//! The evidence pool ingests, validates, persists, and prunes proofs of
//! validator misbehavior, and surfaces them for gossip and block proposal.
//!
//! Evidence reaches the pool three ways:
//!
//! 1. **Consensus**: the engine reports two conflicting votes via
//!    [`Pool::report_conflicting_votes`] the moment it sees them. The pair is
//!    buffered until the block for that height commits, because evidence
//!    timestamps must come from block time, and flushed into the pool inside
//!    [`Pool::update`].
//! 2. **Gossip / RPC**: peers submit serialized evidence via
//!    [`Pool::add_evidence`], which fully verifies it against historical
//!    state before persisting.
//! 3. **Block validation**: when validating a proposed block,
//!    [`Pool::check_evidence`] re-verifies the block's evidence list.
//!
//! Pending evidence lives both on disk (under the pending key prefix) and in
//! a concurrent in-memory list the gossip reactor walks. When evidence is
//! committed in a block, [`Pool::update`] moves it to the committed keyspace,
//! where a height marker is retained forever to stop re-proposals. Pending
//! evidence that outlives BOTH the block-age and time-age windows is pruned.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_evidence::{Pool, PoolOptions};
//!
//! let pool = Pool::open(evidence_db, state_store, block_store, PoolOptions::default())?;
//!
//! // Gossip path
//! pool.add_evidence(evidence)?;
//!
//! // Proposer path: fill the block's evidence budget
//! let (evidence, size) = pool.pending_evidence(max_bytes);
//!
//! // After every committed block
//! pool.update(new_state, &committed_evidence);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod clist;
pub mod error;
pub mod layout;
pub mod pool;
pub mod verify;

pub use clist::{ConcurrentList, Node};
pub use error::{PoolError, StateStoreError, VerificationError};
pub use layout::KeyLayout;
pub use pool::{Pool, PoolOptions};
pub use verify::verify_evidence;

use tessera_types::{BlockMeta, ChainState, ValidatorSet};

/// Source of consensus state and historical validator sets.
///
/// Implemented by the node's state store; the pool only reads from it.
pub trait StateStore: Send + Sync {
    /// Load the latest chain state.
    fn load(&self) -> Result<ChainState, StateStoreError>;

    /// Load the validator set at a historical height.
    ///
    /// Must be able to serve any height inside the evidence-age window.
    fn load_validators(&self, height: u64) -> Result<ValidatorSet, StateStoreError>;
}

/// Source of historical block metadata.
///
/// Implemented by the node's block store; the pool only reads from it.
/// Must serve at least the header time for any height at or below the latest
/// committed height.
pub trait BlockStore: Send + Sync {
    /// Load the block metadata at a height, if that block exists.
    fn load_block_meta(&self, height: u64) -> Option<BlockMeta>;
}
