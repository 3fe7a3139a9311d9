//! The consensus state snapshot the evidence pool validates against.

use serde::{Deserialize, Serialize};

use crate::params::ConsensusParams;
use crate::validator::ValidatorSet;

/// Snapshot of the chain state after the latest committed block.
///
/// The evidence pool caches this and refreshes it on every `update`; all age
/// and validator-set checks are made against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChainState {
    /// Chain identifier, scoped into every signature
    pub chain_id: String,
    /// Height of the last committed block
    pub last_block_height: u64,
    /// Time of the last committed block, Unix milliseconds
    pub last_block_time: u64,
    /// Validator set that signed the last committed block
    pub last_validators: ValidatorSet,
    /// Consensus parameters in effect
    pub consensus_params: ConsensusParams,
}
