//! Shared fixtures for evidence pool tests: a three-validator chain with
//! deterministic keys, block times, and in-memory state/block stores.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::RwLock;
use tessera_crypto::bls::{BlsPrivateKey, BlsSignature};
use tessera_evidence::{BlockStore, StateStore, StateStoreError};
use tessera_types::{
    BlockMeta, ChainState, Commit, ConsensusParams, DuplicateVoteEvidence, Evidence, Header,
    LightBlock, LightClientAttackEvidence, SignedHeader, Validator, ValidatorSet, Vote, VoteType,
};

pub const CHAIN_ID: &str = "tessera-test";
pub const BASE_TIME: u64 = 1_700_000_000_000;

/// Canonical block time for a height: one second per block.
pub fn block_time(height: u64) -> u64 {
    BASE_TIME + height * 1_000
}

/// Three validators with 10 power each (30 total), deterministic keys.
pub fn test_validators() -> (Vec<BlsPrivateKey>, ValidatorSet) {
    let keys: Vec<_> = (1..=3u8)
        .map(|i| BlsPrivateKey::from_seed(&[i; 32]).unwrap())
        .collect();
    let validators = ValidatorSet::new(
        keys.iter()
            .enumerate()
            .map(|(i, k)| Validator::new([(i + 1) as u8; 20], k.public_key(), 10))
            .collect(),
    );
    (keys, validators)
}

/// The canonical header at a height, as the block store would serve it.
pub fn canonical_header(height: u64, validators: &ValidatorSet) -> Header {
    Header {
        chain_id: CHAIN_ID.to_string(),
        height,
        time: block_time(height),
        parent_hash: [0xCC; 32],
        state_root: [0xDD; 32],
        validators_hash: validators.hash(),
        proposer: [1u8; 20],
    }
}

/// Chain state after committing `height`, with default evidence params.
pub fn make_state(height: u64, validators: &ValidatorSet) -> ChainState {
    ChainState {
        chain_id: CHAIN_ID.to_string(),
        last_block_height: height,
        last_block_time: block_time(height),
        last_validators: validators.clone(),
        consensus_params: ConsensusParams::default(),
    }
}

/// State store serving one validator set at every height.
pub struct MockStateStore {
    pub state: RwLock<ChainState>,
    pub validators: ValidatorSet,
}

impl MockStateStore {
    pub fn new(state: ChainState, validators: ValidatorSet) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(state),
            validators,
        })
    }
}

impl StateStore for MockStateStore {
    fn load(&self) -> Result<ChainState, StateStoreError> {
        Ok(self.state.read().clone())
    }

    fn load_validators(&self, height: u64) -> Result<ValidatorSet, StateStoreError> {
        if height == 0 {
            return Err(StateStoreError::ValidatorsNotFound(height));
        }
        Ok(self.validators.clone())
    }
}

/// Block store serving canonical headers for heights `1..=max_height`.
pub struct MockBlockStore {
    pub validators: ValidatorSet,
    pub max_height: RwLock<u64>,
}

impl MockBlockStore {
    pub fn new(validators: ValidatorSet, max_height: u64) -> Arc<Self> {
        Arc::new(Self {
            validators,
            max_height: RwLock::new(max_height),
        })
    }
}

impl BlockStore for MockBlockStore {
    fn load_block_meta(&self, height: u64) -> Option<BlockMeta> {
        if height == 0 || height > *self.max_height.read() {
            return None;
        }
        Some(BlockMeta::new(canonical_header(height, &self.validators)))
    }
}

/// A vote signed by the given key.
pub fn signed_vote(
    key: &BlsPrivateKey,
    vote_type: VoteType,
    height: u64,
    round: u64,
    block_hash: [u8; 32],
    address: [u8; 20],
) -> Vote {
    let mut vote = Vote::new(vote_type, height, round, block_hash, address);
    vote.signature = key.sign_with_domain(&vote.signing_bytes(), &vote.domain(CHAIN_ID));
    vote
}

/// Fully signed duplicate-vote evidence by validator `val_index` at `height`.
///
/// `salt` varies the conflicting block hashes so evidence at the same height
/// stays distinct. Must be >= 1 so neither vote is nil.
pub fn duplicate_vote_evidence(
    keys: &[BlsPrivateKey],
    validators: &ValidatorSet,
    val_index: usize,
    height: u64,
    salt: u8,
) -> Evidence {
    assert!(salt >= 1, "salt 0 would produce a nil vote");
    let address = validators.validators()[val_index].address;
    let key = &keys[val_index];

    let vote_a = signed_vote(
        key,
        VoteType::Precommit,
        height,
        0,
        [salt; 32],
        address,
    );
    let vote_b = signed_vote(
        key,
        VoteType::Precommit,
        height,
        0,
        [salt.wrapping_add(1); 32],
        address,
    );

    Evidence::DuplicateVote(
        DuplicateVoteEvidence::new(vote_a, vote_b, block_time(height), validators).unwrap(),
    )
}

/// A forged light block at `conflicting_height`, committed by the listed
/// signer indices.
pub fn forged_light_block(
    keys: &[BlsPrivateKey],
    validators: &ValidatorSet,
    conflicting_height: u64,
    signer_indices: &[usize],
) -> LightBlock {
    let mut header = canonical_header(conflicting_height, validators);
    // A different state root makes this a forgery of the canonical block
    header.state_root = [0xEE; 32];

    let mut commit = Commit::new(
        conflicting_height,
        header.hash(),
        BlsSignature::default(),
        signer_bitmap(signer_indices),
    );
    let domain = Commit::domain(CHAIN_ID);
    let sigs: Vec<_> = signer_indices
        .iter()
        .map(|&i| keys[i].sign_with_domain(&commit.signing_bytes(), &domain))
        .collect();
    let sig_refs: Vec<_> = sigs.iter().collect();
    commit.signature = BlsSignature::aggregate(&sig_refs).unwrap();

    LightBlock {
        signed_header: SignedHeader { header, commit },
        validator_set: validators.clone(),
    }
}

/// Fully signed light-client attack evidence diverging after `common_height`.
pub fn light_client_attack_evidence(
    keys: &[BlsPrivateKey],
    validators: &ValidatorSet,
    common_height: u64,
    conflicting_height: u64,
) -> Evidence {
    let signer_indices: Vec<usize> = (0..keys.len()).collect();
    Evidence::LightClientAttack(LightClientAttackEvidence {
        conflicting_block: forged_light_block(
            keys,
            validators,
            conflicting_height,
            &signer_indices,
        ),
        common_height,
        byzantine_validators: validators.validators().to_vec(),
        total_voting_power: validators.total_power(),
        timestamp: block_time(common_height),
    })
}

fn signer_bitmap(indices: &[usize]) -> Vec<u8> {
    let max = indices.iter().copied().max().unwrap_or(0);
    let mut bitmap = vec![0u8; max / 8 + 1];
    for &i in indices {
        bitmap[i / 8] |= 1 << (i % 8);
    }
    bitmap
}
