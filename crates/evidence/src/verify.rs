//! Evidence verification against historical consensus state.
//!
//! Verification is pure with respect to the pool: it reads the state store
//! and block store but mutates nothing. All temporal checks derive from
//! block metadata, never the wall clock, so every replica reaches the same
//! verdict on the same evidence.

use tessera_types::{ChainState, DuplicateVoteEvidence, Evidence, LightClientAttackEvidence};

use crate::error::VerificationError;
use crate::{BlockStore, StateStore};

/// Fully verify a piece of evidence against the current consensus view.
///
/// Checks, in order:
///
/// 1. structural validity ([`Evidence::validate_basic`]);
/// 2. the evidence has not expired under the evidence consensus parameters
///    (expiry requires BOTH the block-age and the time-age windows to be
///    exceeded);
/// 3. the validator set at the offense height is loadable and the evidence's
///    claimed total voting power matches it;
/// 4. the evidence timestamp equals the committed block time at the offense
///    height;
/// 5. variant-specific checks: vote signatures and membership for duplicate
///    votes, commit power accounting and byzantine membership for
///    light-client attacks.
pub fn verify_evidence(
    evidence: &Evidence,
    state: &ChainState,
    state_store: &dyn StateStore,
    block_store: &dyn BlockStore,
) -> Result<(), VerificationError> {
    evidence.validate_basic()?;

    let params = &state.consensus_params.evidence;
    let height = evidence.height();
    let time = evidence.time();

    let age_blocks = state.last_block_height.saturating_sub(height);
    let age_ms = state.last_block_time.saturating_sub(time);
    if age_blocks > params.max_age_num_blocks && age_ms > params.max_age_duration {
        return Err(VerificationError::Expired {
            height,
            time,
            last_height: state.last_block_height,
            last_time: state.last_block_time,
        });
    }

    let validators = state_store
        .load_validators(height)
        .map_err(|source| VerificationError::ValidatorSetUnavailable { height, source })?;

    let total_voting_power = match evidence {
        Evidence::DuplicateVote(ev) => ev.total_voting_power,
        Evidence::LightClientAttack(ev) => ev.total_voting_power,
    };
    if total_voting_power != validators.total_power() {
        return Err(VerificationError::TotalVotingPowerMismatch {
            evidence: total_voting_power,
            actual: validators.total_power(),
        });
    }

    let block_meta = block_store
        .load_block_meta(height)
        .ok_or(VerificationError::BlockMetaUnavailable(height))?;
    if time != block_meta.header.time {
        return Err(VerificationError::TimestampMismatch {
            evidence: time,
            block: block_meta.header.time,
        });
    }

    match evidence {
        Evidence::DuplicateVote(ev) => {
            verify_duplicate_vote(ev, &state.chain_id, &validators)
        }
        Evidence::LightClientAttack(ev) => {
            verify_light_client_attack(ev, &state.chain_id, block_store)
        }
    }
}

/// Variant checks for duplicate-vote evidence: the accused validator is an
/// active member, the claimed powers are honest, and both conflicting votes
/// carry real signatures from its key.
fn verify_duplicate_vote(
    evidence: &DuplicateVoteEvidence,
    chain_id: &str,
    validators: &tessera_types::ValidatorSet,
) -> Result<(), VerificationError> {
    let address = evidence.validator_address();
    let validator = validators
        .get_by_address(&address)
        .filter(|v| v.power > 0)
        .ok_or(VerificationError::ValidatorNotInSet {
            address,
            height: evidence.height(),
        })?;

    if evidence.validator_power != validator.power {
        return Err(VerificationError::ValidatorPowerMismatch {
            evidence: evidence.validator_power,
            actual: validator.power,
        });
    }

    if !evidence.vote_a.verify(chain_id, &validator.pubkey) {
        return Err(VerificationError::InvalidVoteSignature { which: 'a' });
    }
    if !evidence.vote_b.verify(chain_id, &validator.pubkey) {
        return Err(VerificationError::InvalidVoteSignature { which: 'b' });
    }

    Ok(())
}

/// Variant checks for light-client attack evidence.
///
/// The conflicting block must genuinely diverge from the canonical chain,
/// its commit must carry a verifying aggregate signature from signers worth
/// more than 2/3 of the claimed total voting power, and every validator
/// accused of the attack must actually sit in the conflicting validator set.
fn verify_light_client_attack(
    evidence: &LightClientAttackEvidence,
    chain_id: &str,
    block_store: &dyn BlockStore,
) -> Result<(), VerificationError> {
    let conflicting_header = &evidence.conflicting_block.signed_header.header;

    // A header identical to the one we committed at that height is not an
    // attack, no matter how well it is signed.
    if let Some(meta) = block_store.load_block_meta(conflicting_header.height) {
        if meta.header.hash() == conflicting_header.hash() {
            return Err(VerificationError::NotConflicting);
        }
    }

    let conflicting_validators = &evidence.conflicting_block.validator_set;
    let commit = &evidence.conflicting_block.signed_header.commit;

    if !commit.verify_signatures(chain_id, conflicting_validators) {
        return Err(VerificationError::InvalidCommitSignature);
    }

    let signed = commit.signed_power(conflicting_validators);
    if (signed as u128) * 3 <= (evidence.total_voting_power as u128) * 2 {
        return Err(VerificationError::InsufficientSigningPower {
            signed,
            total: evidence.total_voting_power,
        });
    }

    for byzantine in &evidence.byzantine_validators {
        if !conflicting_validators.has_address(&byzantine.address) {
            return Err(VerificationError::ByzantineValidatorNotInSet(
                byzantine.address,
            ));
        }
    }

    Ok(())
}
