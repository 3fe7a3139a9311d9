//! Verification tests: evidence against historical consensus state.

mod common;

use common::*;
use tessera_evidence::{verify_evidence, VerificationError};
use tessera_types::{Evidence, Validator, VoteType};

fn fixture(last_height: u64) -> (
    Vec<tessera_crypto::bls::BlsPrivateKey>,
    tessera_types::ValidatorSet,
    tessera_types::ChainState,
    std::sync::Arc<MockStateStore>,
    std::sync::Arc<MockBlockStore>,
) {
    let (keys, validators) = test_validators();
    let state = make_state(last_height, &validators);
    let state_store = MockStateStore::new(state.clone(), validators.clone());
    let block_store = MockBlockStore::new(validators.clone(), last_height);
    (keys, validators, state, state_store, block_store)
}

#[test]
fn test_valid_duplicate_vote_passes() {
    let (keys, validators, state, state_store, block_store) = fixture(10);
    let ev = duplicate_vote_evidence(&keys, &validators, 0, 5, 1);

    verify_evidence(&ev, &state, state_store.as_ref(), block_store.as_ref()).unwrap();
}

#[test]
fn test_expired_evidence_rejected() {
    let (keys, validators, mut state, state_store, block_store) = fixture(10);
    state.consensus_params.evidence.max_age_num_blocks = 3;
    state.consensus_params.evidence.max_age_duration = 2_000;

    // Height age 5 > 3 and time age 5s > 2s: both windows exceeded
    let ev = duplicate_vote_evidence(&keys, &validators, 0, 5, 1);
    assert!(matches!(
        verify_evidence(&ev, &state, state_store.as_ref(), block_store.as_ref()),
        Err(VerificationError::Expired { .. })
    ));
}

#[test]
fn test_old_but_recent_in_time_is_not_expired() {
    let (keys, validators, mut state, state_store, block_store) = fixture(10);
    // Height window exceeded, time window not: expiry needs both
    state.consensus_params.evidence.max_age_num_blocks = 3;
    state.consensus_params.evidence.max_age_duration = 60_000;

    let ev = duplicate_vote_evidence(&keys, &validators, 0, 5, 1);
    verify_evidence(&ev, &state, state_store.as_ref(), block_store.as_ref()).unwrap();
}

#[test]
fn test_validator_set_unavailable() {
    let (keys, validators, state, state_store, block_store) = fixture(10);
    // The mock state store has no validators at height 0; force that lookup
    // by crafting votes at height 0
    let mut ev = duplicate_vote_evidence(&keys, &validators, 0, 5, 1);
    if let Evidence::DuplicateVote(dve) = &mut ev {
        dve.vote_a.height = 0;
        dve.vote_b.height = 0;
    }

    assert!(matches!(
        verify_evidence(&ev, &state, state_store.as_ref(), block_store.as_ref()),
        Err(VerificationError::ValidatorSetUnavailable { height: 0, .. })
    ));
}

#[test]
fn test_total_voting_power_mismatch() {
    let (keys, validators, state, state_store, block_store) = fixture(10);
    let mut ev = duplicate_vote_evidence(&keys, &validators, 0, 5, 1);
    if let Evidence::DuplicateVote(dve) = &mut ev {
        dve.total_voting_power = 99;
    }

    assert!(matches!(
        verify_evidence(&ev, &state, state_store.as_ref(), block_store.as_ref()),
        Err(VerificationError::TotalVotingPowerMismatch {
            evidence: 99,
            actual: 30
        })
    ));
}

#[test]
fn test_validator_power_mismatch() {
    let (keys, validators, state, state_store, block_store) = fixture(10);
    let mut ev = duplicate_vote_evidence(&keys, &validators, 0, 5, 1);
    if let Evidence::DuplicateVote(dve) = &mut ev {
        dve.validator_power = 7;
    }

    assert!(matches!(
        verify_evidence(&ev, &state, state_store.as_ref(), block_store.as_ref()),
        Err(VerificationError::ValidatorPowerMismatch {
            evidence: 7,
            actual: 10
        })
    ));
}

#[test]
fn test_unknown_validator_rejected() {
    let (keys, validators, state, state_store, block_store) = fixture(10);

    // Votes signed by a key whose address is not in the set
    let outsider = tessera_crypto::bls::BlsPrivateKey::from_seed(&[9u8; 32]).unwrap();
    let vote_a = signed_vote(&outsider, VoteType::Precommit, 5, 0, [1u8; 32], [9u8; 20]);
    let vote_b = signed_vote(&outsider, VoteType::Precommit, 5, 0, [2u8; 32], [9u8; 20]);
    let mut base = duplicate_vote_evidence(&keys, &validators, 0, 5, 1);
    if let Evidence::DuplicateVote(dve) = &mut base {
        dve.vote_a = vote_a;
        dve.vote_b = vote_b;
    }

    assert!(matches!(
        verify_evidence(&base, &state, state_store.as_ref(), block_store.as_ref()),
        Err(VerificationError::ValidatorNotInSet { .. })
    ));
}

#[test]
fn test_bad_vote_signature_rejected() {
    let (keys, validators, state, state_store, block_store) = fixture(10);
    let mut ev = duplicate_vote_evidence(&keys, &validators, 0, 5, 1);
    if let Evidence::DuplicateVote(dve) = &mut ev {
        // Re-sign vote_b with a different validator's key
        dve.vote_b.signature = keys[1].sign_with_domain(
            &dve.vote_b.signing_bytes(),
            &dve.vote_b.domain(CHAIN_ID),
        );
    }

    assert!(matches!(
        verify_evidence(&ev, &state, state_store.as_ref(), block_store.as_ref()),
        Err(VerificationError::InvalidVoteSignature { which: 'b' })
    ));
}

#[test]
fn test_timestamp_mismatch_rejected() {
    let (keys, validators, state, state_store, block_store) = fixture(10);
    let mut ev = duplicate_vote_evidence(&keys, &validators, 0, 5, 1);
    if let Evidence::DuplicateVote(dve) = &mut ev {
        dve.timestamp += 1;
    }

    assert!(matches!(
        verify_evidence(&ev, &state, state_store.as_ref(), block_store.as_ref()),
        Err(VerificationError::TimestampMismatch { .. })
    ));
}

#[test]
fn test_block_meta_unavailable() {
    let (keys, validators, state, state_store, _) = fixture(10);
    // A block store that has no metadata at the offense height
    let empty_block_store = MockBlockStore::new(validators.clone(), 0);
    let ev = duplicate_vote_evidence(&keys, &validators, 0, 5, 1);

    assert!(matches!(
        verify_evidence(&ev, &state, state_store.as_ref(), empty_block_store.as_ref()),
        Err(VerificationError::BlockMetaUnavailable(5))
    ));
}

#[test]
fn test_structural_failure_surfaces() {
    let (keys, validators, state, state_store, block_store) = fixture(10);
    let mut ev = duplicate_vote_evidence(&keys, &validators, 0, 5, 1);
    if let Evidence::DuplicateVote(dve) = &mut ev {
        std::mem::swap(&mut dve.vote_a, &mut dve.vote_b);
    }

    assert!(matches!(
        verify_evidence(&ev, &state, state_store.as_ref(), block_store.as_ref()),
        Err(VerificationError::Structural(_))
    ));
}

#[test]
fn test_valid_light_client_attack_passes() {
    let (keys, validators, state, state_store, block_store) = fixture(10);
    let ev = light_client_attack_evidence(&keys, &validators, 4, 5);

    verify_evidence(&ev, &state, state_store.as_ref(), block_store.as_ref()).unwrap();
}

#[test]
fn test_canonical_block_is_not_an_attack() {
    let (keys, validators, state, state_store, block_store) = fixture(10);
    let mut ev = light_client_attack_evidence(&keys, &validators, 4, 5);
    if let Evidence::LightClientAttack(lcae) = &mut ev {
        // Present the canonical header itself as the "conflicting" block
        let header = canonical_header(5, &validators);
        lcae.conflicting_block.signed_header.commit.block_hash = header.hash();
        lcae.conflicting_block.signed_header.header = header;
    }

    assert!(matches!(
        verify_evidence(&ev, &state, state_store.as_ref(), block_store.as_ref()),
        Err(VerificationError::NotConflicting)
    ));
}

#[test]
fn test_attack_with_insufficient_power_rejected() {
    let (keys, validators, state, state_store, block_store) = fixture(10);
    // Only one of three validators signed the forged block: 10 of 30 power
    let light_block = forged_light_block(&keys, &validators, 5, &[0]);
    let ev = Evidence::LightClientAttack(tessera_types::LightClientAttackEvidence {
        conflicting_block: light_block,
        common_height: 4,
        byzantine_validators: vec![validators.validators()[0].clone()],
        total_voting_power: validators.total_power(),
        timestamp: block_time(4),
    });

    assert!(matches!(
        verify_evidence(&ev, &state, state_store.as_ref(), block_store.as_ref()),
        Err(VerificationError::InsufficientSigningPower {
            signed: 10,
            total: 30
        })
    ));
}

#[test]
fn test_attack_commit_signature_must_verify() {
    let (keys, validators, state, state_store, block_store) = fixture(10);
    let mut ev = light_client_attack_evidence(&keys, &validators, 4, 5);
    if let Evidence::LightClientAttack(lcae) = &mut ev {
        // Claim all three signed but aggregate only two signatures
        let commit = &mut lcae.conflicting_block.signed_header.commit;
        let domain = tessera_types::Commit::domain(CHAIN_ID);
        let sigs: Vec<_> = keys[..2]
            .iter()
            .map(|k| k.sign_with_domain(&commit.signing_bytes(), &domain))
            .collect();
        let sig_refs: Vec<_> = sigs.iter().collect();
        commit.signature =
            tessera_crypto::bls::BlsSignature::aggregate(&sig_refs).unwrap();
    }

    assert!(matches!(
        verify_evidence(&ev, &state, state_store.as_ref(), block_store.as_ref()),
        Err(VerificationError::InvalidCommitSignature)
    ));
}

#[test]
fn test_byzantine_validator_must_be_in_conflicting_set() {
    let (keys, validators, state, state_store, block_store) = fixture(10);
    let mut ev = light_client_attack_evidence(&keys, &validators, 4, 5);
    if let Evidence::LightClientAttack(lcae) = &mut ev {
        let outsider = tessera_crypto::bls::BlsPrivateKey::from_seed(&[8u8; 32]).unwrap();
        lcae.byzantine_validators
            .push(Validator::new([8u8; 20], outsider.public_key(), 10));
    }

    assert!(matches!(
        verify_evidence(&ev, &state, state_store.as_ref(), block_store.as_ref()),
        Err(VerificationError::ByzantineValidatorNotInSet(_))
    ));
}

#[test]
fn test_attack_common_height_above_conflicting_is_structural() {
    let (keys, validators, state, state_store, block_store) = fixture(10);
    let mut ev = light_client_attack_evidence(&keys, &validators, 4, 5);
    if let Evidence::LightClientAttack(lcae) = &mut ev {
        lcae.common_height = 6;
    }

    // common_height 6 > conflicting height 5 fails basic validation before
    // any store access
    assert!(matches!(
        verify_evidence(&ev, &state, state_store.as_ref(), block_store.as_ref()),
        Err(VerificationError::Structural(_))
    ));
}
