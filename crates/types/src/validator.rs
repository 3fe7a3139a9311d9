//! Validator identity and validator sets.

use serde::{Deserialize, Serialize};
use tessera_crypto::bls::BlsPublicKey;
use tessera_crypto::{Hash, Hasher};

/// A 20-byte validator address.
pub type Address = [u8; 20];

/// A validator eligible to sign consensus messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    /// Address the validator is identified by in votes and evidence
    pub address: Address,
    /// BLS public key for consensus signatures
    pub pubkey: BlsPublicKey,
    /// Voting power backing this validator
    pub power: u64,
}

impl Validator {
    /// Create a new validator.
    pub fn new(address: Address, pubkey: BlsPublicKey, power: u64) -> Self {
        Self {
            address,
            pubkey,
            power,
        }
    }

    /// Get the validator's address as a hex string.
    pub fn address_hex(&self) -> String {
        format!("0x{}", hex::encode(self.address))
    }
}

/// The set of validators active at a specific height.
///
/// Validator order is significant: commit signer bitmaps index into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ValidatorSet {
    /// Ordered list of validators
    validators: Vec<Validator>,
    /// Total voting power across all validators
    total_power: u64,
}

impl ValidatorSet {
    /// Create a validator set from a list of validators.
    pub fn new(validators: Vec<Validator>) -> Self {
        let total_power = validators.iter().map(|v| v.power).sum();
        Self {
            validators,
            total_power,
        }
    }

    /// Get the ordered validators.
    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// Get the total voting power of the set.
    pub fn total_power(&self) -> u64 {
        self.total_power
    }

    /// Get a validator by position in the set.
    pub fn get(&self, index: usize) -> Option<&Validator> {
        self.validators.get(index)
    }

    /// Look up a validator by address.
    pub fn get_by_address(&self, address: &Address) -> Option<&Validator> {
        self.validators.iter().find(|v| &v.address == address)
    }

    /// Check whether an address belongs to the set.
    pub fn has_address(&self, address: &Address) -> bool {
        self.get_by_address(address).is_some()
    }

    /// Number of validators in the set.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Deterministic hash of the set, bound into block headers.
    pub fn hash(&self) -> Hash {
        let mut hasher = Hasher::new();
        for v in &self.validators {
            hasher.update(&v.address);
            hasher.update(&v.pubkey.to_bytes());
            hasher.update(&v.power.to_le_bytes());
        }
        hasher.finalize()
    }
}
