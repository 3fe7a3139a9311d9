//! Chain-level consensus parameters.

use serde::{Deserialize, Serialize};

/// Parameters governing evidence handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceParams {
    /// Maximum age of evidence in blocks before it expires
    pub max_age_num_blocks: u64,
    /// Maximum age of evidence in milliseconds before it expires
    ///
    /// Evidence expires only when BOTH the block age and the time age are
    /// exceeded, so a chain halt cannot silently expire valid evidence.
    pub max_age_duration: u64,
    /// Maximum total size in bytes of evidence allowed in a single block
    pub max_bytes: i64,
}

impl Default for EvidenceParams {
    fn default() -> Self {
        Self {
            max_age_num_blocks: 100_000,
            // 48 hours
            max_age_duration: 48 * 60 * 60 * 1000,
            max_bytes: 1_048_576,
        }
    }
}

/// Chain-level consensus tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConsensusParams {
    /// Evidence handling parameters
    pub evidence: EvidenceParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = EvidenceParams::default();
        assert_eq!(params.max_age_num_blocks, 100_000);
        assert_eq!(params.max_age_duration, 172_800_000);
        assert_eq!(params.max_bytes, 1_048_576);
    }
}
