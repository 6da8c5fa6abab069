use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DIFFICULTY, DEFAULT_ISSUER, DEFAULT_MAX_MINING_ATTEMPTS, DEFAULT_SEAL_THRESHOLD,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Leading hex zeros required in every block hash.
    pub difficulty: usize,
    /// Pending transactions that trigger a seal.
    pub seal_threshold: usize,
    /// Nonces tried before a seal fails with `MiningTimeout`.
    pub max_mining_attempts: u64,
    /// Search nonces on the rayon pool instead of the calling thread.
    pub parallel_mining: bool,
    /// Name bound into issued certificates.
    pub issuer: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            seal_threshold: DEFAULT_SEAL_THRESHOLD,
            max_mining_attempts: DEFAULT_MAX_MINING_ATTEMPTS,
            parallel_mining: false,
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }
}
