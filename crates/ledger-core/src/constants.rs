pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// Placeholder used for the genesis previous hash and for an empty Merkle root.
pub const ZERO_HASH: &str = "0";

pub const DEFAULT_DIFFICULTY: usize = 2;
pub const DEFAULT_SEAL_THRESHOLD: usize = 5;
pub const DEFAULT_MAX_MINING_ATTEMPTS: u64 = 50_000_000;
pub const DEFAULT_ISSUER: &str = "document-integrity-ledger";

pub const COMPLIANT_SCORE: f64 = 95.0;
pub const VALID_SCORE: f64 = 80.0;

pub const CERTIFICATE_VALIDITY_MONTHS: u32 = 12;
pub const COMPLIANCE_CHECKS: [&str; 5] = [
    "Document hash integrity verified",
    "Validator signatures verified",
    "Chronological audit trail intact",
    "Merkle inclusion in sealed blocks",
    "Ledger chain continuity confirmed",
];
