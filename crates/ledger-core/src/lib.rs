//! Append-only, hash-chained ledger recording every action taken on a loan
//! document, with re-verification, audit and attestation on top.
//!
//! ```text
//! Transaction::new ──▶ pending queue ──▶ miner ──▶ sealed blocks
//!                                                     │
//!                     verify / audit / certificate / stats (read-only)
//! ```

pub mod audit;
pub mod block;
pub mod canonical;
pub mod certificate;
pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod merkle;
pub mod mine;
pub mod pow;
pub mod stats;
pub mod transaction;
pub mod verify;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sha2::{Digest, Sha256};

pub use audit::{AuditResult, Issue, IssueKind, Severity};
pub use block::Block;
pub use certificate::DocumentCertificate;
pub use chain::{ChainStore, MemoryStore};
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use ledger::{Ledger, TransactionProof};
pub use merkle::{merkle_root, MerkleProof, MerkleTree};
pub use stats::{BlockchainStats, NetworkHealth};
pub use transaction::{Action, Metadata, Transaction};
pub use verify::{ComplianceStatus, DocumentVerification, HistoryEntry};

pub type Hash = [u8; 32];

/// SHA-256 over the concatenation of `parts`, as lowercase hex.
pub fn sha256_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

/// Current time truncated to millisecond precision, the resolution every
/// stored timestamp is hashed at.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// RFC 3339 rendering with exactly three fractional digits and a `Z` suffix.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
