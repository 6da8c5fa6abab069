//! Re-verification of stored transactions and blocks.
//!
//! Nothing here fails: a mismatch is reported as `false` or as a lowered
//! score, and callers decide what to do with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::block::Block;
use crate::constants::{COMPLIANT_SCORE, VALID_SCORE};
use crate::merkle::merkle_root;
use crate::pow::meets_difficulty;
use crate::transaction::{Action, Transaction};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
    PendingReview,
}

impl ComplianceStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= COMPLIANT_SCORE {
            ComplianceStatus::Compliant
        } else if score < VALID_SCORE {
            ComplianceStatus::NonCompliant
        } else {
            ComplianceStatus::PendingReview
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub transaction_id: Uuid,
    pub block_index: u64,
    pub timestamp: DateTime<Utc>,
    pub validator: String,
    pub action: Action,
    pub hash: String,
    pub verified: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentVerification {
    pub document_id: i64,
    pub is_valid: bool,
    pub integrity_score: f64,
    pub total_transactions: usize,
    pub verified_transactions: usize,
    pub compliance_status: ComplianceStatus,
    pub verification_history: Vec<HistoryEntry>,
}

/// Recompute hash and signature of `tx`. When the containing block is given,
/// the transaction must also have been created against that block's parent.
pub fn verify_transaction(tx: &Transaction, block: Option<&Block>) -> bool {
    if tx.compute_hash() != tx.hash || tx.compute_signature() != tx.signature {
        return false;
    }
    block.map_or(true, |b| b.previous_hash == tx.previous_hash)
}

/// Recompute the block hash from its stored fields and check the target.
pub fn verify_block_hash(block: &Block, difficulty: usize) -> bool {
    block.compute_hash() == block.hash && meets_difficulty(&block.hash, difficulty)
}

pub fn verify_merkle_root(block: &Block) -> bool {
    merkle_root(&block.transaction_hashes()) == block.merkle_root
}

pub fn verify_document(blocks: &[Block], document_id: i64) -> DocumentVerification {
    let verification_history: Vec<HistoryEntry> = blocks
        .iter()
        .flat_map(|block| block.transactions.iter().map(move |tx| (block, tx)))
        .filter(|(_, tx)| tx.document_id == document_id)
        .map(|(block, tx)| HistoryEntry {
            transaction_id: tx.id,
            block_index: block.index,
            timestamp: tx.timestamp,
            validator: tx.validator.clone(),
            action: tx.action,
            hash: tx.hash.clone(),
            verified: verify_transaction(tx, Some(block)),
        })
        .collect();

    let total_transactions = verification_history.len();
    let verified_transactions = verification_history.iter().filter(|e| e.verified).count();
    let integrity_score = percentage(verified_transactions, total_transactions, 0.0);

    DocumentVerification {
        document_id,
        is_valid: integrity_score >= VALID_SCORE,
        integrity_score,
        total_transactions,
        verified_transactions,
        compliance_status: ComplianceStatus::from_score(integrity_score),
        verification_history,
    }
}

/// `100 * part / whole`, or `empty` when `whole` is zero.
pub(crate) fn percentage(part: usize, whole: usize, empty: f64) -> f64 {
    if whole == 0 {
        empty
    } else {
        100.0 * part as f64 / whole as f64
    }
}
