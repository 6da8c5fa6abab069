//! Full-ledger audit: re-verifies every block and transaction and checks the
//! links between consecutive blocks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::block::Block;
use crate::now_millis;
use crate::verify::{
    percentage, verify_block_hash, verify_merkle_root, verify_transaction, ComplianceStatus,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    BlockHashMismatch,
    MerkleRootMismatch,
    ChainContinuityBreak,
    TransactionVerificationFailed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub severity: Severity,
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_index: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    pub audited_at: DateTime<Utc>,
    pub total_blocks: usize,
    pub total_transactions: usize,
    pub total_checks: usize,
    pub passed_integrity_checks: usize,
    pub compliant_transaction_checks: usize,
    pub overall_score: f64,
    pub compliance_status: ComplianceStatus,
    pub issues: Vec<Issue>,
    pub recommendations: Vec<String>,
}

impl AuditResult {
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Default)]
struct Tally {
    total: usize,
    integrity_passed: usize,
    transactions_passed: usize,
    issues: Vec<Issue>,
}

impl Tally {
    fn integrity(&mut self, passed: bool, issue: impl FnOnce() -> Issue) {
        self.total += 1;
        if passed {
            self.integrity_passed += 1;
        } else {
            self.issues.push(issue());
        }
    }
}

pub fn audit_blocks(blocks: &[Block], difficulty: usize) -> AuditResult {
    let mut tally = Tally::default();
    let mut total_transactions = 0;

    for (position, block) in blocks.iter().enumerate() {
        tally.integrity(verify_block_hash(block, difficulty), || Issue {
            severity: Severity::Critical,
            kind: IssueKind::BlockHashMismatch,
            description: format!(
                "block {} hash does not match its contents or misses the difficulty target",
                block.index
            ),
            block_index: Some(block.index),
            transaction_id: None,
        });

        tally.integrity(verify_merkle_root(block), || Issue {
            severity: Severity::Critical,
            kind: IssueKind::MerkleRootMismatch,
            description: format!("block {} merkle root does not match its transactions", block.index),
            block_index: Some(block.index),
            transaction_id: None,
        });

        if let Some(parent) = position.checked_sub(1).map(|p| &blocks[p]) {
            let linked =
                block.previous_hash == parent.hash && block.index == parent.index + 1;
            tally.integrity(linked, || Issue {
                severity: Severity::Critical,
                kind: IssueKind::ChainContinuityBreak,
                description: format!(
                    "block {} does not link to block {}",
                    block.index, parent.index
                ),
                block_index: Some(block.index),
                transaction_id: None,
            });
        }

        for tx in &block.transactions {
            total_transactions += 1;
            tally.total += 1;
            if verify_transaction(tx, Some(block)) {
                tally.transactions_passed += 1;
            } else {
                tally.issues.push(Issue {
                    severity: Severity::High,
                    kind: IssueKind::TransactionVerificationFailed,
                    description: format!(
                        "transaction {} ({} on document {}) failed hash/signature verification",
                        tx.id, tx.action, tx.document_id
                    ),
                    block_index: Some(block.index),
                    transaction_id: Some(tx.id),
                });
            }
        }
    }

    let overall_score = percentage(
        tally.integrity_passed + tally.transactions_passed,
        tally.total,
        100.0,
    );
    let recommendations = recommendations(&tally.issues);

    AuditResult {
        audited_at: now_millis(),
        total_blocks: blocks.len(),
        total_transactions,
        total_checks: tally.total,
        passed_integrity_checks: tally.integrity_passed,
        compliant_transaction_checks: tally.transactions_passed,
        overall_score,
        compliance_status: ComplianceStatus::from_score(overall_score),
        issues: tally.issues,
        recommendations,
    }
}

fn recommendations(issues: &[Issue]) -> Vec<String> {
    let critical = issues.iter().any(|i| i.severity == Severity::Critical);
    let flagged: Vec<String> = issues
        .iter()
        .filter(|i| i.severity == Severity::High)
        .filter_map(|i| i.transaction_id.map(|id| id.to_string()))
        .collect();

    let mut out = Vec::new();
    if critical {
        out.push("Immediate remediation required: chain integrity is compromised".to_string());
        out.push("Restore the affected blocks from the most recent verified backup".to_string());
    }
    if !flagged.is_empty() {
        out.push(format!(
            "Review the flagged transactions for tampering: {}",
            flagged.join(", ")
        ));
    }
    if out.is_empty() {
        out.push("No issues found; maintain the current audit cadence".to_string());
    }
    out
}
