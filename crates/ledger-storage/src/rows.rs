use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ledger_core::{Action, Block, Transaction};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct BlockRow {
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    pub previous_hash: String,
    pub hash: String,
    pub nonce: u64,
    pub merkle_root: String,
    pub transaction_count: u32,
}

impl BlockRow {
    pub fn from_block(block: &Block) -> Self {
        Self {
            index: block.index,
            timestamp: block.timestamp,
            previous_hash: block.previous_hash.clone(),
            hash: block.hash.clone(),
            nonce: block.nonce,
            merkle_root: block.merkle_root.clone(),
            transaction_count: block.transactions.len() as u32,
        }
    }

    pub fn into_block(self, transactions: Vec<Transaction>) -> Block {
        Block {
            index: self.index,
            timestamp: self.timestamp,
            transactions,
            previous_hash: self.previous_hash,
            nonce: self.nonce,
            merkle_root: self.merkle_root,
            hash: self.hash,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TransactionRow {
    pub id: String,
    /// `None` while the transaction is pending.
    pub block_index: Option<u64>,
    pub document_id: i64,
    pub loan_application_id: i64,
    pub action: Action,
    pub validator: String,
    pub timestamp: DateTime<Utc>,
    pub hash: String,
    pub previous_hash: String,
    pub metadata_json: String,
    pub signature: String,
}

impl TransactionRow {
    pub fn from_transaction(tx: &Transaction, block_index: Option<u64>) -> Result<Self> {
        Ok(Self {
            id: tx.id.to_string(),
            block_index,
            document_id: tx.document_id,
            loan_application_id: tx.loan_application_id,
            action: tx.action,
            validator: tx.validator.clone(),
            timestamp: tx.timestamp,
            hash: tx.hash.clone(),
            previous_hash: tx.previous_hash.clone(),
            metadata_json: serde_json::to_string(&tx.metadata)
                .context("encoding transaction metadata")?,
            signature: tx.signature.clone(),
        })
    }

    pub fn into_transaction(self) -> Result<Transaction> {
        Ok(Transaction {
            id: Uuid::parse_str(&self.id)
                .with_context(|| format!("bad transaction id `{}`", self.id))?,
            document_id: self.document_id,
            loan_application_id: self.loan_application_id,
            action: self.action,
            validator: self.validator,
            timestamp: self.timestamp,
            previous_hash: self.previous_hash,
            metadata: serde_json::from_str(&self.metadata_json)
                .with_context(|| format!("bad metadata for transaction {}", self.id))?,
            hash: self.hash,
            signature: self.signature,
        })
    }
}

pub(crate) fn position_key(index: u64, position: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(12);
    key.extend_from_slice(&index.to_be_bytes());
    key.extend_from_slice(&position.to_be_bytes());
    key
}
