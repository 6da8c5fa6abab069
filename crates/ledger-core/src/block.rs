use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::ZERO_HASH;
use crate::merkle::merkle_root;
use crate::transaction::Transaction;
use crate::{format_timestamp, now_millis, sha256_hex};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    /// Sealing time.
    pub timestamp: DateTime<Utc>,
    pub transactions: Vec<Transaction>,
    pub previous_hash: String,
    pub nonce: u64,
    pub merkle_root: String,
    pub hash: String,
}

impl Block {
    /// Unsealed block on top of `previous_hash`, nonce 0.
    pub fn candidate(index: u64, previous_hash: impl Into<String>, transactions: Vec<Transaction>) -> Self {
        Self::at(index, now_millis(), previous_hash.into(), transactions)
    }

    /// The unsealed genesis block: index 0, no transactions, `"0"` parent.
    pub fn genesis() -> Self {
        Self::at(0, now_millis(), ZERO_HASH.to_string(), vec![])
    }

    fn at(index: u64, timestamp: DateTime<Utc>, previous_hash: String, transactions: Vec<Transaction>) -> Self {
        let merkle_root = merkle_root(&transaction_hashes(&transactions));
        let mut block = Self {
            index,
            timestamp,
            transactions,
            previous_hash,
            nonce: 0,
            merkle_root,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Hashed bytes up to (not including) the nonce. Transactions contribute
    /// through their stored hashes.
    pub fn header_prefix(&self) -> Vec<u8> {
        let timestamp = format_timestamp(&self.timestamp);
        let mut bytes = Vec::with_capacity(
            8 + timestamp.len() + self.transactions.len() * 64 + self.previous_hash.len(),
        );
        bytes.extend_from_slice(&self.index.to_le_bytes());
        bytes.extend_from_slice(timestamp.as_bytes());
        for tx in &self.transactions {
            bytes.extend_from_slice(tx.hash.as_bytes());
        }
        bytes.extend_from_slice(self.previous_hash.as_bytes());
        bytes
    }

    pub fn hash_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header_prefix();
        bytes.extend_from_slice(&self.nonce.to_le_bytes());
        bytes
    }

    pub fn compute_hash(&self) -> String {
        hash_with_nonce(&self.header_prefix(), self.nonce)
    }

    pub fn transaction_hashes(&self) -> Vec<&str> {
        transaction_hashes(&self.transactions)
    }
}

pub(crate) fn hash_with_nonce(prefix: &[u8], nonce: u64) -> String {
    sha256_hex(&[prefix, &nonce.to_le_bytes()])
}

fn transaction_hashes(transactions: &[Transaction]) -> Vec<&str> {
    transactions.iter().map(|tx| tx.hash.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Action, Metadata};

    fn txs(n: usize) -> Vec<Transaction> {
        (0..n)
            .map(|i| {
                Transaction::new(42, 1, Action::Upload, format!("user-{i}"), Metadata::new(), "0")
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn genesis_block_example() {
        let genesis = Block::genesis();
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, "0");
        assert_eq!(genesis.merkle_root, "0");
        assert!(genesis.transactions.is_empty());
        assert_eq!(genesis.hash, genesis.compute_hash());
    }

    #[test]
    fn candidate_fills_merkle_root_and_hash() {
        let block = Block::candidate(1, "abc", txs(3));
        assert_eq!(block.merkle_root, merkle_root(&block.transaction_hashes()));
        assert_eq!(block.hash, block.compute_hash());
        assert_eq!(block.nonce, 0);
    }

    #[test]
    fn block_header_hash_bytes_example() {
        let block = Block::candidate(1, "ff", txs(2));
        let bytes = block.hash_bytes();
        let ts = format_timestamp(&block.timestamp);
        assert_eq!(bytes.len(), 8 + ts.len() + 2 * 64 + 2 + 8);
        assert_eq!(&bytes[0..8], &1u64.to_le_bytes());
        assert_eq!(&bytes[8..8 + ts.len()], ts.as_bytes());
        assert_eq!(&bytes[bytes.len() - 8..], &0u64.to_le_bytes());
        assert_eq!(sha256_hex(&[&bytes]), block.compute_hash());
    }

    #[test]
    fn block_hash_changes_with_nonce() {
        let mut block = Block::candidate(1, "0", txs(1));
        let before = block.compute_hash();
        block.nonce += 1;
        assert_ne!(before, block.compute_hash());
    }

    #[test]
    fn block_hash_ignores_transaction_content_but_not_stored_hash() {
        let mut block = Block::candidate(1, "0", txs(2));
        let before = block.compute_hash();
        block.transactions[0].validator = "mallory".into();
        assert_eq!(before, block.compute_hash());
        block.transactions[0].hash = "00".repeat(32);
        assert_ne!(before, block.compute_hash());
    }

    #[test]
    fn block_serialization_example() {
        let block = Block::candidate(3, "abc", txs(2));
        let json = serde_json::to_string(&block).unwrap();
        let back: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(back, block);
        assert_eq!(back.compute_hash(), block.hash);
    }
}
