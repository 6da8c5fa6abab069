use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::constants::{COMPLIANT_SCORE, VALID_SCORE};
use crate::verify::{percentage, verify_transaction};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkHealth {
    Healthy,
    Warning,
    Critical,
}

impl NetworkHealth {
    pub fn from_rate(rate: f64) -> Self {
        if rate >= COMPLIANT_SCORE {
            NetworkHealth::Healthy
        } else if rate >= VALID_SCORE {
            NetworkHealth::Warning
        } else {
            NetworkHealth::Critical
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainStats {
    pub total_blocks: usize,
    pub total_transactions: usize,
    pub total_documents: usize,
    pub pending_transactions: usize,
    /// Mean seconds between consecutive seals.
    pub average_block_time: f64,
    pub last_block_hash: String,
    pub verification_rate: f64,
    pub network_health: NetworkHealth,
}

pub fn compute_stats(blocks: &[Block], pending_transactions: usize) -> BlockchainStats {
    let transactions = || blocks.iter().flat_map(|b| b.transactions.iter().map(move |tx| (b, tx)));

    let total_transactions = transactions().count();
    let total_documents = transactions()
        .map(|(_, tx)| tx.document_id)
        .collect::<HashSet<_>>()
        .len();
    let verified = transactions()
        .filter(|(block, tx)| verify_transaction(tx, Some(*block)))
        .count();
    let verification_rate = percentage(verified, total_transactions, 100.0);

    let average_block_time = if blocks.len() < 2 {
        0.0
    } else {
        let total_millis: i64 = blocks
            .windows(2)
            .map(|pair| (pair[1].timestamp - pair[0].timestamp).num_milliseconds())
            .sum();
        total_millis as f64 / 1000.0 / (blocks.len() - 1) as f64
    };

    BlockchainStats {
        total_blocks: blocks.len(),
        total_transactions,
        total_documents,
        pending_transactions,
        average_block_time,
        last_block_hash: blocks.last().map(|b| b.hash.clone()).unwrap_or_default(),
        verification_rate,
        network_health: NetworkHealth::from_rate(verification_rate),
    }
}
