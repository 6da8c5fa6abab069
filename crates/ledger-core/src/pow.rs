//! Proof-of-work target: a block hash must start with `difficulty` hex zeros.

use crate::block::{hash_with_nonce, Block};
use crate::constants::HASH_HEX_SIZE;
use crate::error::{LedgerError, Result};

/// Number of leading `'0'` hex digits in `hash`.
pub fn leading_zero_digits(hash: &str) -> usize {
    hash.bytes().take_while(|b| *b == b'0').count()
}

pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    let difficulty = difficulty.min(HASH_HEX_SIZE);
    hash.len() >= difficulty && leading_zero_digits(hash) >= difficulty
}

/// Search nonces `0, 1, 2, ...` until the block hash meets `difficulty`.
/// Gives up with `MiningTimeout` after `max_attempts` nonces.
pub fn mine_block(mut block: Block, difficulty: usize, max_attempts: u64) -> Result<Block> {
    let prefix = block.header_prefix();
    for nonce in 0..max_attempts {
        let hash = hash_with_nonce(&prefix, nonce);
        if meets_difficulty(&hash, difficulty) {
            block.nonce = nonce;
            block.hash = hash;
            return Ok(block);
        }
    }
    Err(LedgerError::MiningTimeout {
        attempts: max_attempts,
    })
}
