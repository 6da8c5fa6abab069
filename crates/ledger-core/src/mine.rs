use rayon::prelude::*;
use tracing::debug;

use crate::block::{hash_with_nonce, Block};
use crate::error::{LedgerError, Result};
use crate::pow::meets_difficulty;

/// Mines a block by searching nonces in parallel, returning the same block
/// the sequential miner would: the smallest nonce below `max_attempts` whose
/// hash meets `difficulty`.
pub fn mine_block_parallel(mut block: Block, difficulty: usize, max_attempts: u64) -> Result<Block> {
    let prefix = block.header_prefix();

    let found = (0u64..max_attempts)
        .into_par_iter()
        .find_first(|nonce| meets_difficulty(&hash_with_nonce(&prefix, *nonce), difficulty))
        .ok_or(LedgerError::MiningTimeout {
            attempts: max_attempts,
        })?;

    block.nonce = found;
    block.hash = hash_with_nonce(&prefix, found);
    debug!(index = block.index, nonce = found, "parallel search found nonce");
    Ok(block)
}
