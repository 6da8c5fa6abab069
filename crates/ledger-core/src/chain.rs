use anyhow::{anyhow, Result};
use parking_lot::{Mutex, MutexGuard};

use crate::block::Block;
use crate::transaction::Transaction;

/// Trait the storage backends implement for the ledger to persist its history.
/// This lives in `ledger-core` to avoid a circular dependency.
pub trait ChainStore: Send + Sync {
    /// Persist a sealed block together with its transactions and drop those
    /// transactions from the pending queue. Index `tip + 1` appends and
    /// advances the tip; a lower index rewrites that block in place and
    /// leaves the tip alone; anything higher is rejected.
    fn put_block(&self, block: &Block) -> Result<()>;
    fn get_block(&self, index: u64) -> Result<Option<Block>>;
    /// `None` while the store holds no block at all.
    fn tip_height(&self) -> Result<Option<u64>>;
    fn tip_hash(&self) -> Result<Option<String>>;
    /// Append a recorded, not yet sealed transaction.
    fn put_pending(&self, tx: &Transaction) -> Result<()>;
    /// Pending transactions in recording order.
    fn pending(&self) -> Result<Vec<Transaction>>;
    fn close(&self) -> Result<()>;

    /// Every block from genesis to the tip.
    fn load_chain(&self) -> Result<Vec<Block>> {
        let Some(height) = self.tip_height()? else {
            return Ok(vec![]);
        };
        (0..=height)
            .map(|index| {
                self.get_block(index)?
                    .ok_or_else(|| anyhow!("block {index} missing below tip {height}"))
            })
            .collect()
    }
}

/// Volatile store for tests and throwaway ledgers.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    blocks: Vec<Block>,
    pending: Vec<Transaction>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock()
    }
}

impl ChainStore for MemoryStore {
    fn put_block(&self, block: &Block) -> Result<()> {
        let mut inner = self.lock();
        let next = inner.blocks.len() as u64;
        if block.index > next {
            return Err(anyhow!("expected block {next} or lower, got {}", block.index));
        }
        inner
            .pending
            .retain(|tx| !block.transactions.iter().any(|sealed| sealed.id == tx.id));
        if block.index == next {
            inner.blocks.push(block.clone());
        } else {
            inner.blocks[block.index as usize] = block.clone();
        }
        Ok(())
    }

    fn get_block(&self, index: u64) -> Result<Option<Block>> {
        Ok(self.lock().blocks.get(index as usize).cloned())
    }

    fn tip_height(&self) -> Result<Option<u64>> {
        Ok(self.lock().blocks.last().map(|b| b.index))
    }

    fn tip_hash(&self) -> Result<Option<String>> {
        Ok(self.lock().blocks.last().map(|b| b.hash.clone()))
    }

    fn put_pending(&self, tx: &Transaction) -> Result<()> {
        self.lock().pending.push(tx.clone());
        Ok(())
    }

    fn pending(&self) -> Result<Vec<Transaction>> {
        Ok(self.lock().pending.clone())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
