use std::collections::HashSet;
use std::convert::Infallible;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ledger_core::{Block, ChainStore, Transaction};
use sled::transaction::{ConflictableTransactionResult, TransactionError};
use sled::{Db, IVec, Transactional, Tree};
use tracing::{debug, info};

use crate::rows::{position_key, BlockRow, TransactionRow};

const TREE_BLOCKS: &str = "blocks";
const TREE_TRANSACTIONS: &str = "transactions";
const TREE_BLOCK_TRANSACTIONS: &str = "block_transactions";
const TREE_PENDING: &str = "pending";
const TREE_META: &str = "meta";
const KEY_TIP_HEIGHT: &[u8] = b"tip_height";
const KEY_TIP_HASH: &[u8] = b"tip_hash";

#[derive(Clone)]
pub struct SledStore {
    db: Db,
    blocks: Tree,
    transactions: Tree,
    block_transactions: Tree,
    pending: Tree,
    meta: Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path).with_context(|| format!("opening sled at {}", path.display()))?;
        info!(path = %path.display(), "sled store opened");
        Self::from_db(db)
    }

    /// Store that lives only as long as the handle (for tests).
    pub fn open_temporary() -> Result<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> Result<Self> {
        Ok(Self {
            blocks: db.open_tree(TREE_BLOCKS)?,
            transactions: db.open_tree(TREE_TRANSACTIONS)?,
            block_transactions: db.open_tree(TREE_BLOCK_TRANSACTIONS)?,
            pending: db.open_tree(TREE_PENDING)?,
            meta: db.open_tree(TREE_META)?,
            db,
        })
    }

    /// Drop every row. Irreversible.
    pub fn clear(&self) -> Result<()> {
        for tree in [
            &self.blocks,
            &self.transactions,
            &self.block_transactions,
            &self.pending,
            &self.meta,
        ] {
            tree.clear()?;
        }
        self.db.flush()?;
        Ok(())
    }

    fn load_transaction(&self, id: &[u8]) -> Result<Transaction> {
        let bytes = self.transactions.get(id)?.ok_or_else(|| {
            anyhow!("transaction {} missing", String::from_utf8_lossy(id))
        })?;
        let row: TransactionRow = bincode::deserialize(&bytes).context("decoding transaction row")?;
        row.into_transaction()
    }
}

fn decode_u64(bytes: &IVec) -> Result<u64> {
    let arr: [u8; 8] = bytes
        .as_ref()
        .try_into()
        .map_err(|_| anyhow!("expected 8 bytes, found {}", bytes.len()))?;
    Ok(u64::from_be_bytes(arr))
}

impl ChainStore for SledStore {
    fn put_block(&self, block: &Block) -> Result<()> {
        let next = self.tip_height()?.map_or(0, |height| height + 1);
        if block.index > next {
            return Err(anyhow!("expected block {next} or lower, got {}", block.index));
        }
        let advances_tip = block.index == next;
        let index_key = block.index.to_be_bytes().to_vec();
        let block_row = bincode::serialize(&BlockRow::from_block(block))?;
        let tip_hash = block.hash.as_bytes().to_vec();

        let mut tx_rows = Vec::with_capacity(block.transactions.len());
        for (position, tx) in block.transactions.iter().enumerate() {
            let row = TransactionRow::from_transaction(tx, Some(block.index))?;
            tx_rows.push((
                tx.id.to_string().into_bytes(),
                bincode::serialize(&row)?,
                position_key(block.index, position as u32),
            ));
        }

        // Positions of the block being rewritten, if any.
        let mut stale_positions = Vec::new();
        for entry in self.block_transactions.scan_prefix(&index_key) {
            let (key, _) = entry?;
            stale_positions.push(key);
        }

        let sealed: HashSet<&[u8]> = tx_rows.iter().map(|(id, _, _)| id.as_slice()).collect();
        let mut pending_keys = Vec::new();
        for entry in self.pending.iter() {
            let (key, id) = entry?;
            if sealed.contains(id.as_ref()) {
                pending_keys.push(key);
            }
        }

        (
            &self.blocks,
            &self.transactions,
            &self.block_transactions,
            &self.pending,
            &self.meta,
        )
            .transaction(
                |(blocks, transactions, positions, pending, meta)| -> ConflictableTransactionResult<(), Infallible> {
                    blocks.insert(index_key.clone(), block_row.clone())?;
                    for key in &stale_positions {
                        positions.remove(key.clone())?;
                    }
                    for (id, row, position) in &tx_rows {
                        transactions.insert(id.clone(), row.clone())?;
                        positions.insert(position.clone(), id.clone())?;
                    }
                    for key in &pending_keys {
                        pending.remove(key.clone())?;
                    }
                    if advances_tip {
                        meta.insert(KEY_TIP_HEIGHT, index_key.clone())?;
                        meta.insert(KEY_TIP_HASH, tip_hash.clone())?;
                    }
                    Ok(())
                },
            )
            .map_err(|e: TransactionError<Infallible>| {
                anyhow!("storing block {} failed: {e:?}", block.index)
            })?;

        self.db.flush()?;
        debug!(index = block.index, transactions = tx_rows.len(), "block stored");
        Ok(())
    }

    fn get_block(&self, index: u64) -> Result<Option<Block>> {
        let Some(bytes) = self.blocks.get(index.to_be_bytes())? else {
            return Ok(None);
        };
        let row: BlockRow = bincode::deserialize(&bytes).context("decoding block row")?;

        let mut transactions = Vec::with_capacity(row.transaction_count as usize);
        for entry in self.block_transactions.scan_prefix(index.to_be_bytes()) {
            let (_, id) = entry?;
            transactions.push(self.load_transaction(&id)?);
        }
        Ok(Some(row.into_block(transactions)))
    }

    fn tip_height(&self) -> Result<Option<u64>> {
        self.meta
            .get(KEY_TIP_HEIGHT)?
            .map(|v| decode_u64(&v))
            .transpose()
    }

    fn tip_hash(&self) -> Result<Option<String>> {
        self.meta
            .get(KEY_TIP_HASH)?
            .map(|v| String::from_utf8(v.to_vec()).context("tip hash is not utf-8"))
            .transpose()
    }

    fn put_pending(&self, tx: &Transaction) -> Result<()> {
        let id = tx.id.to_string().into_bytes();
        let row = bincode::serialize(&TransactionRow::from_transaction(tx, None)?)?;
        let sequence = self.db.generate_id()?.to_be_bytes().to_vec();

        (&self.transactions, &self.pending)
            .transaction(
                |(transactions, pending)| -> ConflictableTransactionResult<(), Infallible> {
                    transactions.insert(id.clone(), row.clone())?;
                    pending.insert(sequence.clone(), id.clone())?;
                    Ok(())
                },
            )
            .map_err(|e: TransactionError<Infallible>| {
                anyhow!("storing pending transaction {} failed: {e:?}", tx.id)
            })?;
        self.db.flush()?;
        Ok(())
    }

    fn pending(&self) -> Result<Vec<Transaction>> {
        self.pending
            .iter()
            .map(|entry| {
                let (_, id) = entry?;
                self.load_transaction(&id)
            })
            .collect()
    }

    fn close(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
