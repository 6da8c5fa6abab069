//! The ledger service: one writer seals pending transactions into blocks,
//! any number of readers verify and audit immutable snapshots.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::{audit_blocks, AuditResult};
use crate::block::Block;
use crate::certificate::DocumentCertificate;
use crate::chain::{ChainStore, MemoryStore};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::merkle::{MerkleProof, MerkleTree};
use crate::mine::mine_block_parallel;
use crate::pow::mine_block;
use crate::stats::{compute_stats, BlockchainStats};
use crate::transaction::{Action, Metadata, Transaction};
use crate::verify::{verify_document, DocumentVerification};

/// Merkle inclusion proof of a sealed transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionProof {
    pub transaction_id: Uuid,
    pub block_index: u64,
    pub block_hash: String,
    pub merkle_root: String,
    pub proof: MerkleProof,
}

impl TransactionProof {
    pub fn verify(&self) -> bool {
        self.proof.verify(&self.merkle_root)
    }
}

pub struct Ledger<S: ChainStore> {
    store: Arc<S>,
    config: LedgerConfig,
    /// Pending queue; holding this lock is what makes a caller the writer.
    pending: Mutex<Vec<Transaction>>,
    /// What readers see. Republished by the writer after every enqueue and
    /// seal, never held across mining.
    view: RwLock<View>,
}

/// Sealed history and pending queue as of the last publication.
#[derive(Clone)]
struct View {
    blocks: Arc<Vec<Block>>,
    pending: Arc<Vec<Transaction>>,
}

impl Ledger<MemoryStore> {
    /// Fresh ledger over a volatile store.
    pub fn in_memory(config: LedgerConfig) -> Result<Self> {
        Self::open(Arc::new(MemoryStore::new()), config)
    }
}

impl<S: ChainStore> Ledger<S> {
    /// Open the ledger over `store`, sealing a genesis block if the store is
    /// empty and reloading blocks and pending transactions otherwise.
    pub fn open(store: Arc<S>, config: LedgerConfig) -> Result<Self> {
        let mut blocks = store.load_chain()?;
        if blocks.is_empty() {
            let genesis = mine(Block::genesis(), &config)?;
            store.put_block(&genesis)?;
            info!(hash = %genesis.hash, nonce = genesis.nonce, "genesis block sealed");
            blocks.push(genesis);
        } else {
            let tip = &blocks[blocks.len() - 1];
            info!(height = tip.index, hash = %tip.hash, "ledger recovered from store");
        }

        let pending = store.pending()?;
        if !pending.is_empty() {
            info!(count = pending.len(), "pending transactions reloaded");
        }

        let report = audit_blocks(&blocks, config.difficulty);
        if !report.is_clean() {
            warn!(
                issues = report.issues.len(),
                score = report.overall_score,
                "stored history failed audit"
            );
            for issue in &report.issues {
                warn!(severity = ?issue.severity, kind = ?issue.kind, "{}", issue.description);
            }
        }

        Ok(Self {
            store,
            config,
            view: RwLock::new(View {
                blocks: Arc::new(blocks),
                pending: Arc::new(pending.clone()),
            }),
            pending: Mutex::new(pending),
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Record an action on a document. The transaction links to the current
    /// tip and is sealed right away when the action is critical or the
    /// pending queue reaches the threshold. Once the transaction is stored it
    /// is returned even if that seal fails; it then stays pending.
    pub fn record_transaction(
        &self,
        document_id: i64,
        loan_application_id: i64,
        action: Action,
        validator: &str,
        metadata: Option<Metadata>,
    ) -> Result<Transaction> {
        let mut pending = self.pending.lock();

        let tip_hash = self.latest_block().hash;
        let tx = Transaction::new(
            document_id,
            loan_application_id,
            action,
            validator,
            metadata.unwrap_or_default(),
            tip_hash,
        )?;
        self.store.put_pending(&tx)?;
        pending.push(tx.clone());
        self.view.write().pending = Arc::new(pending.clone());
        debug!(id = %tx.id, document_id, %action, validator, "transaction recorded");

        if action.is_critical() || pending.len() >= self.config.seal_threshold {
            if let Err(err) = self.seal_locked(&mut pending) {
                warn!(pending = pending.len(), "seal failed, transactions stay pending: {err:#}");
            }
        }
        Ok(tx)
    }

    /// Seal everything pending into a block now. `None` when nothing is pending.
    pub fn seal_pending(&self) -> Result<Option<Block>> {
        let mut pending = self.pending.lock();
        self.seal_locked(&mut pending)
    }

    fn seal_locked(&self, pending: &mut Vec<Transaction>) -> Result<Option<Block>> {
        if pending.is_empty() {
            return Ok(None);
        }
        let tip = self.latest_block();
        // The block owns its own copies; the queue is only cleared once stored.
        let candidate = Block::candidate(tip.index + 1, tip.hash, pending.clone());
        let block = mine(candidate, &self.config)?;
        self.store.put_block(&block)?;

        pending.clear();
        {
            let mut view = self.view.write();
            Arc::make_mut(&mut view.blocks).push(block.clone());
            view.pending = Arc::new(Vec::new());
        }

        info!(
            index = block.index,
            transactions = block.transactions.len(),
            nonce = block.nonce,
            hash = %block.hash,
            "block sealed"
        );
        Ok(Some(block))
    }

    pub fn latest_block(&self) -> Block {
        let blocks = self.blocks();
        // Genesis is sealed in `open`, so the history is never empty.
        blocks[blocks.len() - 1].clone()
    }

    /// Immutable snapshot of the sealed history.
    pub fn blocks(&self) -> Arc<Vec<Block>> {
        Arc::clone(&self.view.read().blocks)
    }

    /// Snapshot of the recorded, not yet sealed transactions.
    pub fn pending(&self) -> Arc<Vec<Transaction>> {
        Arc::clone(&self.view.read().pending)
    }

    pub fn block(&self, index: u64) -> Option<Block> {
        self.blocks().get(index as usize).cloned()
    }

    pub fn pending_len(&self) -> usize {
        self.view.read().pending.len()
    }

    /// Look a transaction up among sealed blocks first, then the pending queue.
    pub fn transaction(&self, id: Uuid) -> Option<Transaction> {
        let view = self.view.read().clone();
        view.blocks
            .iter()
            .flat_map(|b| b.transactions.iter())
            .chain(view.pending.iter())
            .find(|tx| tx.id == id)
            .cloned()
    }

    pub fn transaction_proof(&self, id: Uuid) -> Result<TransactionProof> {
        let blocks = self.blocks();
        let (block, position) = blocks
            .iter()
            .find_map(|b| {
                b.transactions
                    .iter()
                    .position(|tx| tx.id == id)
                    .map(|pos| (b, pos))
            })
            .ok_or_else(|| LedgerError::NotFound(format!("no sealed transaction {id}")))?;

        let tree = MerkleTree::new(&block.transaction_hashes());
        let proof = tree
            .proof(position)
            .ok_or_else(|| LedgerError::NotFound(format!("no sealed transaction {id}")))?;
        Ok(TransactionProof {
            transaction_id: id,
            block_index: block.index,
            block_hash: block.hash.clone(),
            merkle_root: block.merkle_root.clone(),
            proof,
        })
    }

    pub fn verify_document_integrity(&self, document_id: i64) -> DocumentVerification {
        verify_document(&self.blocks(), document_id)
    }

    /// Attest to a document's history at the current tip. Refuses documents
    /// without sealed transactions and documents that fail verification.
    pub fn generate_certificate(&self, document_id: i64) -> Result<DocumentCertificate> {
        let blocks = self.blocks();
        let verification = verify_document(&blocks, document_id);
        let tip_hash = blocks[blocks.len() - 1].hash.clone();
        let cert = DocumentCertificate::issue(&verification, tip_hash, self.config.issuer.as_str())?;
        info!(document_id, certificate = %cert.certificate_id, "certificate issued");
        Ok(cert)
    }

    pub fn stats(&self) -> BlockchainStats {
        let view = self.view.read().clone();
        compute_stats(&view.blocks, view.pending.len())
    }

    pub fn audit_blockchain(&self) -> AuditResult {
        let result = audit_blocks(&self.blocks(), self.config.difficulty);
        if result.is_clean() {
            info!(blocks = result.total_blocks, "audit passed");
        } else {
            warn!(
                issues = result.issues.len(),
                score = result.overall_score,
                "audit found issues"
            );
        }
        result
    }

    pub fn close(&self) -> Result<()> {
        self.store.close()?;
        Ok(())
    }

    #[cfg(test)]
    fn tamper(&self, f: impl FnOnce(&mut Vec<Block>)) {
        f(Arc::make_mut(&mut self.view.write().blocks));
    }
}

fn mine(block: Block, config: &LedgerConfig) -> Result<Block> {
    if config.parallel_mining {
        mine_block_parallel(block, config.difficulty, config.max_mining_attempts)
    } else {
        mine_block(block, config.difficulty, config.max_mining_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{IssueKind, Severity};
    use crate::pow::meets_difficulty;
    use crate::verify::{verify_transaction, ComplianceStatus};
    use serde_json::json;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    type BlockHook = Box<dyn FnMut() -> anyhow::Result<()> + Send>;

    /// Memory store that runs a hook before every `put_block`.
    #[derive(Default)]
    struct HookedStore {
        inner: MemoryStore,
        hook: Mutex<Option<BlockHook>>,
    }

    impl HookedStore {
        fn set_hook(&self, hook: impl FnMut() -> anyhow::Result<()> + Send + 'static) {
            *self.hook.lock() = Some(Box::new(hook));
        }

        fn clear_hook(&self) {
            *self.hook.lock() = None;
        }
    }

    impl ChainStore for HookedStore {
        fn put_block(&self, block: &Block) -> anyhow::Result<()> {
            if let Some(hook) = self.hook.lock().as_mut() {
                hook()?;
            }
            self.inner.put_block(block)
        }

        fn get_block(&self, index: u64) -> anyhow::Result<Option<Block>> {
            self.inner.get_block(index)
        }

        fn tip_height(&self) -> anyhow::Result<Option<u64>> {
            self.inner.tip_height()
        }

        fn tip_hash(&self) -> anyhow::Result<Option<String>> {
            self.inner.tip_hash()
        }

        fn put_pending(&self, tx: &Transaction) -> anyhow::Result<()> {
            self.inner.put_pending(tx)
        }

        fn pending(&self) -> anyhow::Result<Vec<Transaction>> {
            self.inner.pending()
        }

        fn close(&self) -> anyhow::Result<()> {
            self.inner.close()
        }
    }

    fn ledger() -> Ledger<MemoryStore> {
        Ledger::in_memory(LedgerConfig::default()).unwrap()
    }

    fn upload(ledger: &Ledger<MemoryStore>, document_id: i64, validator: &str) -> Transaction {
        ledger
            .record_transaction(document_id, 1, Action::Upload, validator, None)
            .unwrap()
    }

    #[test]
    fn fresh_ledger_has_mined_genesis() {
        let ledger = ledger();
        let genesis = ledger.latest_block();
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, "0");
        assert!(meets_difficulty(&genesis.hash, 2));
        assert_eq!(ledger.blocks().len(), 1);
    }

    #[test]
    fn five_uploads_seal_one_block() {
        let ledger = ledger();
        let recorded: Vec<Transaction> = (0..5).map(|_| upload(&ledger, 42, "alice")).collect();

        let blocks = ledger.blocks();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].transactions, recorded);
        assert_eq!(ledger.pending_len(), 0);

        let v = ledger.verify_document_integrity(42);
        assert_eq!(v.integrity_score, 100.0);
        assert!(v.is_valid);
        assert_eq!(v.compliance_status, ComplianceStatus::Compliant);
        assert_eq!(v.total_transactions, 5);
    }

    #[test]
    fn below_threshold_stays_pending() {
        let ledger = ledger();
        for _ in 0..4 {
            upload(&ledger, 42, "alice");
        }
        assert_eq!(ledger.blocks().len(), 1);
        assert_eq!(ledger.pending_len(), 4);
        assert_eq!(ledger.verify_document_integrity(42).total_transactions, 0);
    }

    #[test]
    fn critical_action_seals_immediately() {
        let ledger = ledger();
        let tx = ledger
            .record_transaction(7, 3, Action::Approve, "bob", None)
            .unwrap();
        let blocks = ledger.blocks();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].transactions, vec![tx]);
        assert_eq!(ledger.pending_len(), 0);
    }

    #[test]
    fn critical_action_flushes_earlier_pending() {
        let ledger = ledger();
        upload(&ledger, 7, "alice");
        upload(&ledger, 7, "alice");
        ledger.record_transaction(7, 3, Action::Reject, "bob", None).unwrap();
        assert_eq!(ledger.latest_block().transactions.len(), 3);
    }

    #[test]
    fn transactions_link_to_tip_at_creation() {
        let ledger = ledger();
        let genesis_hash = ledger.latest_block().hash;
        let first = upload(&ledger, 1, "alice");
        assert_eq!(first.previous_hash, genesis_hash);
        ledger.seal_pending().unwrap();
        let second = upload(&ledger, 1, "alice");
        assert_eq!(second.previous_hash, ledger.latest_block().hash);
    }

    #[test]
    fn chain_continuity_holds() {
        let ledger = ledger();
        for i in 0..12 {
            ledger
                .record_transaction(i % 3 + 1, 1, Action::Verify, "carol", None)
                .unwrap();
        }
        let blocks = ledger.blocks();
        assert_eq!(blocks.len(), 13);
        for pair in blocks.windows(2) {
            assert_eq!(pair[1].previous_hash, pair[0].hash);
            assert_eq!(pair[1].index, pair[0].index + 1);
            assert_eq!(pair[1].hash, pair[1].compute_hash());
            assert!(pair[1].hash.starts_with("00"));
        }
    }

    #[test]
    fn verification_is_idempotent() {
        let ledger = ledger();
        for _ in 0..5 {
            upload(&ledger, 9, "alice");
        }
        let a = ledger.verify_document_integrity(9);
        let b = ledger.verify_document_integrity(9);
        assert_eq!(a.integrity_score, b.integrity_score);
        assert_eq!(a, b);
    }

    #[test]
    fn metadata_is_recorded_and_hashed() {
        let ledger = ledger();
        let mut metadata = Metadata::new();
        metadata.insert("sessionId".into(), json!("abc"));
        metadata.insert("userAgent".into(), json!({"name": "portal", "version": 3}));
        let tx = ledger
            .record_transaction(5, 5, Action::Approve, "dave", Some(metadata.clone()))
            .unwrap();
        let sealed = &ledger.latest_block().transactions[0];
        assert_eq!(sealed.metadata, metadata);
        assert!(verify_transaction(sealed, None));
        assert_eq!(sealed, &tx);
    }

    #[test]
    fn invalid_input_is_rejected_without_side_effects() {
        let ledger = ledger();
        let err = ledger.record_transaction(0, 1, Action::Approve, "alice", None);
        assert!(matches!(err, Err(LedgerError::Validation(_))));
        let err = ledger.record_transaction(1, 1, Action::Approve, "", None);
        assert!(matches!(err, Err(LedgerError::Validation(_))));
        assert_eq!(ledger.pending_len(), 0);
        assert_eq!(ledger.blocks().len(), 1);
    }

    #[test]
    fn tampered_validator_is_one_high_issue() {
        let ledger = ledger();
        for _ in 0..5 {
            upload(&ledger, 42, "alice");
        }
        let target = ledger.blocks()[1].transactions[0].id;
        ledger.tamper(|blocks| blocks[1].transactions[0].validator = "mallory".into());

        let audit = ledger.audit_blockchain();
        assert_eq!(audit.issues.len(), 1);
        assert_eq!(audit.issues[0].severity, Severity::High);
        assert_eq!(audit.issues[0].kind, IssueKind::TransactionVerificationFailed);
        assert_eq!(audit.issues[0].transaction_id, Some(target));
        assert!(audit.overall_score < 100.0);

        let v = ledger.verify_document_integrity(42);
        assert_eq!(v.integrity_score, 80.0);
        assert_eq!(v.compliance_status, ComplianceStatus::PendingReview);
    }

    #[test]
    fn tampering_lowers_score_proportionally_and_blocks_certificates() {
        let ledger = ledger();
        for _ in 0..5 {
            upload(&ledger, 42, "alice");
        }
        ledger.tamper(|blocks| {
            blocks[1].transactions[0].validator = "mallory".into();
            blocks[1].transactions[1].document_id = 42;
            blocks[1].transactions[1].loan_application_id = 99;
        });
        let v = ledger.verify_document_integrity(42);
        assert_eq!(v.integrity_score, 60.0);
        assert!(!v.is_valid);
        assert!(matches!(
            ledger.generate_certificate(42),
            Err(LedgerError::Integrity { document_id: 42, .. })
        ));
    }

    #[test]
    fn ledger_keeps_accepting_over_corrupted_history() {
        let ledger = ledger();
        ledger.record_transaction(1, 1, Action::Approve, "alice", None).unwrap();
        ledger.tamper(|blocks| blocks[1].transactions[0].validator = "mallory".into());
        ledger.record_transaction(2, 1, Action::Approve, "alice", None).unwrap();
        assert_eq!(ledger.blocks().len(), 3);
        assert_eq!(ledger.audit_blockchain().issues.len(), 1);
    }

    #[test]
    fn certificate_for_valid_document() {
        let ledger = ledger();
        upload(&ledger, 42, "alice");
        let last = ledger.record_transaction(42, 1, Action::Approve, "bob", None).unwrap();
        let cert = ledger.generate_certificate(42).unwrap();
        assert_eq!(cert.latest_transaction_hash, last.hash);
        assert_eq!(cert.blockchain_proof, ledger.latest_block().hash);
        assert_eq!(cert.issuer, ledger.config().issuer);
        assert!(cert.verify());
    }

    #[test]
    fn certificate_for_unknown_document_is_not_found() {
        let ledger = ledger();
        assert!(matches!(
            ledger.generate_certificate(404),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn genesis_only_audit() {
        let audit = ledger().audit_blockchain();
        assert_eq!(audit.overall_score, 100.0);
        assert!(audit.issues.is_empty());
    }

    #[test]
    fn stats_track_ledger() {
        let ledger = ledger();
        for doc in 1..=5 {
            upload(&ledger, doc, "alice");
        }
        upload(&ledger, 6, "alice");
        let stats = ledger.stats();
        assert_eq!(stats.total_blocks, 2);
        assert_eq!(stats.total_transactions, 5);
        assert_eq!(stats.total_documents, 5);
        assert_eq!(stats.pending_transactions, 1);
        assert_eq!(stats.last_block_hash, ledger.latest_block().hash);
        assert_eq!(stats.verification_rate, 100.0);
    }

    #[test]
    fn proofs_for_sealed_transactions() {
        let ledger = ledger();
        let txs: Vec<Transaction> = (0..5).map(|_| upload(&ledger, 3, "erin")).collect();
        for tx in &txs {
            let proof = ledger.transaction_proof(tx.id).unwrap();
            assert_eq!(proof.block_index, 1);
            assert_eq!(proof.proof.leaf, tx.hash);
            assert!(proof.verify());
        }
        let pending = upload(&ledger, 3, "erin");
        assert!(matches!(
            ledger.transaction_proof(pending.id),
            Err(LedgerError::NotFound(_))
        ));
        assert_eq!(ledger.transaction(pending.id), Some(pending));
        assert_eq!(ledger.transaction(txs[0].id), Some(txs[0].clone()));
        assert_eq!(ledger.transaction(Uuid::new_v4()), None);
    }

    #[test]
    fn reopen_resumes_from_store() {
        let store = Arc::new(MemoryStore::new());
        let (tip, pending_id) = {
            let ledger = Ledger::open(store.clone(), LedgerConfig::default()).unwrap();
            ledger.record_transaction(1, 1, Action::Approve, "alice", None).unwrap();
            let pending = ledger.record_transaction(1, 1, Action::Access, "alice", None).unwrap();
            (ledger.latest_block(), pending.id)
        };

        let ledger = Ledger::open(store, LedgerConfig::default()).unwrap();
        assert_eq!(ledger.latest_block(), tip);
        assert_eq!(ledger.pending_len(), 1);
        let block = ledger.seal_pending().unwrap().unwrap();
        assert_eq!(block.previous_hash, tip.hash);
        assert_eq!(block.transactions[0].id, pending_id);
        assert!(ledger.audit_blockchain().is_clean());
    }

    #[test]
    fn mining_timeout_keeps_transaction_pending() {
        let store = Arc::new(MemoryStore::new());
        Ledger::open(store.clone(), LedgerConfig::default()).unwrap();
        let stingy = LedgerConfig {
            max_mining_attempts: 0,
            ..LedgerConfig::default()
        };
        let ledger = Ledger::open(store.clone(), stingy).unwrap();

        let tx = ledger.record_transaction(1, 1, Action::Approve, "alice", None).unwrap();
        assert_eq!(ledger.pending_len(), 1);
        assert_eq!(ledger.blocks().len(), 1);
        assert_eq!(store.pending().unwrap(), vec![tx]);
        assert!(matches!(
            ledger.seal_pending(),
            Err(LedgerError::MiningTimeout { attempts: 0 })
        ));
    }

    #[test]
    fn seal_pending_on_empty_queue_is_noop() {
        let ledger = ledger();
        assert!(ledger.seal_pending().unwrap().is_none());
        assert_eq!(ledger.blocks().len(), 1);
    }

    #[test]
    fn parallel_mining_ledger() {
        let config = LedgerConfig {
            parallel_mining: true,
            difficulty: 3,
            ..LedgerConfig::default()
        };
        let ledger = Ledger::in_memory(config).unwrap();
        ledger.record_transaction(1, 1, Action::Approve, "alice", None).unwrap();
        let audit = ledger.audit_blockchain();
        assert!(audit.is_clean());
        assert!(ledger.latest_block().hash.starts_with("000"));
    }

    #[test]
    fn concurrent_writers_keep_chain_consistent() {
        let ledger = Arc::new(ledger());
        thread::scope(|scope| {
            for worker in 0..8 {
                let ledger = Arc::clone(&ledger);
                scope.spawn(move || {
                    for _ in 0..10 {
                        ledger
                            .record_transaction(worker + 1, 1, Action::Upload, "worker", None)
                            .unwrap();
                    }
                });
            }
            for _ in 0..20 {
                let _ = ledger.stats();
            }
        });

        let stats = ledger.stats();
        assert_eq!(stats.total_transactions + stats.pending_transactions, 80);
        assert_eq!(stats.total_blocks, 17);
        let audit = ledger.audit_blockchain();
        assert!(audit.is_clean(), "{:?}", audit.issues);
    }

    #[test]
    fn failed_seal_still_returns_recorded_transaction() {
        let store = Arc::new(HookedStore::default());
        let ledger = Ledger::open(store.clone(), LedgerConfig::default()).unwrap();
        store.set_hook(|| Err(anyhow::anyhow!("disk full")));

        let tx = ledger
            .record_transaction(1, 1, Action::Approve, "alice", None)
            .unwrap();
        assert_eq!(ledger.blocks().len(), 1);
        assert_eq!(*ledger.pending(), vec![tx.clone()]);
        assert_eq!(store.pending().unwrap(), vec![tx.clone()]);
        assert_eq!(ledger.transaction(tx.id), Some(tx.clone()));
        assert!(matches!(ledger.seal_pending(), Err(LedgerError::Storage(_))));

        store.clear_hook();
        let block = ledger.seal_pending().unwrap().unwrap();
        assert_eq!(block.transactions, vec![tx]);
        assert_eq!(ledger.pending_len(), 0);
        assert!(store.pending().unwrap().is_empty());
    }

    #[test]
    fn readers_do_not_wait_for_a_seal_in_progress() {
        let store = Arc::new(HookedStore::default());
        let ledger = Arc::new(Ledger::open(store.clone(), LedgerConfig::default()).unwrap());
        let queued = ledger
            .record_transaction(3, 1, Action::Upload, "alice", None)
            .unwrap();

        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        store.set_hook(move || {
            let _ = entered_tx.send(());
            let _ = release_rx.recv();
            Ok(())
        });

        let writer = {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                ledger
                    .record_transaction(3, 1, Action::Approve, "bob", None)
                    .unwrap()
            })
        };
        // The writer now holds the queue lock inside the seal.
        entered_rx.recv().unwrap();

        let (done_tx, done_rx) = mpsc::channel();
        let reader = {
            let ledger = Arc::clone(&ledger);
            let id = queued.id;
            thread::spawn(move || {
                let _ = done_tx.send((ledger.stats(), ledger.transaction(id), ledger.pending_len()));
            })
        };
        let (stats, found, pending) = done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("reads blocked behind the seal");
        assert_eq!(stats.total_blocks, 1);
        assert_eq!(stats.pending_transactions, 2);
        assert_eq!(pending, 2);
        assert_eq!(found, Some(queued));

        release_tx.send(()).unwrap();
        let approved = writer.join().unwrap();
        reader.join().unwrap();
        let tip = ledger.latest_block();
        assert_eq!(tip.transactions.len(), 2);
        assert_eq!(tip.transactions[1], approved);
        assert_eq!(ledger.stats().pending_transactions, 0);
    }
}
