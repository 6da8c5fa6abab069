#![allow(dead_code)]

use std::fs;
use std::sync::Arc;

use ledger_core::{Ledger, LedgerConfig};
use ledger_storage::SledStore;
use tempfile::{tempdir, TempDir};

pub fn create_temp_dir() -> (TempDir, std::path::PathBuf) {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().to_path_buf();
    (temp_dir, db_path)
}

pub fn create_temp_store() -> (TempDir, SledStore) {
    let (temp_dir, db_path) = create_temp_dir();
    (
        temp_dir,
        SledStore::open(&db_path).expect("Failed to open SledStore"),
    )
}

pub fn open_ledger(path: &std::path::Path) -> Ledger<SledStore> {
    let store = Arc::new(SledStore::open(path).expect("Failed to open SledStore"));
    Ledger::open(store, LedgerConfig::default()).expect("Failed to open ledger")
}

pub fn teardown_store(temp_dir: TempDir, store: SledStore) {
    let db_path = temp_dir.path().to_path_buf();
    store.clear().expect("Failed to clear the store");
    drop(store);
    temp_dir.close().expect("Failed to delete temp dir");
    let _ = fs::remove_dir_all(&db_path);
    assert!(!db_path.exists(), "Database directory should be removed");
}
