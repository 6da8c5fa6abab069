//! Error types for ledger operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("document {document_id} failed integrity verification (score {score:.2})")]
    Integrity { document_id: i64, score: f64 },

    #[error("mining gave up after {attempts} attempts")]
    MiningTimeout { attempts: u64 },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
