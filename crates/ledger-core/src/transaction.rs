//! Ledger transactions: one recorded action on one loan document.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LedgerError, Result};
use crate::{canonical, format_timestamp, now_millis, sha256_hex};

/// Free-form context attached to a transaction (session id, user agent, ...).
pub type Metadata = BTreeMap<String, serde_json::Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Upload,
    Verify,
    Approve,
    Reject,
    Modify,
    Access,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Upload,
        Action::Verify,
        Action::Approve,
        Action::Reject,
        Action::Modify,
        Action::Access,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Upload => "upload",
            Action::Verify => "verify",
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Modify => "modify",
            Action::Access => "access",
        }
    }

    /// Critical actions are sealed into a block as soon as they are recorded.
    pub fn is_critical(&self) -> bool {
        matches!(self, Action::Approve | Action::Reject | Action::Verify)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| LedgerError::Validation(format!("unknown action `{s}`")))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub document_id: i64,
    pub loan_application_id: i64,
    pub action: Action,
    pub validator: String,
    pub timestamp: DateTime<Utc>,
    /// Hash of the latest sealed block when this transaction was created.
    pub previous_hash: String,
    pub metadata: Metadata,
    pub hash: String,
    /// Keyless digest over `(hash, validator, timestamp)`. Anyone can
    /// recompute it; it does not prove who the validator is.
    pub signature: String,
}

impl Transaction {
    /// Build, hash and sign a transaction linked to the block `previous_hash`.
    pub fn new(
        document_id: i64,
        loan_application_id: i64,
        action: Action,
        validator: impl Into<String>,
        metadata: Metadata,
        previous_hash: impl Into<String>,
    ) -> Result<Self> {
        let validator = validator.into();
        if document_id <= 0 {
            return Err(LedgerError::Validation("documentId is required".into()));
        }
        if loan_application_id <= 0 {
            return Err(LedgerError::Validation(
                "loanApplicationId is required".into(),
            ));
        }
        if validator.trim().is_empty() {
            return Err(LedgerError::Validation("validator is required".into()));
        }

        let mut tx = Self {
            id: Uuid::new_v4(),
            document_id,
            loan_application_id,
            action,
            validator,
            timestamp: now_millis(),
            previous_hash: previous_hash.into(),
            metadata,
            hash: String::new(),
            signature: String::new(),
        };
        tx.hash = tx.compute_hash();
        tx.signature = tx.compute_signature();
        Ok(tx)
    }

    pub fn compute_hash(&self) -> String {
        sha256_hex(&[&canonical::encode_transaction(self)])
    }

    /// Signature expected for the *stored* hash.
    pub fn compute_signature(&self) -> String {
        signature_for(&self.hash, &self.validator, &self.timestamp)
    }
}

pub fn signature_for(hash: &str, actor: &str, timestamp: &DateTime<Utc>) -> String {
    sha256_hex(&[
        hash.as_bytes(),
        actor.as_bytes(),
        format_timestamp(timestamp).as_bytes(),
    ])
}
