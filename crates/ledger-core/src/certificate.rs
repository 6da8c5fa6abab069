//! Time-boxed attestations that a document's recorded history verified at
//! a given ledger tip.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{CERTIFICATE_VALIDITY_MONTHS, COMPLIANCE_CHECKS};
use crate::error::{LedgerError, Result};
use crate::transaction::signature_for;
use crate::verify::DocumentVerification;
use crate::{canonical, now_millis, sha256_hex};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCertificate {
    pub certificate_id: Uuid,
    pub document_id: i64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub latest_transaction_hash: String,
    /// Ledger tip hash at issuance.
    pub blockchain_proof: String,
    pub integrity_score: f64,
    pub compliance_checks: Vec<String>,
    pub issuer: String,
    pub certificate_hash: String,
    /// Keyless digest, same scheme as transaction signatures.
    pub signature: String,
}

impl DocumentCertificate {
    /// Issue a certificate for a verification result. Fails with
    /// `NotFound` when the document has no sealed transactions and with
    /// `Integrity` when it did not verify.
    pub fn issue(
        verification: &DocumentVerification,
        tip_hash: impl Into<String>,
        issuer: impl Into<String>,
    ) -> Result<Self> {
        let latest = verification.verification_history.last().ok_or_else(|| {
            LedgerError::NotFound(format!(
                "no transactions recorded for document {}",
                verification.document_id
            ))
        })?;
        if !verification.is_valid {
            return Err(LedgerError::Integrity {
                document_id: verification.document_id,
                score: verification.integrity_score,
            });
        }

        let issued_at = now_millis();
        let expires_at = issued_at
            .checked_add_months(Months::new(CERTIFICATE_VALIDITY_MONTHS))
            .ok_or_else(|| LedgerError::Validation("certificate expiry out of range".into()))?;

        let mut cert = Self {
            certificate_id: Uuid::new_v4(),
            document_id: verification.document_id,
            issued_at,
            expires_at,
            latest_transaction_hash: latest.hash.clone(),
            blockchain_proof: tip_hash.into(),
            integrity_score: verification.integrity_score,
            compliance_checks: COMPLIANCE_CHECKS.iter().map(|c| c.to_string()).collect(),
            issuer: issuer.into(),
            certificate_hash: String::new(),
            signature: String::new(),
        };
        cert.certificate_hash = cert.compute_hash();
        cert.signature = signature_for(&cert.certificate_hash, &cert.issuer, &cert.issued_at);
        Ok(cert)
    }

    pub fn compute_hash(&self) -> String {
        sha256_hex(&[&canonical::encode_certificate(self)])
    }

    /// Recompute hash and signature; says nothing about the ledger's current state.
    pub fn verify(&self) -> bool {
        self.compute_hash() == self.certificate_hash
            && signature_for(&self.certificate_hash, &self.issuer, &self.issued_at)
                == self.signature
    }

    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        at >= self.expires_at
    }
}
