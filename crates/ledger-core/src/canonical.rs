//! Deterministic byte encodings that every ledger hash is computed over.
//!
//! Field order is fixed here and object keys are sorted at every nesting
//! level, so the output never depends on map iteration order.

use serde_json::{json, Map, Value};

use crate::certificate::DocumentCertificate;
use crate::format_timestamp;
use crate::transaction::Transaction;

/// Rebuild `value` with object keys sorted recursively.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = Map::new();
            for (key, inner) in entries {
                out.insert(key.clone(), canonicalize(inner));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Encode the hashed fields of a transaction (everything but `hash` and
/// `signature`) as a compact JSON array.
pub fn encode_transaction(tx: &Transaction) -> Vec<u8> {
    let metadata: Map<String, Value> = tx
        .metadata
        .iter()
        .map(|(key, value)| (key.clone(), canonicalize(value)))
        .collect();
    let fields = json!([
        tx.id.to_string(),
        tx.document_id,
        tx.loan_application_id,
        tx.action.as_str(),
        tx.validator,
        format_timestamp(&tx.timestamp),
        tx.previous_hash,
        Value::Object(metadata),
    ]);
    fields.to_string().into_bytes()
}

/// Encode the attested fields of a certificate (everything but its own hash
/// and signature).
pub fn encode_certificate(cert: &DocumentCertificate) -> Vec<u8> {
    let fields = json!([
        cert.certificate_id.to_string(),
        cert.document_id,
        format_timestamp(&cert.issued_at),
        format_timestamp(&cert.expires_at),
        cert.latest_transaction_hash,
        cert.blockchain_proof,
        cert.integrity_score,
        cert.compliance_checks,
        cert.issuer,
    ]);
    fields.to_string().into_bytes()
}
