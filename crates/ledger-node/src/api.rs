use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::{Action, Ledger, LedgerError, Metadata};
use ledger_storage::SledStore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger<SledStore>>,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize)]
struct Tip {
    height: u64,
    hash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRequest {
    pub document_id: Option<i64>,
    pub loan_application_id: Option<i64>,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub validator: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let status = match &err {
            LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::Integrity { .. } => StatusCode::CONFLICT,
            LedgerError::MiningTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("{err:#}");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Run a ledger call off the async workers; sealing is CPU-bound.
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Ledger<SledStore>) -> Result<T, LedgerError> + Send + 'static,
    T: Send + 'static,
{
    let ledger = Arc::clone(&state.ledger);
    tokio::task::spawn_blocking(move || f(&ledger))
        .await
        .map_err(|e| ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("ledger task failed: {e}"),
        })?
        .map_err(ApiError::from)
}

fn required(value: Option<i64>, field: &str) -> Result<i64, LedgerError> {
    value.ok_or_else(|| LedgerError::Validation(format!("{field} is required")))
}

fn not_found(what: String) -> ApiError {
    LedgerError::NotFound(what).into()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/transactions", post(record_transaction))
        .route("/transactions/{id}", get(transaction))
        .route("/transactions/{id}/proof", get(transaction_proof))
        .route("/blocks/seal", post(seal_pending))
        .route("/chain/tip", get(tip))
        .route("/chain/blocks/{index}", get(block))
        .route("/documents/{id}/verification", get(verify_document))
        .route("/documents/{id}/certificate", post(generate_certificate))
        .route("/stats", get(stats))
        .route("/audit", get(audit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn record_transaction(
    State(state): State<AppState>,
    payload: Result<Json<RecordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload.map_err(|rejection| LedgerError::Validation(rejection.body_text()))?;
    let document_id = required(req.document_id, "documentId")?;
    let loan_application_id = required(req.loan_application_id, "loanApplicationId")?;
    let action: Action = req.action.parse()?;
    let tx = blocking(&state, move |ledger| {
        ledger.record_transaction(
            document_id,
            loan_application_id,
            action,
            &req.validator,
            req.metadata,
        )
    })
    .await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

async fn seal_pending(State(state): State<AppState>) -> ApiResult<serde_json::Value> {
    let block = blocking(&state, |ledger| ledger.seal_pending()).await?;
    Ok(Json(json!({ "sealed": block.is_some(), "block": block })))
}

async fn transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ledger_core::Transaction> {
    state
        .ledger
        .transaction(id)
        .map(Json)
        .ok_or_else(|| not_found(format!("transaction {id}")))
}

async fn transaction_proof(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ledger_core::TransactionProof> {
    Ok(Json(state.ledger.transaction_proof(id)?))
}

async fn tip(State(state): State<AppState>) -> Json<Tip> {
    let latest = state.ledger.latest_block();
    Json(Tip {
        height: latest.index,
        hash: latest.hash,
    })
}

async fn block(
    State(state): State<AppState>,
    Path(index): Path<u64>,
) -> ApiResult<ledger_core::Block> {
    state
        .ledger
        .block(index)
        .map(Json)
        .ok_or_else(|| not_found(format!("block {index}")))
}

async fn verify_document(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ledger_core::DocumentVerification> {
    let verification = blocking(&state, move |ledger| Ok(ledger.verify_document_integrity(id))).await?;
    Ok(Json(verification))
}

async fn generate_certificate(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ledger_core::DocumentCertificate> {
    let cert = blocking(&state, move |ledger| ledger.generate_certificate(id)).await?;
    Ok(Json(cert))
}

async fn stats(State(state): State<AppState>) -> ApiResult<ledger_core::BlockchainStats> {
    Ok(Json(blocking(&state, |ledger| Ok(ledger.stats())).await?))
}

async fn audit(State(state): State<AppState>) -> ApiResult<ledger_core::AuditResult> {
    Ok(Json(blocking(&state, |ledger| Ok(ledger.audit_blockchain())).await?))
}
