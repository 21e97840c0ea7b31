//! Axum router and handlers.
//!
//! `build_router` is the single entry point. Middleware is attached in
//! `main.rs` so tests can drive the bare router.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State, rejection::BytesRejection},
    routing::{get, post},
};
use tracing::info;

use ledgermerge_core::{Account, Category, TransactionEntry, TransferEntry, UploadToken};
use ledgermerge_storage::LedgerStore;

use crate::api_types::{
    CancelResponse, ConfirmResponse, HealthResponse, ImportStatusResponse, TransactionQuery,
    UploadResponse,
};
use crate::error::ApiError;
use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Build the application router wired to `state`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = usize::try_from(state.max_upload_bytes).unwrap_or(usize::MAX);

    Router::new()
        .route("/health", get(health))
        .route("/accounts", get(accounts))
        .route("/categories", get(categories))
        .route("/transactions", get(transactions))
        .route("/transfers", get(transfers))
        .route(
            "/import/upload",
            post(upload).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/import/:token", get(import_status))
        .route("/import/:token/confirm", post(confirm))
        .route("/import/:token/cancel", post(cancel))
        .with_state(state)
}

/// Run blocking store or staging work off the async executor.
async fn blocking<T, F>(st: &Arc<AppState>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> Result<T, ApiError> + Send + 'static,
{
    let st = Arc::clone(st);
    tokio::task::spawn_blocking(move || f(&st))
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
}

fn parse_token(raw: &str) -> Result<UploadToken, ApiError> {
    UploadToken::parse(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        service: st.build.service.to_string(),
        version: st.build.version.to_string(),
    })
}

pub(crate) async fn accounts(State(st): State<Arc<AppState>>) -> ApiResult<Vec<Account>> {
    blocking(&st, |st| st.with_store(|store| Ok(store.list_accounts()?)))
        .await
        .map(Json)
}

pub(crate) async fn categories(State(st): State<Arc<AppState>>) -> ApiResult<Vec<Category>> {
    blocking(&st, |st| st.with_store(|store| Ok(store.list_categories()?)))
        .await
        .map(Json)
}

pub(crate) async fn transactions(
    State(st): State<Arc<AppState>>,
    Query(query): Query<TransactionQuery>,
) -> ApiResult<Vec<TransactionEntry>> {
    blocking(&st, move |st| {
        st.with_store(|store| Ok(store.list_transactions(query.note.as_deref())?))
    })
    .await
    .map(Json)
}

pub(crate) async fn transfers(State(st): State<Arc<AppState>>) -> ApiResult<Vec<TransferEntry>> {
    blocking(&st, |st| st.with_store(|store| Ok(store.list_transfers()?)))
        .await
        .map(Json)
}

/// Takes the body as a `Result` so an over-limit upload still gets a JSON error.
pub(crate) async fn upload(
    State(st): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<UploadResponse> {
    let body = body?;
    let size = body.len();
    let (token, diff) = blocking(&st, move |st| {
        st.with_import(|importer, store| Ok(importer.upload(&*store, &body)?))
    })
    .await?;
    info!(%token, size, "upload staged");
    Ok(Json(UploadResponse { token, diff }))
}

pub(crate) async fn import_status(
    State(st): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> ApiResult<ImportStatusResponse> {
    let token = parse_token(&raw)?;
    let state = blocking(&st, move |st| st.with_importer(|importer| importer.state(token)))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("unknown upload {token}")))?;
    Ok(Json(ImportStatusResponse { token, state }))
}

pub(crate) async fn confirm(
    State(st): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> ApiResult<ConfirmResponse> {
    let token = parse_token(&raw)?;
    let result = blocking(&st, move |st| {
        st.with_import(|importer, store| Ok(importer.confirm(store, token)?))
    })
    .await?;
    Ok(Json(ConfirmResponse {
        success: true,
        result,
    }))
}

pub(crate) async fn cancel(
    State(st): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> ApiResult<CancelResponse> {
    let token = parse_token(&raw)?;
    let success = blocking(&st, move |st| st.with_importer(|importer| importer.cancel(token))).await?;
    Ok(Json(CancelResponse { success }))
}
