//! Request and response bodies for the HTTP endpoints.

use serde::{Deserialize, Serialize};

use ledgermerge_core::UploadToken;
use ledgermerge_engine::{DiffReport, ImportState, MergeStats};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `GET /transactions?note=...`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionQuery {
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub token: UploadToken,
    pub diff: DiffReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStatusResponse {
    pub token: UploadToken,
    pub state: ImportState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmResponse {
    pub success: bool,
    pub result: MergeStats,
}

/// `success` is false when nothing was staged under the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub success: bool,
}
