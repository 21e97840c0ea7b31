use axum::{
    Json,
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use ledgermerge_engine::EngineError;
use ledgermerge_storage::StorageError;

use crate::api_types::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{}", .0.body_text())]
    Body(#[from] BytesRejection),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Engine(e) => match e {
                EngineError::InvalidSnapshot(_) => StatusCode::BAD_REQUEST,
                EngineError::NoStagedSnapshot(_) => StatusCode::NOT_FOUND,
                EngineError::SnapshotTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                EngineError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                EngineError::MergeFailure(_) | EngineError::Staging(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Storage(StorageError::Unavailable { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(StorageError::InvalidSnapshot(_)) => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Body(e) => e.status(),
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
