//! RPC error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ballot_registry::RegistryError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("missing or empty voter identity header")]
    MissingIdentity,

    #[error("metrics are not enabled on this node")]
    MetricsDisabled,

    #[error("server error: {0}")]
    Server(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Registry(e) => match e {
                RegistryError::UnknownSession(_) => StatusCode::NOT_FOUND,
                RegistryError::InsufficientCandidates { .. }
                | RegistryError::InvalidDuration
                | RegistryError::DuplicateCandidate(_)
                | RegistryError::InvalidCandidateIndex { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                RegistryError::SessionNotActive
                | RegistryError::SessionEnded
                | RegistryError::AlreadyVoted(_)
                | RegistryError::AlreadyFinalized
                | RegistryError::SessionStillActive
                | RegistryError::ResultsNotReady => StatusCode::CONFLICT,
                RegistryError::Snapshot(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::MissingIdentity => StatusCode::UNAUTHORIZED,
            Self::MetricsDisabled => StatusCode::NOT_FOUND,
            Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Registry(e) => e.kind(),
            Self::InvalidRequest(_) => "InvalidRequest",
            Self::MissingIdentity => "MissingIdentity",
            Self::MetricsDisabled => "MetricsDisabled",
            Self::Server(_) => "Server",
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
