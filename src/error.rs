use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::{auth::AuthError, db::DbError};

/// Failures surfaced at the request boundary. Bad form input is not an
/// `AppError`; handlers re-render the form instead.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("authentication required")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("relational store: {0}")]
    Store(#[from] DbError),
    #[error("session store: {0}")]
    Session(#[from] tower_sessions::session::Error),
    #[error("session layer is not installed")]
    MissingSession,
    #[error("template rendering: {0}")]
    Template(#[from] askama::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Store(db) => AppError::Store(db),
            AuthError::Session(e) => AppError::Session(e),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Store(e) if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, %status, "request failed");
        }
        // Internals stay in the log.
        let body = status.canonical_reason().unwrap_or("Error");
        (status, body).into_response()
    }
}
