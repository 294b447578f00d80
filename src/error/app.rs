use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::error::StageError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            AppError::Internal(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("internal error: {}", err),
            )
                .into_response(),
        }
    }
}

impl From<StageError> for AppError {
    fn from(err: StageError) -> Self {
        AppError::Internal(err.into())
    }
}
