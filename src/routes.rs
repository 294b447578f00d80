pub mod health;
pub mod root;
pub mod upgrade;
pub mod version;

use axum::http::Uri;

use crate::error::AppError;

pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {}", uri.path()))
}
