use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

use crate::types::AppState;

#[derive(Serialize, ToSchema)]
pub struct VersionBody {
    service: String,
    version: String,
}

#[utoipa::path(get, path = "/version", responses((status = 200, body = VersionBody)), tag = "System")]
pub async fn version(State(state): State<AppState>) -> Json<VersionBody> {
    Json(VersionBody {
        service: env!("CARGO_PKG_NAME").to_string(),
        version: state.version,
    })
}
