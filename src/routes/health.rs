use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::types::AppState;

#[derive(Serialize, ToSchema)]
pub struct HealthBody {
    pub status: String,
    /// False until something creates the package directory; upgrades fail
    /// until then.
    pub package_dir_ready: bool,
}

#[utoipa::path(get, path = "/health", responses((status = 200, body = HealthBody)), tag = "System")]
pub async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    let package_dir_ready = tokio::fs::metadata(state.stager.package_dir())
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);

    Json(HealthBody {
        status: "ok".to_string(),
        package_dir_ready,
    })
}
