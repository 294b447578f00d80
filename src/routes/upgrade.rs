use axum::{
    Json,
    extract::State,
    http::{StatusCode, Uri},
    response::Redirect,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppError, staging::UpgradeScript, types::AppState};

pub const AZ_CLI_PATH: &str = "/upgrade/az_cli/";

#[derive(Serialize, ToSchema)]
pub struct UpgradeResponse {
    pub message: String,
    pub path: String,
    pub staged_at: DateTime<Utc>,
}

/// Hands the az cli upgrade script to the package directory. Running it is
/// left to the external upgrade agent.
#[utoipa::path(
    get,
    path = "/upgrade/az_cli/",
    responses(
        (status = 201, body = UpgradeResponse),
        (status = 500, description = "Writing, chmod or moving the script failed", body = String),
    ),
    tag = "Upgrade",
    operation_id = "upgradeAzCli"
)]
pub async fn az_cli(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<UpgradeResponse>), AppError> {
    let staged = state
        .stager
        .stage(&UpgradeScript::az_cli())
        .await
        .inspect_err(|err| tracing::error!(error = %err, "failed to stage az cli upgrade script"))?;

    Ok((
        StatusCode::CREATED,
        Json(UpgradeResponse {
            message: "az cli upgrade script staged".to_string(),
            path: staged.path.display().to_string(),
            staged_at: staged.staged_at,
        }),
    ))
}

pub async fn az_cli_without_slash(uri: Uri) -> Redirect {
    match uri.query() {
        Some(query) => Redirect::temporary(&format!("{AZ_CLI_PATH}?{query}")),
        None => Redirect::temporary(AZ_CLI_PATH),
    }
}
