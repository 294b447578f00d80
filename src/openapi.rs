use axum::{
    Json,
    http::header,
    response::IntoResponse,
};
use utoipa::OpenApi;

use crate::{error::AppError, routes};

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::root::root,
        routes::upgrade::az_cli,
        routes::health::health,
        routes::version::version,
    ),
    components(schemas(
        routes::root::Greeting,
        routes::upgrade::UpgradeResponse,
        routes::health::HealthBody,
        routes::version::VersionBody,
    )),
    tags(
        (name = "Upgrade"),
        (name = "System"),
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub async fn openapi_yaml() -> Result<impl IntoResponse, AppError> {
    let yaml = ApiDoc::openapi()
        .to_yaml()
        .map_err(|e| anyhow::anyhow!("failed to render openapi yaml: {e}"))?;
    Ok(([(header::CONTENT_TYPE, "application/yaml")], yaml))
}
