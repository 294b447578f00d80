use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::{openapi, routes, types::AppState};

pub fn build_router(app_state: AppState) -> Router {

    Router::new()
        .route("/", get(routes::root::root))
        .route(routes::upgrade::AZ_CLI_PATH, get(routes::upgrade::az_cli))
        .route("/upgrade/az_cli", get(routes::upgrade::az_cli_without_slash))
        .route("/health", get(routes::health::health))
        .route("/version", get(routes::version::version))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .route("/api-docs/openapi.yaml", get(openapi::openapi_yaml))
        .fallback(routes::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)

}
