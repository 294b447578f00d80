use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct Greeting {
    #[serde(rename = "Hello")]
    pub hello: String,
}

#[utoipa::path(get, path = "/", responses((status = 200, body = Greeting)), tag = "System", operation_id = "readRoot")]
pub async fn root() -> Json<Greeting> {
    Json(Greeting {
        hello: "World".to_string(),
    })
}
