use axum::Json;

use crate::response::{ApiResponse, Meta};

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "Health"
)]
pub async fn health_check() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(
        "OK",
        serde_json::json!({ "status": "healthy" }),
        Some(Meta::empty()),
    ))
}
