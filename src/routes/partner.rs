use axum::{Json, Router, extract::State, routing::{get, post}};

use crate::{
    dto::import::{CatalogSnapshot, ImportSummary},
    dto::orders::OrderList,
    error::AppResult,
    middleware::auth::AuthUser,
    models::Shop,
    response::ApiResponse,
    routes::params::ShopStateRequest,
    services::{import_service, order_service, partner_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/update", post(import_catalog))
        .route("/state", get(get_state).post(set_state))
        .route("/orders", get(list_orders))
}

#[utoipa::path(
    post,
    path = "/api/partner/update",
    request_body = CatalogSnapshot,
    responses(
        (status = 200, description = "Catalog replaced from snapshot", body = ApiResponse<ImportSummary>),
        (status = 400, description = "Malformed snapshot"),
        (status = 403, description = "Not a partner account")
    ),
    security(("bearer_auth" = [])),
    tag = "Partner"
)]
pub async fn import_catalog(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CatalogSnapshot>,
) -> AppResult<Json<ApiResponse<ImportSummary>>> {
    let resp = import_service::import_catalog(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/partner/state",
    responses(
        (status = 200, description = "Current shop state", body = ApiResponse<Shop>),
        (status = 404, description = "No shop imported yet")
    ),
    security(("bearer_auth" = [])),
    tag = "Partner"
)]
pub async fn get_state(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Shop>>> {
    let resp = partner_service::get_state(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/partner/state",
    request_body = ShopStateRequest,
    responses((status = 200, description = "Shop paused or resumed", body = ApiResponse<Shop>)),
    security(("bearer_auth" = [])),
    tag = "Partner"
)]
pub async fn set_state(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ShopStateRequest>,
) -> AppResult<Json<ApiResponse<Shop>>> {
    let resp = partner_service::set_state(&state, &user, payload.active).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/partner/orders",
    responses((status = 200, description = "Orders containing this partner's items, projected to them", body = ApiResponse<OrderList>)),
    security(("bearer_auth" = [])),
    tag = "Partner"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders_for_partner(&state, &user).await?;
    Ok(Json(resp))
}
