use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, put},
};
use uuid::Uuid;

use crate::{
    dto::basket::{AddItemRequest, BasketView, UpdateItemRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::OrderItem,
    response::ApiResponse,
    services::basket_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(view_basket).post(add_item))
        .route("/items/{id}", put(update_item))
        .route("/items/{id}", delete(remove_item))
}

#[utoipa::path(
    get,
    path = "/api/basket",
    responses((status = 200, description = "Current basket with totals per shop", body = ApiResponse<BasketView>)),
    security(("bearer_auth" = [])),
    tag = "Basket"
)]
pub async fn view_basket(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<BasketView>>> {
    let resp = basket_service::view_basket(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/basket",
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Item added", body = ApiResponse<OrderItem>),
        (status = 404, description = "Unknown offer"),
        (status = 409, description = "Insufficient stock")
    ),
    security(("bearer_auth" = [])),
    tag = "Basket"
)]
pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddItemRequest>,
) -> AppResult<Json<ApiResponse<OrderItem>>> {
    let resp = basket_service::add_item(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/basket/items/{id}",
    params(("id" = Uuid, Path, description = "Order item ID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Quantity updated", body = ApiResponse<OrderItem>),
        (status = 403, description = "Item belongs to another user"),
        (status = 409, description = "Order is no longer a basket")
    ),
    security(("bearer_auth" = [])),
    tag = "Basket"
)]
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> AppResult<Json<ApiResponse<OrderItem>>> {
    let resp = basket_service::update_item(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/basket/items/{id}",
    params(("id" = Uuid, Path, description = "Order item ID")),
    responses(
        (status = 200, description = "Item removed"),
        (status = 403, description = "Item belongs to another user")
    ),
    security(("bearer_auth" = [])),
    tag = "Basket"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = basket_service::remove_item(&state, &user, id).await?;
    Ok(Json(resp))
}
