use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::catalog::{CategoryList, ProductOfferList, ShopList},
    error::AppResult,
    response::ApiResponse,
    routes::params::OfferQuery,
    services::catalog_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/shops", get(list_shops))
        .route("/products", get(list_offers))
}

#[utoipa::path(
    get,
    path = "/api/catalog/categories",
    responses((status = 200, description = "All categories", body = ApiResponse<CategoryList>)),
    tag = "Catalog"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = catalog_service::list_categories(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/catalog/shops",
    responses((status = 200, description = "Active shops", body = ApiResponse<ShopList>)),
    tag = "Catalog"
)]
pub async fn list_shops(State(state): State<AppState>) -> AppResult<Json<ApiResponse<ShopList>>> {
    let resp = catalog_service::list_shops(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/catalog/products",
    params(
        ("shop_id" = Option<uuid::Uuid>, Query, description = "Filter by shop"),
        ("category_id" = Option<i32>, Query, description = "Filter by snapshot category id")
    ),
    responses((status = 200, description = "Offers from active shops", body = ApiResponse<ProductOfferList>)),
    tag = "Catalog"
)]
pub async fn list_offers(
    State(state): State<AppState>,
    Query(query): Query<OfferQuery>,
) -> AppResult<Json<ApiResponse<ProductOfferList>>> {
    let resp = catalog_service::list_offers(&state, query.shop_id, query.category_id).await?;
    Ok(Json(resp))
}
