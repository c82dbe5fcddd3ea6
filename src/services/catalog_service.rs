use std::collections::HashMap;

use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    dto::catalog::{CategoryList, OfferParameter, ProductOffer, ProductOfferList, ShopList},
    error::AppResult,
    models::{Category, Shop},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items: Vec<Category> = sqlx::query_as("SELECT * FROM categories ORDER BY external_id")
        .fetch_all(&state.pool)
        .await?;
    Ok(ApiResponse::success(
        "OK",
        CategoryList { items },
        Some(Meta::empty()),
    ))
}

pub async fn list_shops(state: &AppState) -> AppResult<ApiResponse<ShopList>> {
    let items: Vec<Shop> =
        sqlx::query_as("SELECT * FROM shops WHERE active = TRUE ORDER BY name")
            .fetch_all(&state.pool)
            .await?;
    Ok(ApiResponse::success(
        "OK",
        ShopList { items },
        Some(Meta::empty()),
    ))
}

#[derive(FromRow)]
struct OfferRow {
    product_info_id: Uuid,
    product_name: String,
    category: String,
    shop_id: Uuid,
    shop_name: String,
    model: String,
    quantity: i32,
    price: i64,
    price_rrc: i64,
}

#[derive(FromRow)]
struct ParameterRow {
    product_info_id: Uuid,
    name: String,
    value: String,
}

/// Current offers from active shops, optionally narrowed to one shop and/or
/// one category (by the category's snapshot id).
pub async fn list_offers(
    state: &AppState,
    shop_id: Option<Uuid>,
    category_id: Option<i32>,
) -> AppResult<ApiResponse<ProductOfferList>> {
    let rows: Vec<OfferRow> = sqlx::query_as(
        r#"
        SELECT pi.id AS product_info_id, p.name AS product_name, c.name AS category,
               s.id AS shop_id, s.name AS shop_name,
               pi.model, pi.quantity, pi.price, pi.price_rrc
        FROM product_infos pi
        JOIN products p ON p.id = pi.product_id
        JOIN categories c ON c.id = p.category_id
        JOIN shops s ON s.id = pi.shop_id
        WHERE s.active = TRUE
          AND ($1::uuid IS NULL OR s.id = $1)
          AND ($2::int IS NULL OR c.external_id = $2)
        ORDER BY p.name, s.name
        "#,
    )
    .bind(shop_id)
    .bind(category_id)
    .fetch_all(&state.pool)
    .await?;

    let info_ids: Vec<Uuid> = rows.iter().map(|r| r.product_info_id).collect();
    let parameter_rows: Vec<ParameterRow> = sqlx::query_as(
        r#"
        SELECT pp.product_info_id, par.name, pp.value
        FROM product_parameters pp
        JOIN parameters par ON par.id = pp.parameter_id
        WHERE pp.product_info_id = ANY($1)
        ORDER BY par.name
        "#,
    )
    .bind(&info_ids)
    .fetch_all(&state.pool)
    .await?;

    let mut parameters: HashMap<Uuid, Vec<OfferParameter>> = HashMap::new();
    for row in parameter_rows {
        parameters
            .entry(row.product_info_id)
            .or_default()
            .push(OfferParameter {
                name: row.name,
                value: row.value,
            });
    }

    let items = rows
        .into_iter()
        .map(|row| ProductOffer {
            product_info_id: row.product_info_id,
            product_name: row.product_name,
            category: row.category,
            shop_id: row.shop_id,
            shop_name: row.shop_name,
            model: row.model,
            quantity: row.quantity,
            price: row.price,
            price_rrc: row.price_rrc,
            parameters: parameters.remove(&row.product_info_id).unwrap_or_default(),
        })
        .collect();

    Ok(ApiResponse::success(
        "OK",
        ProductOfferList { items },
        Some(Meta::empty()),
    ))
}
