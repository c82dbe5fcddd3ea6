use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, Set, TransactionTrait,
};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::basket::{AddItemRequest, BasketItem, BasketView, ShopSubtotal, UpdateItemRequest},
    entity::{
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        product_infos::Entity as ProductInfos,
        products::Entity as Products,
        shops::Entity as Shops,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{OrderItem, OrderStatus},
    response::{ApiResponse, Meta},
    services::order_service::{committed_quantity, order_item_from_entity},
    state::AppState,
};

/// Add an offer to the caller's basket, creating the basket order on first
/// use. The stock check here is advisory; placement re-checks under locks.
pub async fn add_item(
    state: &AppState,
    user: &AuthUser,
    payload: AddItemRequest,
) -> AppResult<ApiResponse<OrderItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::Validation(
            "quantity must be greater than 0".into(),
        ));
    }

    let txn = state.orm.begin().await?;

    let info = ProductInfos::find_by_id(payload.product_info_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    // Paused shops are withdrawn from sale entirely.
    let shop = info
        .find_related(Shops)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if !shop.active {
        return Err(AppError::NotFound);
    }

    let product = info
        .find_related(Products)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let basket = match Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .filter(OrderCol::Status.eq(OrderStatus::Basket.as_str()))
        .one(&txn)
        .await?
    {
        Some(order) => order,
        None => {
            OrderActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                status: Set(OrderStatus::Basket.as_str().to_string()),
                contact_id: Set(None),
                created_at: NotSet,
                updated_at: NotSet,
            }
            .insert(&txn)
            .await?
        }
    };

    let existing = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(basket.id))
        .filter(OrderItemCol::ProductInfoId.eq(info.id))
        .one(&txn)
        .await?;
    let requested = payload
        .quantity
        .checked_add(existing.as_ref().map_or(0, |i| i.quantity))
        .ok_or_else(|| AppError::Validation("quantity is too large".into()))?;

    let committed = committed_quantity(&txn, info.id).await?;
    let available = i64::from(info.quantity) - committed;
    if i64::from(requested) > available {
        return Err(AppError::InsufficientStock {
            item: info.id,
            requested,
            available: available.clamp(0, i64::from(i32::MAX)) as i32,
        });
    }

    let item = match existing {
        Some(item) => {
            let mut active: OrderItemActive = item.into();
            active.quantity = Set(requested);
            active.update(&txn).await?
        }
        None => {
            OrderItemActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(basket.id),
                product_info_id: Set(Some(info.id)),
                shop_id: Set(info.shop_id),
                product_name: Set(product.name),
                model: Set(info.model.clone()),
                quantity: Set(payload.quantity),
                price: Set(info.price),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?
        }
    };

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "basket_add",
        Some("order_items"),
        Some(serde_json::json!({ "product_info_id": payload.product_info_id, "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("OK", order_item_from_entity(item), None))
}

/// Change the quantity of one basket line.
pub async fn update_item(
    state: &AppState,
    user: &AuthUser,
    order_item_id: Uuid,
    payload: UpdateItemRequest,
) -> AppResult<ApiResponse<OrderItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::Validation(
            "quantity must be greater than 0".into(),
        ));
    }

    let txn = state.orm.begin().await?;
    let (item, _) = owned_basket_item(&txn, user, order_item_id).await?;

    let mut active: OrderItemActive = item.into();
    active.quantity = Set(payload.quantity);
    let item = active.update(&txn).await?;
    txn.commit().await?;

    Ok(ApiResponse::success(
        "OK",
        order_item_from_entity(item),
        None,
    ))
}

pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    order_item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let txn = state.orm.begin().await?;
    let (item, _) = owned_basket_item(&txn, user, order_item_id).await?;

    item.delete(&txn).await?;
    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "basket_remove",
        Some("order_items"),
        Some(serde_json::json!({ "order_item_id": order_item_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Removed from basket",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Fetch an order item and verify it sits in a basket owned by the caller.
async fn owned_basket_item(
    txn: &sea_orm::DatabaseTransaction,
    user: &AuthUser,
    order_item_id: Uuid,
) -> AppResult<(
    crate::entity::order_items::Model,
    crate::entity::orders::Model,
)> {
    let item = OrderItems::find_by_id(order_item_id)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let order = Orders::find_by_id(item.order_id)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if order.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    if order.status != OrderStatus::Basket.as_str() {
        return Err(AppError::StateConflict(
            "order is no longer a basket".into(),
        ));
    }
    Ok((item, order))
}

#[derive(FromRow)]
struct BasketRow {
    id: Uuid,
    product_info_id: Option<Uuid>,
    shop_id: Uuid,
    shop_name: String,
    product_name: String,
    model: String,
    quantity: i32,
    price: i64,
    available: i32,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

/// Basket with live prices and availability, plus per-shop subtotals.
pub async fn view_basket(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<BasketView>> {
    let order_id: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM orders WHERE user_id = $1 AND status = 'basket'")
            .bind(user.user_id)
            .fetch_optional(&state.pool)
            .await?;

    // `available` matches the placement check: offer stock minus units
    // already committed to placed, non-canceled orders.
    let rows: Vec<BasketRow> = sqlx::query_as(
        r#"
        SELECT oi.id, oi.product_info_id, oi.shop_id, s.name AS shop_name,
               oi.product_name, oi.model, oi.quantity,
               COALESCE(pi.price, oi.price) AS price,
               GREATEST(COALESCE(pi.quantity, 0) - COALESCE(c.committed, 0), 0)::int AS available,
               oi.created_at
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        JOIN shops s ON s.id = oi.shop_id
        LEFT JOIN product_infos pi ON pi.id = oi.product_info_id
        LEFT JOIN (
            SELECT ci.product_info_id, SUM(ci.quantity) AS committed
            FROM order_items ci
            JOIN orders co ON co.id = ci.order_id
            WHERE co.status NOT IN ('basket', 'canceled')
            GROUP BY ci.product_info_id
        ) c ON c.product_info_id = oi.product_info_id
        WHERE o.user_id = $1 AND o.status = 'basket'
        ORDER BY oi.created_at
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    let mut items = Vec::with_capacity(rows.len());
    let mut totals: Vec<ShopSubtotal> = Vec::new();
    let mut total = 0i64;
    for row in rows {
        let line_total = row.price * i64::from(row.quantity);
        total += line_total;
        match totals.iter_mut().find(|t| t.shop_id == row.shop_id) {
            Some(subtotal) => subtotal.total += line_total,
            None => totals.push(ShopSubtotal {
                shop_id: row.shop_id,
                shop_name: row.shop_name.clone(),
                total: line_total,
            }),
        }
        items.push(BasketItem {
            id: row.id,
            product_info_id: row.product_info_id,
            shop_id: row.shop_id,
            shop_name: row.shop_name,
            product_name: row.product_name,
            model: row.model,
            quantity: row.quantity,
            price: row.price,
            available: row.available,
        });
    }

    Ok(ApiResponse::success(
        "OK",
        BasketView {
            order_id: order_id.map(|(id,)| id),
            items,
            totals_by_shop: totals,
            total,
        },
        Some(Meta::empty()),
    ))
}
