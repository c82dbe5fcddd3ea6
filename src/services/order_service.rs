use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, JoinType,
    PaginatorTrait, QueryFilter, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{OrderList, OrderWithItems, PlaceOrderRequest, StatusUpdateRequest},
    entity::{
        contacts::{Column as ContactCol, Entity as Contacts},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel, Relation as OrderItemRelation,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
        product_infos::{Column as ProductInfoCol, Entity as ProductInfos},
        shops::Column as ShopCol,
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    events::NotificationEvent,
    middleware::auth::AuthUser,
    models::{Order, OrderItem, OrderStatus},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Quantity already promised to placed, non-canceled orders for one offer.
/// The stock invariant is checked against `ProductInfo.quantity` minus this,
/// since placement never decrements the partner's stock figure itself.
pub(crate) async fn committed_quantity<C: ConnectionTrait>(
    conn: &C,
    product_info_id: Uuid,
) -> Result<i64, sea_orm::DbErr> {
    #[derive(Debug, FromQueryResult)]
    struct SumRow {
        total: Option<i64>,
    }

    let row = OrderItems::find()
        .select_only()
        .column_as(OrderItemCol::Quantity.sum(), "total")
        .join(JoinType::InnerJoin, OrderItemRelation::Orders.def())
        .filter(OrderItemCol::ProductInfoId.eq(product_info_id))
        .filter(OrderCol::Status.ne(OrderStatus::Basket.as_str()))
        .filter(OrderCol::Status.ne(OrderStatus::Canceled.as_str()))
        .into_model::<SumRow>()
        .one(conn)
        .await?;

    Ok(row.and_then(|r| r.total).unwrap_or(0))
}

/// Convert the caller's basket into a placed order.
///
/// The stock re-check runs under row locks on the involved offers, so two
/// placements racing for the same last unit serialize and only one wins.
/// Item rows are frozen (price, model, shop) from the live offers at this
/// moment; later re-imports cannot change what was ordered.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .filter(OrderCol::Status.eq(OrderStatus::Basket.as_str()))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&txn)
        .await?;
    if items.is_empty() {
        return Err(AppError::Validation("basket is empty".into()));
    }

    let contact = Contacts::find_by_id(payload.contact_id)
        .filter(ContactCol::UserId.eq(user.user_id))
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    // Deterministic lock order across concurrent placements.
    let mut info_ids: Vec<Uuid> = items.iter().filter_map(|i| i.product_info_id).collect();
    info_ids.sort();
    let infos = ProductInfos::find()
        .filter(ProductInfoCol::Id.is_in(info_ids))
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    let info_map: HashMap<Uuid, _> = infos.into_iter().map(|i| (i.id, i)).collect();

    let mut frozen_items: Vec<OrderItemModel> = Vec::with_capacity(items.len());
    for item in items {
        let info = item
            .product_info_id
            .and_then(|id| info_map.get(&id))
            .ok_or(AppError::InsufficientStock {
                item: item.id,
                requested: item.quantity,
                available: 0,
            })?;

        let committed = committed_quantity(&txn, info.id).await?;
        let available = i64::from(info.quantity) - committed;
        if i64::from(item.quantity) > available {
            return Err(AppError::InsufficientStock {
                item: item.id,
                requested: item.quantity,
                available: available.clamp(0, i64::from(i32::MAX)) as i32,
            });
        }

        let price = info.price;
        let model = info.model.clone();
        let shop_id = info.shop_id;
        let mut active: OrderItemActive = item.into();
        active.price = Set(price);
        active.model = Set(model);
        active.shop_id = Set(shop_id);
        frozen_items.push(active.update(&txn).await?);
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::New.as_str().to_string());
    active.contact_id = Set(Some(contact.id));
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    // Event emission stays strictly after commit: a dispatcher failure must
    // never roll back a placed order.
    if let Some(owner) = Users::find_by_id(order.user_id).one(&state.orm).await? {
        state.events.emit(NotificationEvent::OrderPlaced {
            user_id: owner.id,
            email: owner.email,
            order_id: order.id,
        });
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_placed",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let items: Vec<OrderItem> = frozen_items.into_iter().map(order_item_from_entity).collect();
    let total = items.iter().map(|i| i.price * i64::from(i.quantity)).sum();
    Ok(ApiResponse::success(
        "Order placed",
        OrderWithItems {
            order: order_from_entity(order),
            items,
            total,
        },
        Some(Meta::empty()),
    ))
}

/// Advance an order along its lifecycle or cancel it.
///
/// Partners may drive orders that contain at least one of their shop's items,
/// admins may drive any order, and the owning buyer may only cancel while the
/// order is still `new` or `confirmed`. Backward moves are rejected before
/// any write, so no status-changed event fires for them.
pub async fn update_status(
    state: &AppState,
    actor: &AuthUser,
    order_id: Uuid,
    payload: StatusUpdateRequest,
) -> AppResult<ApiResponse<Order>> {
    let new_status = OrderStatus::parse(&payload.status)
        .ok_or_else(|| AppError::Validation(format!("unknown status {:?}", payload.status)))?;

    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let current = OrderStatus::parse(&order.status)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("corrupt order status: {}", order.status)))?;

    let allowed = if actor.is_admin() {
        true
    } else if order.user_id == actor.user_id {
        new_status == OrderStatus::Canceled
            && matches!(current, OrderStatus::New | OrderStatus::Confirmed)
    } else if actor.is_partner() {
        partner_owns_items(&txn, order.id, actor.user_id).await?
    } else {
        false
    };
    if !allowed {
        return Err(AppError::Forbidden);
    }

    if !current.can_transition_to(new_status) {
        return Err(AppError::StateConflict(format!(
            "cannot move order from {current} to {new_status}"
        )));
    }

    let mut active: OrderActive = order.into();
    active.status = Set(new_status.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    if let Some(owner) = Users::find_by_id(order.user_id).one(&state.orm).await? {
        state.events.emit(NotificationEvent::OrderStatusChanged {
            user_id: owner.id,
            email: owner.email,
            order_id: order.id,
            old_status: current.as_str().to_string(),
            new_status: new_status.as_str().to_string(),
        });
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(actor.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": order.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order updated",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

async fn partner_owns_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    partner_id: Uuid,
) -> Result<bool, sea_orm::DbErr> {
    let count = OrderItems::find()
        .join(JoinType::InnerJoin, OrderItemRelation::Shops.def())
        .filter(OrderItemCol::OrderId.eq(order_id))
        .filter(ShopCol::UserId.eq(partner_id))
        .count(conn)
        .await?;
    Ok(count > 0)
}

/// Placed orders of one buyer, baskets excluded.
pub async fn list_orders_for_user(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderList>> {
    let orders: Vec<Order> = sqlx::query_as(
        "SELECT * FROM orders WHERE user_id = $1 AND status <> 'basket' ORDER BY created_at DESC",
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items: Vec<OrderItem> =
        sqlx::query_as("SELECT * FROM order_items WHERE order_id = ANY($1)")
            .bind(&order_ids)
            .fetch_all(&state.pool)
            .await?;

    Ok(ApiResponse::success(
        "Orders",
        group_orders(orders, items),
        Some(Meta::empty()),
    ))
}

/// Orders visible to a partner: every placed order holding at least one item
/// from the partner's shop, projected down to that partner's items and their
/// partial total. Other partners' lines in a shared order stay hidden.
pub async fn list_orders_for_partner(
    state: &AppState,
    partner: &AuthUser,
) -> AppResult<ApiResponse<OrderList>> {
    let orders: Vec<Order> = sqlx::query_as(
        r#"
        SELECT DISTINCT o.*
        FROM orders o
        JOIN order_items oi ON oi.order_id = o.id
        JOIN shops s ON s.id = oi.shop_id
        WHERE s.user_id = $1 AND o.status <> 'basket'
        "#,
    )
    .bind(partner.user_id)
    .fetch_all(&state.pool)
    .await?;

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items: Vec<OrderItem> = sqlx::query_as(
        r#"
        SELECT oi.*
        FROM order_items oi
        JOIN shops s ON s.id = oi.shop_id
        WHERE oi.order_id = ANY($1) AND s.user_id = $2
        "#,
    )
    .bind(&order_ids)
    .bind(partner.user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Orders",
        group_orders(orders, items),
        Some(Meta::empty()),
    ))
}

/// Single order for its owner (or an admin), with frozen item snapshots.
pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order: Option<Order> = if user.is_admin() {
        sqlx::query_as("SELECT * FROM orders WHERE id = $1 AND status <> 'basket'")
            .bind(id)
            .fetch_optional(&state.pool)
            .await?
    } else {
        sqlx::query_as(
            "SELECT * FROM orders WHERE id = $1 AND user_id = $2 AND status <> 'basket'",
        )
        .bind(id)
        .bind(user.user_id)
        .fetch_optional(&state.pool)
        .await?
    };
    let order = order.ok_or(AppError::NotFound)?;

    let items: Vec<OrderItem> =
        sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY created_at")
            .bind(order.id)
            .fetch_all(&state.pool)
            .await?;

    let total = items.iter().map(|i| i.price * i64::from(i.quantity)).sum();
    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order,
            items,
            total,
        },
        Some(Meta::empty()),
    ))
}

fn group_orders(orders: Vec<Order>, items: Vec<OrderItem>) -> OrderList {
    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }
    let items = orders
        .into_iter()
        .map(|order| {
            let items = by_order.remove(&order.id).unwrap_or_default();
            let total = items.iter().map(|i| i.price * i64::from(i.quantity)).sum();
            OrderWithItems {
                order,
                items,
                total,
            }
        })
        .collect();
    OrderList { items }
}

fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        status: model.status,
        contact_id: model.contact_id,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_info_id: model.product_info_id,
        shop_id: model.shop_id,
        product_name: model.product_name,
        model: model.model,
        quantity: model.quantity,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
