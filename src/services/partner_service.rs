use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::{
    audit::log_audit,
    entity::shops::{ActiveModel as ShopActive, Column as ShopCol, Entity as Shops},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_partner},
    models::Shop,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Current state of the caller's shop. A shop only exists after the first
/// successful catalog import.
pub async fn get_state(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Shop>> {
    ensure_partner(user)?;
    let shop = Shops::find()
        .filter(ShopCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "OK",
        shop_from_entity(shop),
        Some(Meta::empty()),
    ))
}

/// Pause or resume receiving orders. A paused shop's offers disappear from
/// the catalog and cannot be added to baskets.
pub async fn set_state(
    state: &AppState,
    user: &AuthUser,
    active: bool,
) -> AppResult<ApiResponse<Shop>> {
    ensure_partner(user)?;
    let shop = Shops::find()
        .filter(ShopCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut model: ShopActive = shop.into();
    model.active = Set(active);
    let shop = model.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "shop_state_change",
        Some("shops"),
        Some(serde_json::json!({ "shop_id": shop.id, "active": active })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Shop state updated",
        shop_from_entity(shop),
        Some(Meta::empty()),
    ))
}

fn shop_from_entity(model: crate::entity::shops::Model) -> Shop {
    Shop {
        id: model.id,
        name: model.name,
        user_id: model.user_id,
        active: model.active,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
