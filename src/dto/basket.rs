use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemRequest {
    pub product_info_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BasketItem {
    pub id: Uuid,
    pub product_info_id: Option<Uuid>,
    pub shop_id: Uuid,
    pub shop_name: String,
    pub product_name: String,
    pub model: String,
    pub quantity: i32,
    pub price: i64,
    pub available: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShopSubtotal {
    pub shop_id: Uuid,
    pub shop_name: String,
    pub total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BasketView {
    pub order_id: Option<Uuid>,
    pub items: Vec<BasketItem>,
    pub totals_by_shop: Vec<ShopSubtotal>,
    pub total: i64,
}
