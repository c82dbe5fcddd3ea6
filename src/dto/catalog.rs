use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Category, Shop};

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryList {
    pub items: Vec<Category>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShopList {
    pub items: Vec<Shop>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductOffer {
    pub product_info_id: Uuid,
    pub product_name: String,
    pub category: String,
    pub shop_id: Uuid,
    pub shop_name: String,
    pub model: String,
    pub quantity: i32,
    pub price: i64,
    pub price_rrc: i64,
    pub parameters: Vec<OfferParameter>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OfferParameter {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductOfferList {
    pub items: Vec<ProductOffer>,
}
