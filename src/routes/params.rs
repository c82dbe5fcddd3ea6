use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct OfferQuery {
    pub shop_id: Option<Uuid>,
    /// Category id as carried by partner snapshots.
    pub category_id: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShopStateRequest {
    pub active: bool,
}
