use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Full point-in-time catalog listing uploaded by a partner.
/// Fetching it from a URL is the request layer's job; the core only ever
/// sees the parsed payload.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CatalogSnapshot {
    pub shop: String,
    pub categories: Vec<SnapshotCategory>,
    pub goods: Vec<SnapshotGood>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SnapshotCategory {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SnapshotGood {
    /// Supplier SKU.
    pub id: i32,
    pub category: i32,
    pub name: String,
    pub model: String,
    pub quantity: i32,
    pub price: i64,
    pub price_rrc: i64,
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportSummary {
    pub shop_id: uuid::Uuid,
    pub shop: String,
    pub categories: usize,
    pub products: usize,
    pub product_infos: usize,
    pub parameters: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_snapshot_payload() {
        let raw = serde_json::json!({
            "shop": "Connect",
            "categories": [{"id": 1, "name": "Smartphones"}],
            "goods": [{
                "id": 1,
                "category": 1,
                "name": "iPhone 14",
                "model": "A2",
                "quantity": 5,
                "price": 80000,
                "price_rrc": 85000,
                "parameters": {"Color": "black", "RAM": 6}
            }]
        });
        let snapshot: CatalogSnapshot = serde_json::from_value(raw).unwrap();
        assert_eq!(snapshot.shop, "Connect");
        assert_eq!(snapshot.categories.len(), 1);
        let good = &snapshot.goods[0];
        assert_eq!(good.price, 80000);
        assert_eq!(good.parameters.len(), 2);
    }

    #[test]
    fn parameters_default_to_empty() {
        let raw = serde_json::json!({
            "shop": "Connect",
            "categories": [],
            "goods": [{
                "id": 7, "category": 1, "name": "Cable", "model": "usb-c",
                "quantity": 10, "price": 500, "price_rrc": 600
            }]
        });
        let snapshot: CatalogSnapshot = serde_json::from_value(raw).unwrap();
        assert!(snapshot.goods[0].parameters.is_empty());
    }
}
