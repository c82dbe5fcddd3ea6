use std::collections::{HashMap, HashSet};

use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{LockType, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::import::{CatalogSnapshot, ImportSummary, SnapshotGood},
    entity::{
        categories::{ActiveModel as CategoryActive, Column as CategoryCol, Entity as Categories},
        parameters::{ActiveModel as ParameterActive, Column as ParameterCol, Entity as Parameters},
        product_infos::{ActiveModel as ProductInfoActive, Column as ProductInfoCol, Entity as ProductInfos},
        product_parameters::ActiveModel as ProductParameterActive,
        products::{ActiveModel as ProductActive, Column as ProductCol, Entity as Products},
        shop_categories::{ActiveModel as ShopCategoryActive, Column as ShopCategoryCol, Entity as ShopCategories},
        shops::{ActiveModel as ShopActive, Column as ShopCol, Entity as Shops},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_partner},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Ingest a partner's catalog snapshot and reconcile it into the store.
///
/// Shop and category upserts happen first; the shop's offer rows are then
/// replaced inside a single transaction, so readers either see the previous
/// catalog or the new one, never a half-imported mix.
pub async fn import_catalog(
    state: &AppState,
    user: &AuthUser,
    snapshot: CatalogSnapshot,
) -> AppResult<ApiResponse<ImportSummary>> {
    ensure_partner(user)?;
    validate_snapshot(&snapshot)?;

    // Resolve the shop by partner identity, never by name: a name collision
    // must not let one partner overwrite another partner's catalog.
    let shop = match Shops::find()
        .filter(ShopCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
    {
        Some(existing) => {
            if existing.name != snapshot.shop {
                let mut active: ShopActive = existing.into();
                active.name = Set(snapshot.shop.clone());
                active.update(&state.orm).await?
            } else {
                existing
            }
        }
        None => {
            ShopActive {
                id: Set(Uuid::new_v4()),
                name: Set(snapshot.shop.clone()),
                user_id: Set(user.user_id),
                active: Set(true),
                created_at: NotSet,
            }
            .insert(&state.orm)
            .await?
        }
    };

    // Categories are upserted by their snapshot id and linked additively;
    // links are never removed so other shops keep their references.
    let mut category_ids: HashMap<i32, Uuid> = HashMap::new();
    for category in &snapshot.categories {
        let row = match Categories::find()
            .filter(CategoryCol::ExternalId.eq(category.id))
            .one(&state.orm)
            .await?
        {
            Some(existing) => {
                if existing.name != category.name {
                    let mut active: CategoryActive = existing.into();
                    active.name = Set(category.name.clone());
                    active.update(&state.orm).await?
                } else {
                    existing
                }
            }
            None => {
                CategoryActive {
                    id: Set(Uuid::new_v4()),
                    external_id: Set(category.id),
                    name: Set(category.name.clone()),
                }
                .insert(&state.orm)
                .await?
            }
        };
        category_ids.insert(category.id, row.id);

        // Idempotent link: concurrent imports may race on the same pair.
        ShopCategories::insert(ShopCategoryActive {
            shop_id: Set(shop.id),
            category_id: Set(row.id),
        })
        .on_conflict(
            OnConflict::columns([ShopCategoryCol::ShopId, ShopCategoryCol::CategoryId])
                .do_nothing()
                .to_owned(),
        )
        .do_nothing()
        .exec(&state.orm)
        .await?;
    }

    let txn = state.orm.begin().await?;

    // Row lock on the shop serializes concurrent imports for the same shop,
    // so the delete-then-insert below cannot interleave.
    Shops::find_by_id(shop.id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    // Replace semantics: drop every offer this shop currently has. Product
    // parameter rows go with them via the cascade; order item references are
    // nulled out and keep their own frozen snapshot.
    ProductInfos::delete_many()
        .filter(ProductInfoCol::ShopId.eq(shop.id))
        .exec(&txn)
        .await?;

    let mut products_seen: HashSet<Uuid> = HashSet::new();
    let mut parameter_rows = 0usize;

    for good in &snapshot.goods {
        let category_id = *category_ids.get(&good.category).ok_or_else(|| {
            AppError::Validation(format!(
                "good {}: references unknown category {}",
                good.id, good.category
            ))
        })?;

        let product = match Products::find()
            .filter(ProductCol::Name.eq(&good.name))
            .filter(ProductCol::CategoryId.eq(category_id))
            .one(&txn)
            .await?
        {
            Some(p) => p,
            None => {
                ProductActive {
                    id: Set(Uuid::new_v4()),
                    name: Set(good.name.clone()),
                    category_id: Set(category_id),
                }
                .insert(&txn)
                .await?
            }
        };
        products_seen.insert(product.id);

        let info = ProductInfoActive {
            id: Set(Uuid::new_v4()),
            product_id: Set(product.id),
            shop_id: Set(shop.id),
            external_id: Set(good.id),
            model: Set(good.model.clone()),
            quantity: Set(good.quantity),
            price: Set(good.price),
            price_rrc: Set(good.price_rrc),
        }
        .insert(&txn)
        .await?;

        for (name, value) in &good.parameters {
            let parameter = match Parameters::find()
                .filter(ParameterCol::Name.eq(name))
                .one(&txn)
                .await?
            {
                Some(p) => p,
                None => {
                    ParameterActive {
                        id: Set(Uuid::new_v4()),
                        name: Set(name.clone()),
                    }
                    .insert(&txn)
                    .await?
                }
            };
            ProductParameterActive {
                id: Set(Uuid::new_v4()),
                product_info_id: Set(info.id),
                parameter_id: Set(parameter.id),
                value: Set(parameter_value(value)),
            }
            .insert(&txn)
            .await?;
            parameter_rows += 1;
        }
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "catalog_import",
        Some("product_infos"),
        Some(serde_json::json!({ "shop_id": shop.id, "goods": snapshot.goods.len() })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    tracing::info!(shop = %shop.name, goods = snapshot.goods.len(), "catalog imported");

    let summary = ImportSummary {
        shop_id: shop.id,
        shop: shop.name,
        categories: snapshot.categories.len(),
        products: products_seen.len(),
        product_infos: snapshot.goods.len(),
        parameters: parameter_rows,
    };
    Ok(ApiResponse::success(
        "Catalog imported",
        summary,
        Some(Meta::empty()),
    ))
}

/// Reject malformed snapshots before any write, naming the offending item.
fn validate_snapshot(snapshot: &CatalogSnapshot) -> AppResult<()> {
    if snapshot.shop.trim().is_empty() {
        return Err(AppError::Validation("shop name must not be empty".into()));
    }

    let mut category_ids: HashSet<i32> = HashSet::new();
    for category in &snapshot.categories {
        if category.name.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "category {}: name must not be empty",
                category.id
            )));
        }
        if !category_ids.insert(category.id) {
            return Err(AppError::Validation(format!(
                "category {}: duplicate category id",
                category.id
            )));
        }
    }

    let mut skus: HashSet<i32> = HashSet::new();
    for good in &snapshot.goods {
        if good.name.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "good {}: name must not be empty",
                good.id
            )));
        }
        if !category_ids.contains(&good.category) {
            return Err(AppError::Validation(format!(
                "good {}: references unknown category {}",
                good.id, good.category
            )));
        }
        if good.quantity < 0 {
            return Err(AppError::Validation(format!(
                "good {}: quantity must not be negative",
                good.id
            )));
        }
        if good.price < 0 || good.price_rrc < 0 {
            return Err(AppError::Validation(format!(
                "good {}: price must not be negative",
                good.id
            )));
        }
        if !skus.insert(good.id) {
            return Err(AppError::Validation(format!(
                "good {}: duplicate supplier SKU",
                good.id
            )));
        }
    }
    Ok(())
}

fn parameter_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::import::SnapshotCategory;
    use std::collections::BTreeMap;

    fn snapshot_with_goods(goods: Vec<SnapshotGood>) -> CatalogSnapshot {
        CatalogSnapshot {
            shop: "Connect".into(),
            categories: vec![SnapshotCategory {
                id: 1,
                name: "Smartphones".into(),
            }],
            goods,
        }
    }

    fn good(id: i32, category: i32) -> SnapshotGood {
        SnapshotGood {
            id,
            category,
            name: "iPhone 14".into(),
            model: "A2".into(),
            quantity: 5,
            price: 80000,
            price_rrc: 85000,
            parameters: BTreeMap::new(),
        }
    }

    #[test]
    fn accepts_well_formed_snapshot() {
        assert!(validate_snapshot(&snapshot_with_goods(vec![good(1, 1)])).is_ok());
    }

    #[test]
    fn rejects_unknown_category_reference() {
        let err = validate_snapshot(&snapshot_with_goods(vec![good(1, 99)])).unwrap_err();
        assert!(err.to_string().contains("unknown category 99"));
    }

    #[test]
    fn rejects_duplicate_sku() {
        let err =
            validate_snapshot(&snapshot_with_goods(vec![good(1, 1), good(1, 1)])).unwrap_err();
        assert!(err.to_string().contains("duplicate supplier SKU"));
    }

    #[test]
    fn rejects_negative_quantity() {
        let mut bad = good(1, 1);
        bad.quantity = -1;
        assert!(validate_snapshot(&snapshot_with_goods(vec![bad])).is_err());
    }

    #[test]
    fn numeric_parameter_values_are_stringified() {
        assert_eq!(parameter_value(&serde_json::json!("black")), "black");
        assert_eq!(parameter_value(&serde_json::json!(8)), "8");
    }
}
