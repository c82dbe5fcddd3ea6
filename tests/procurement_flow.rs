use std::collections::BTreeMap;

use axum_procurement_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        basket::AddItemRequest,
        contacts::CreateContactRequest,
        import::{CatalogSnapshot, SnapshotCategory, SnapshotGood},
        orders::{PlaceOrderRequest, StatusUpdateRequest},
    },
    entity::users::ActiveModel as UserActive,
    error::AppError,
    events::{EventSender, NotificationEvent},
    middleware::auth::AuthUser,
    services::{basket_service, contact_service, import_service, order_service, partner_service},
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, Set};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

// Integration tests run against a real Postgres and are skipped when no
// database is configured. Each test seeds its own uniquely-named users,
// shops and categories so the suite stays parallel-safe.

fn test_database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            None
        }
    }
}

async fn setup_state(
    database_url: &str,
) -> anyhow::Result<(AppState, UnboundedReceiver<NotificationEvent>)> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;
    let pool = create_pool(database_url).await?;
    let (events, rx) = EventSender::channel();
    Ok((AppState { pool, orm, events }, rx))
}

async fn create_user(state: &AppState, role: &str) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    UserActive {
        id: Set(id),
        email: Set(format!("{role}-{}@example.com", id.simple())),
        password_hash: Set("not-a-real-hash".into()),
        first_name: Set("Test".into()),
        last_name: Set("User".into()),
        company: Set("Acme".into()),
        position: Set("QA".into()),
        role: Set(role.into()),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(AuthUser {
        user_id: id,
        role: role.into(),
    })
}

async fn create_contact(state: &AppState, user: &AuthUser) -> anyhow::Result<Uuid> {
    let resp = contact_service::create_contact(
        state,
        user,
        CreateContactRequest {
            city: "Saint Petersburg".into(),
            street: "Nevsky".into(),
            house: "1".into(),
            apartment: "2".into(),
            phone: "+7 900 000-00-00".into(),
        },
    )
    .await?;
    Ok(resp.data.expect("contact").id)
}

fn unique_external_id() -> i32 {
    (Uuid::new_v4().as_u128() % 1_000_000_000) as i32
}

fn good(id: i32, category: i32, name: &str, quantity: i32, price: i64) -> SnapshotGood {
    SnapshotGood {
        id,
        category,
        name: name.into(),
        model: "base".into(),
        quantity,
        price,
        price_rrc: price + 5000,
        parameters: BTreeMap::new(),
    }
}

fn snapshot(shop: &str, category_id: i32, goods: Vec<SnapshotGood>) -> CatalogSnapshot {
    CatalogSnapshot {
        shop: shop.into(),
        categories: vec![SnapshotCategory {
            id: category_id,
            name: format!("Smartphones {category_id}"),
        }],
        goods,
    }
}

// Partner imports a catalog, buyer fills a basket and places an order,
// then the order walks its lifecycle under the role rules.
#[tokio::test]
async fn import_basket_and_place_order_flow() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let (state, mut rx) = setup_state(&database_url).await?;

    let partner = create_user(&state, "shop").await?;
    let buyer = create_user(&state, "buyer").await?;
    let admin = create_user(&state, "admin").await?;

    let category = unique_external_id();
    let sku = unique_external_id();
    let mut phone = good(sku, category, "iPhone 14", 5, 80_000);
    phone
        .parameters
        .insert("Color".into(), serde_json::json!("black"));
    phone
        .parameters
        .insert("Internal memory (GB)".into(), serde_json::json!(256));

    let shop_name = format!("Connect {}", Uuid::new_v4().simple());
    let summary = import_service::import_catalog(&state, &partner, snapshot(&shop_name, category, vec![phone]))
        .await?
        .data
        .expect("summary");
    assert_eq!(summary.product_infos, 1);
    assert_eq!(summary.parameters, 2);

    let (info_id,): (Uuid,) =
        sqlx::query_as("SELECT id FROM product_infos WHERE shop_id = $1")
            .bind(summary.shop_id)
            .fetch_one(&state.pool)
            .await?;

    // Two units in the basket, priced from the live offer.
    let item = basket_service::add_item(
        &state,
        &buyer,
        AddItemRequest {
            product_info_id: info_id,
            quantity: 2,
        },
    )
    .await?
    .data
    .expect("basket item");
    assert_eq!(item.price, 80_000);
    assert_eq!(item.product_name, "iPhone 14");

    let basket = basket_service::view_basket(&state, &buyer)
        .await?
        .data
        .expect("basket view");
    assert_eq!(basket.items.len(), 1);
    assert_eq!(basket.items[0].available, 5);
    assert_eq!(basket.total, 160_000);
    assert_eq!(basket.totals_by_shop.len(), 1);
    assert_eq!(basket.totals_by_shop[0].shop_name, shop_name);

    let contact_id = create_contact(&state, &buyer).await?;
    let placed = order_service::place_order(&state, &buyer, PlaceOrderRequest { contact_id })
        .await?
        .data
        .expect("placed order");
    assert_eq!(placed.order.status, "new");
    assert_eq!(placed.order.contact_id, Some(contact_id));
    assert_eq!(placed.total, 160_000);
    assert_eq!(placed.items[0].price, 80_000);

    match rx.recv().await.expect("placement event") {
        NotificationEvent::OrderPlaced { order_id, .. } => assert_eq!(order_id, placed.order.id),
        other => panic!("unexpected event {other:?}"),
    }

    // The partner sees the order through their own items.
    let partner_orders = order_service::list_orders_for_partner(&state, &partner)
        .await?
        .data
        .expect("partner orders");
    assert!(partner_orders.items.iter().any(|o| o.order.id == placed.order.id));

    let confirmed = order_service::update_status(
        &state,
        &partner,
        placed.order.id,
        StatusUpdateRequest {
            status: "confirmed".into(),
        },
    )
    .await?
    .data
    .expect("confirmed order");
    assert_eq!(confirmed.status, "confirmed");
    match rx.recv().await.expect("status event") {
        NotificationEvent::OrderStatusChanged {
            old_status,
            new_status,
            ..
        } => {
            assert_eq!(old_status, "new");
            assert_eq!(new_status, "confirmed");
        }
        other => panic!("unexpected event {other:?}"),
    }

    // Skipping forward is allowed; moving backward is not, and the failed
    // attempt emits nothing.
    order_service::update_status(
        &state,
        &admin,
        placed.order.id,
        StatusUpdateRequest {
            status: "sent".into(),
        },
    )
    .await?;
    rx.recv().await.expect("sent event");

    let err = order_service::update_status(
        &state,
        &admin,
        placed.order.id,
        StatusUpdateRequest {
            status: "confirmed".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::StateConflict(_)));
    assert!(rx.try_recv().is_err());

    // A buyer may only cancel while the order is new or confirmed.
    let err = order_service::update_status(
        &state,
        &buyer,
        placed.order.id,
        StatusUpdateRequest {
            status: "canceled".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let listed = order_service::list_orders_for_user(&state, &buyer)
        .await?
        .data
        .expect("buyer orders");
    assert!(listed.items.iter().any(|o| o.order.id == placed.order.id));

    let fetched = order_service::get_order(&state, &buyer, placed.order.id)
        .await?
        .data
        .expect("order detail");
    assert_eq!(fetched.order.status, "sent");
    assert_eq!(fetched.total, 160_000);

    Ok(())
}

// Re-importing the same snapshot leaves the catalog unchanged, a subset
// import drops the missing offers, and a placed order keeps its frozen
// item snapshot through all of it.
#[tokio::test]
async fn reimport_replaces_offers_and_keeps_order_snapshot() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let (state, _rx) = setup_state(&database_url).await?;

    let partner = create_user(&state, "shop").await?;
    let buyer = create_user(&state, "buyer").await?;

    let category = unique_external_id();
    let sku_a = unique_external_id();
    let sku_b = unique_external_id();
    let shop_name = format!("Svyaznoy {}", Uuid::new_v4().simple());
    let both = snapshot(
        &shop_name,
        category,
        vec![
            good(sku_a, category, "Galaxy S23", 10, 70_000),
            good(sku_b, category, "Pixel 8", 4, 65_000),
        ],
    );

    let first = import_service::import_catalog(&state, &partner, both.clone())
        .await?
        .data
        .expect("summary");
    let second = import_service::import_catalog(&state, &partner, both)
        .await?
        .data
        .expect("summary");
    assert_eq!(first.shop_id, second.shop_id);
    assert_eq!(second.product_infos, 2);
    assert_eq!(second.products, 2);

    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM product_infos WHERE shop_id = $1")
            .bind(first.shop_id)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(count, 2);

    // Category links are not duplicated by the second import either.
    let (links,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM shop_categories WHERE shop_id = $1")
            .bind(first.shop_id)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(links, 1);

    // Order one Galaxy, then shrink the catalog to just the Pixel.
    let (info_id,): (Uuid,) =
        sqlx::query_as("SELECT id FROM product_infos WHERE shop_id = $1 AND external_id = $2")
            .bind(first.shop_id)
            .bind(sku_a)
            .fetch_one(&state.pool)
            .await?;
    basket_service::add_item(
        &state,
        &buyer,
        AddItemRequest {
            product_info_id: info_id,
            quantity: 1,
        },
    )
    .await?;
    let contact_id = create_contact(&state, &buyer).await?;
    let placed = order_service::place_order(&state, &buyer, PlaceOrderRequest { contact_id })
        .await?
        .data
        .expect("placed order");

    import_service::import_catalog(
        &state,
        &partner,
        snapshot(
            &shop_name,
            category,
            vec![good(sku_b, category, "Pixel 8", 4, 65_000)],
        ),
    )
    .await?;

    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM product_infos WHERE shop_id = $1")
            .bind(first.shop_id)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(count, 1);

    // The order line survives the delete with its frozen fields; only the
    // live-offer reference is gone.
    let fetched = order_service::get_order(&state, &buyer, placed.order.id)
        .await?
        .data
        .expect("order detail");
    assert_eq!(fetched.items.len(), 1);
    assert_eq!(fetched.items[0].product_name, "Galaxy S23");
    assert_eq!(fetched.items[0].price, 70_000);
    assert_eq!(fetched.items[0].product_info_id, None);

    Ok(())
}

// Stock committed to a placed order is gone for everyone else, but a
// failed placement leaves the loser's basket untouched.
#[tokio::test]
async fn committed_stock_blocks_other_buyers() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let (state, _rx) = setup_state(&database_url).await?;

    let partner = create_user(&state, "shop").await?;
    let first_buyer = create_user(&state, "buyer").await?;
    let second_buyer = create_user(&state, "buyer").await?;

    let category = unique_external_id();
    let sku = unique_external_id();
    let shop_name = format!("LastUnit {}", Uuid::new_v4().simple());
    let summary = import_service::import_catalog(
        &state,
        &partner,
        snapshot(&shop_name, category, vec![good(sku, category, "Xperia 1", 1, 50_000)]),
    )
    .await?
    .data
    .expect("summary");
    let (info_id,): (Uuid,) =
        sqlx::query_as("SELECT id FROM product_infos WHERE shop_id = $1")
            .bind(summary.shop_id)
            .fetch_one(&state.pool)
            .await?;

    // Both buyers get the unit into their baskets while nothing is committed.
    for buyer in [&first_buyer, &second_buyer] {
        basket_service::add_item(
            &state,
            buyer,
            AddItemRequest {
                product_info_id: info_id,
                quantity: 1,
            },
        )
        .await?;
    }

    let first_contact = create_contact(&state, &first_buyer).await?;
    let second_contact = create_contact(&state, &second_buyer).await?;

    order_service::place_order(
        &state,
        &first_buyer,
        PlaceOrderRequest {
            contact_id: first_contact,
        },
    )
    .await?;

    let err = order_service::place_order(
        &state,
        &second_buyer,
        PlaceOrderRequest {
            contact_id: second_contact,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::InsufficientStock { available: 0, .. }
    ));

    // The loser's basket is still a basket with its line intact, and its
    // view reports the same availability the placement check will use.
    let basket = basket_service::view_basket(&state, &second_buyer)
        .await?
        .data
        .expect("basket view");
    assert!(basket.order_id.is_some());
    assert_eq!(basket.items.len(), 1);
    assert_eq!(basket.items[0].available, 0);

    // A third party cannot even stage the sold-out unit anymore.
    let err = basket_service::add_item(
        &state,
        &create_user(&state, "buyer").await?,
        AddItemRequest {
            product_info_id: info_id,
            quantity: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { .. }));

    Ok(())
}

// Two placements racing for the same last unit serialize on the offer row
// lock; exactly one wins.
#[tokio::test]
async fn concurrent_placement_has_single_winner() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let (state, _rx) = setup_state(&database_url).await?;

    let partner = create_user(&state, "shop").await?;
    let first_buyer = create_user(&state, "buyer").await?;
    let second_buyer = create_user(&state, "buyer").await?;

    let category = unique_external_id();
    let sku = unique_external_id();
    let shop_name = format!("Race {}", Uuid::new_v4().simple());
    let summary = import_service::import_catalog(
        &state,
        &partner,
        snapshot(&shop_name, category, vec![good(sku, category, "Nothing Phone", 1, 40_000)]),
    )
    .await?
    .data
    .expect("summary");
    let (info_id,): (Uuid,) =
        sqlx::query_as("SELECT id FROM product_infos WHERE shop_id = $1")
            .bind(summary.shop_id)
            .fetch_one(&state.pool)
            .await?;

    for buyer in [&first_buyer, &second_buyer] {
        basket_service::add_item(
            &state,
            buyer,
            AddItemRequest {
                product_info_id: info_id,
                quantity: 1,
            },
        )
        .await?;
    }
    let first_contact = create_contact(&state, &first_buyer).await?;
    let second_contact = create_contact(&state, &second_buyer).await?;

    let (first, second) = tokio::join!(
        order_service::place_order(
            &state,
            &first_buyer,
            PlaceOrderRequest {
                contact_id: first_contact
            }
        ),
        order_service::place_order(
            &state,
            &second_buyer,
            PlaceOrderRequest {
                contact_id: second_contact
            }
        ),
    );

    let wins = [first.is_ok(), second.is_ok()];
    assert_eq!(wins.iter().filter(|w| **w).count(), 1, "exactly one placement must win");
    let loser = if first.is_err() { first } else { second };
    assert!(matches!(
        loser.unwrap_err(),
        AppError::InsufficientStock { .. }
    ));

    Ok(())
}

// Merging a new quantity into an existing basket line must not wrap; an
// absurd request fails as validation, not as a panic or a database error.
#[tokio::test]
async fn basket_quantity_merge_rejects_overflow() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let (state, _rx) = setup_state(&database_url).await?;

    let partner = create_user(&state, "shop").await?;
    let buyer = create_user(&state, "buyer").await?;

    let category = unique_external_id();
    let sku = unique_external_id();
    let shop_name = format!("Bulk {}", Uuid::new_v4().simple());
    let summary = import_service::import_catalog(
        &state,
        &partner,
        snapshot(&shop_name, category, vec![good(sku, category, "Pallet of phones", i32::MAX, 1_000)]),
    )
    .await?
    .data
    .expect("summary");
    let (info_id,): (Uuid,) =
        sqlx::query_as("SELECT id FROM product_infos WHERE shop_id = $1")
            .bind(summary.shop_id)
            .fetch_one(&state.pool)
            .await?;

    basket_service::add_item(
        &state,
        &buyer,
        AddItemRequest {
            product_info_id: info_id,
            quantity: 2,
        },
    )
    .await?;

    let err = basket_service::add_item(
        &state,
        &buyer,
        AddItemRequest {
            product_info_id: info_id,
            quantity: i32::MAX,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // The original line is untouched by the failed merge.
    let basket = basket_service::view_basket(&state, &buyer)
        .await?
        .data
        .expect("basket view");
    assert_eq!(basket.items.len(), 1);
    assert_eq!(basket.items[0].quantity, 2);

    Ok(())
}

// A paused shop disappears from sale until the partner resumes it.
#[tokio::test]
async fn paused_shop_blocks_basket_adds() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let (state, _rx) = setup_state(&database_url).await?;

    let partner = create_user(&state, "shop").await?;
    let buyer = create_user(&state, "buyer").await?;

    let category = unique_external_id();
    let sku = unique_external_id();
    let shop_name = format!("Paused {}", Uuid::new_v4().simple());
    let summary = import_service::import_catalog(
        &state,
        &partner,
        snapshot(&shop_name, category, vec![good(sku, category, "Redmi Note", 9, 20_000)]),
    )
    .await?
    .data
    .expect("summary");
    let (info_id,): (Uuid,) =
        sqlx::query_as("SELECT id FROM product_infos WHERE shop_id = $1")
            .bind(summary.shop_id)
            .fetch_one(&state.pool)
            .await?;

    let shop = partner_service::set_state(&state, &partner, false)
        .await?
        .data
        .expect("shop");
    assert!(!shop.active);

    let err = basket_service::add_item(
        &state,
        &buyer,
        AddItemRequest {
            product_info_id: info_id,
            quantity: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    partner_service::set_state(&state, &partner, true).await?;
    let item = basket_service::add_item(
        &state,
        &buyer,
        AddItemRequest {
            product_info_id: info_id,
            quantity: 1,
        },
    )
    .await?
    .data
    .expect("basket item");
    assert_eq!(item.quantity, 1);

    Ok(())
}

// A shared order is projected per partner: each sees only their own items
// and a partial total.
#[tokio::test]
async fn partner_projection_hides_other_partners_items() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let (state, _rx) = setup_state(&database_url).await?;

    let first_partner = create_user(&state, "shop").await?;
    let second_partner = create_user(&state, "shop").await?;
    let buyer = create_user(&state, "buyer").await?;

    let category = unique_external_id();
    let sku_a = unique_external_id();
    let sku_b = unique_external_id();
    let first_summary = import_service::import_catalog(
        &state,
        &first_partner,
        snapshot(
            &format!("North {}", Uuid::new_v4().simple()),
            category,
            vec![good(sku_a, category, "Honor 90", 5, 30_000)],
        ),
    )
    .await?
    .data
    .expect("summary");
    let second_summary = import_service::import_catalog(
        &state,
        &second_partner,
        snapshot(
            &format!("South {}", Uuid::new_v4().simple()),
            category,
            vec![good(sku_b, category, "Oppo Reno", 5, 25_000)],
        ),
    )
    .await?
    .data
    .expect("summary");

    for summary in [&first_summary, &second_summary] {
        let (info_id,): (Uuid,) =
            sqlx::query_as("SELECT id FROM product_infos WHERE shop_id = $1")
                .bind(summary.shop_id)
                .fetch_one(&state.pool)
                .await?;
        basket_service::add_item(
            &state,
            &buyer,
            AddItemRequest {
                product_info_id: info_id,
                quantity: 1,
            },
        )
        .await?;
    }

    let contact_id = create_contact(&state, &buyer).await?;
    let placed = order_service::place_order(&state, &buyer, PlaceOrderRequest { contact_id })
        .await?
        .data
        .expect("placed order");
    assert_eq!(placed.items.len(), 2);
    assert_eq!(placed.total, 55_000);

    let first_view = order_service::list_orders_for_partner(&state, &first_partner)
        .await?
        .data
        .expect("partner orders");
    let projected = first_view
        .items
        .iter()
        .find(|o| o.order.id == placed.order.id)
        .expect("shared order visible");
    assert_eq!(projected.items.len(), 1);
    assert_eq!(projected.items[0].shop_id, first_summary.shop_id);
    assert_eq!(projected.total, 30_000);

    Ok(())
}
