use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{
            ChangeRoleRequest, ConfirmEmailRequest, LoginRequest, LoginResponse,
            PasswordResetConfirmRequest, PasswordResetRequest, RegisterRequest,
            UpdateProfileRequest,
        },
        basket::{AddItemRequest, BasketItem, BasketView, ShopSubtotal, UpdateItemRequest},
        catalog::{CategoryList, OfferParameter, ProductOffer, ProductOfferList, ShopList},
        contacts::{ContactList, CreateContactRequest, UpdateContactRequest},
        import::{CatalogSnapshot, ImportSummary, SnapshotCategory, SnapshotGood},
        orders::{OrderList, OrderWithItems, PlaceOrderRequest, StatusUpdateRequest},
    },
    models::{Category, Contact, Order, OrderItem, Shop, User},
    response::{ApiResponse, Meta},
    routes::{auth, basket, catalog, contacts, health, orders, params, partner},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::confirm,
        auth::login,
        auth::password_reset,
        auth::password_reset_confirm,
        auth::profile,
        auth::update_profile,
        auth::change_role,
        catalog::list_categories,
        catalog::list_shops,
        catalog::list_offers,
        basket::view_basket,
        basket::add_item,
        basket::update_item,
        basket::remove_item,
        orders::list_orders,
        orders::place_order,
        orders::get_order,
        orders::status_update,
        partner::import_catalog,
        partner::get_state,
        partner::set_state,
        partner::list_orders,
        contacts::list_contacts,
        contacts::create_contact,
        contacts::update_contact,
        contacts::delete_contact
    ),
    components(
        schemas(
            User,
            Shop,
            Category,
            Order,
            OrderItem,
            Contact,
            RegisterRequest,
            ConfirmEmailRequest,
            LoginRequest,
            LoginResponse,
            PasswordResetRequest,
            PasswordResetConfirmRequest,
            UpdateProfileRequest,
            ChangeRoleRequest,
            CatalogSnapshot,
            SnapshotCategory,
            SnapshotGood,
            ImportSummary,
            AddItemRequest,
            UpdateItemRequest,
            BasketItem,
            ShopSubtotal,
            BasketView,
            CategoryList,
            ShopList,
            ProductOffer,
            OfferParameter,
            ProductOfferList,
            PlaceOrderRequest,
            StatusUpdateRequest,
            OrderWithItems,
            OrderList,
            CreateContactRequest,
            UpdateContactRequest,
            ContactList,
            params::OfferQuery,
            params::ShopStateRequest,
            Meta,
            ApiResponse<User>,
            ApiResponse<Shop>,
            ApiResponse<ImportSummary>,
            ApiResponse<BasketView>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<ProductOfferList>,
            ApiResponse<ContactList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, confirmation and login"),
        (name = "Catalog", description = "Merged multi-supplier catalog"),
        (name = "Basket", description = "Draft order management"),
        (name = "Orders", description = "Order placement and lifecycle"),
        (name = "Partner", description = "Supplier catalog uploads and orders"),
        (name = "Contacts", description = "Delivery contacts"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
