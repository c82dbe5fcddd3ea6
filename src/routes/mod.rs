use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod basket;
pub mod catalog;
pub mod contacts;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod partner;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/catalog", catalog::router())
        .nest("/basket", basket::router())
        .nest("/orders", orders::router())
        .nest("/partner", partner::router())
        .nest("/contacts", contacts::router())
}
