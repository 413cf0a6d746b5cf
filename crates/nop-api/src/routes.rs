use axum::{
    Router, middleware,
    routing::{get, patch, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};
use crate::context::request_scope;
use crate::middleware::require_auth;
use crate::{brands, categories, health, products};

/// The full HTTP surface. Every request runs inside its own database scope.
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/auth/{provider}", post(auth::login))
        .route("/categories/{kind}", get(categories::list_categories))
        .route("/categories/{kind}/{id}", get(categories::get_category))
        .route("/brands", get(brands::list_brands))
        .route("/brands/{id}", get(brands::get_brand))
        .route("/brands/{id}/alternatives", get(brands::brand_alternatives))
        .route("/products", get(products::list_products))
        .route("/products/{id}", get(products::get_product));

    let protected_routes = Router::new()
        .route("/categories/{kind}", post(categories::create_category))
        .route("/brands", post(brands::create_brand))
        .route("/brands/{id}", patch(brands::update_brand))
        .route("/products", post(products::create_product))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn_with_state(state.clone(), request_scope))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
