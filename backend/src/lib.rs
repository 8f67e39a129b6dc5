use std::time::Duration;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

pub mod auth;
pub mod cart;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod roles;
pub mod schema;
pub mod state;
pub mod store;

use handlers::{
    admin, cart as cart_routes, farmers, health, listings, orders, profile, support, transport,
};
use state::AppState;

/// Full HTTP surface. Everything except `/`, `/ping`, `/farmer`, signup and
/// login sits behind the bearer-token guard.
pub fn build_app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .route(
            "/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route(
            "/listings",
            get(listings::list_listings).post(listings::create_listing),
        )
        .route(
            "/listings/:id",
            get(listings::get_listing).put(listings::update_listing),
        )
        .route("/listings/:id/moderation", post(listings::moderate_listing))
        .route(
            "/cart",
            get(cart_routes::get_cart).delete(cart_routes::clear_cart),
        )
        .route("/cart/items", post(cart_routes::add_item))
        .route(
            "/cart/items/:listing_id",
            patch(cart_routes::update_item).delete(cart_routes::remove_item),
        )
        .route("/cart/checkout", post(cart_routes::checkout))
        .route("/orders", get(orders::list_orders).post(orders::place_order))
        .route("/orders/:id/status", patch(orders::update_order_status))
        .route("/deliveries", get(orders::list_deliveries))
        .route(
            "/transport/jobs",
            get(transport::list_jobs).post(transport::create_job),
        )
        .route(
            "/transport/jobs/:id/bids",
            get(transport::list_bids).post(transport::submit_bid),
        )
        .route(
            "/transport/jobs/:id/bids/:bid_id/accept",
            post(transport::accept_bid),
        )
        .route("/transport/jobs/:id/status", patch(transport::update_job_status))
        .route(
            "/support",
            get(support::list_messages).post(support::create_message),
        )
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/:user_id", delete(admin::delete_user))
        .route("/admin/users/:user_id/status", put(admin::set_user_status))
        .route("/admin/stats", get(admin::platform_stats))
        .route("/admin/activity", get(admin::list_activity))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::authenticate,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(health::root))
        .route("/ping", get(health::ping))
        .route("/farmer", post(farmers::create_farmer))
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/login", post(handlers::auth::login))
        .merge(protected_routes)
        .layer(cors)
        .with_state(state)
}
