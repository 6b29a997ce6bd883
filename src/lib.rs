//! Photo restoration backend: accounts, PayPal credit purchases and
//! credit-gated restoration through Replicate.

pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub use config::Config;
pub use errors::{AppError, Result};
pub use handlers::AppState;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_app(state: AppState) -> Router {
    let upload_limit = state.config.max_file_size + MULTIPART_OVERHEAD;
    let upload_dir = state.uploads.base_path().to_path_buf();

    let auth_routes = Router::new()
        .route("/", get(handlers::auth::current_user))
        .route("/signup", post(handlers::auth::signup))
        .route("/login", post(handlers::auth::login))
        .route("/user/credits", get(handlers::auth::credits))
        .route("/payment-success", post(handlers::payments::payment_success))
        .route("/paypal-client-id", get(handlers::payments::paypal_client_id))
        .route("/paypal-webhook", post(handlers::payments::paypal_webhook));

    let restore_routes = Router::new()
        .route("/", post(handlers::restore::restore))
        .layer(DefaultBodyLimit::max(upload_limit));

    Router::new()
        .route("/", get(handlers::health::welcome))
        .route("/health", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        .route("/metrics", get(handlers::metrics::metrics_handler))
        .nest("/api/auth", auth_routes)
        .nest("/api/restore", restore_routes)
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .merge(handlers::docs::create_docs_router())
        .layer(from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
