use std::sync::Arc;

use axum::{http::Method, routing::get, Router};
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};

use crate::AppState;

pub mod chat;
pub mod dataset;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
}

/// Full application router with CORS and request tracing.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .merge(routes())
        .merge(dataset::routes())
        .merge(chat::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
