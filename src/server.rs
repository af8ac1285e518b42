use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::middleware::bearer_auth;
use crate::state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        // Protected API
        .merge(api_routes(state.clone()))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/whoami", get(handlers::auth::whoami))
        .route("/api/users/", get(handlers::users::list))
        .route("/api/users/:id", get(handlers::users::get))
        .route(
            "/api/groups/",
            post(handlers::groups::create).put(handlers::groups::create),
        )
        .route(
            "/api/groups/:id",
            get(handlers::groups::get)
                .post(handlers::groups::update)
                .put(handlers::groups::update)
                .delete(handlers::groups::delete),
        )
        .route(
            "/api/checklists/",
            post(handlers::checklists::create).put(handlers::checklists::create),
        )
        .route(
            "/api/checklists/:id",
            get(handlers::checklists::get)
                .post(handlers::checklists::update)
                .put(handlers::checklists::update)
                .delete(handlers::checklists::delete),
        )
        .route(
            "/api/items/",
            post(handlers::items::create).put(handlers::items::create),
        )
        .route(
            "/api/items/:id",
            get(handlers::items::get)
                .post(handlers::items::update)
                .put(handlers::items::update)
                .delete(handlers::items::delete),
        )
        .route_layer(from_fn_with_state(state, bearer_auth))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "name": "MyTasks API (Rust)",
        "version": version,
        "endpoints": {
            "register": "/auth/register (public)",
            "login": "/auth/login (public)",
            "users": "/api/users/[:id] (protected)",
            "groups": "/api/groups/[:id] (protected)",
            "checklists": "/api/checklists/[:id] (protected)",
            "items": "/api/items/[:id] (protected)",
        }
    }))
}

async fn health() -> axum::response::Json<Value> {
    axum::response::Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
    }))
}
