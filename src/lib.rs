//! Self-hosted gallery for a single party: guests sign in through an
//! external identity provider, share photos and videos (live photos
//! included), and browse each other's posts once the event opens. The
//! [`pipeline`] module is the client side of the same crate: staging,
//! media normalization, sequential upload, and bulk export.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Database;
use crate::storage::StorageProvider;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub storage: Arc<dyn StorageProvider>,
}

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_body = state.config.storage.max_upload_mb as usize * 1024 * 1024;

    // Public routes: media retrieval plus the ticketed byte transfer (the
    // ticket in the URL is the credential)
    let public_routes = Router::new()
        .route("/media/:storage_id", get(handlers::media::get_media))
        .route("/uploads/:token", put(handlers::upload::transfer_bytes))
        .layer(DefaultBodyLimit::max(max_body));

    // Session routes: usable before the event opens, so guests can sign in
    // and prepare uploads from the countdown page
    let session_routes = Router::new()
        .route("/users/sync", post(handlers::user::sync_profile))
        .route("/users/me", get(handlers::user::get_profile))
        .route("/users/me/name", put(handlers::user::rename))
        .route("/uploads", post(handlers::upload::issue_upload_target))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_session,
        ));

    // Gated routes: the gallery itself stays behind the event gate
    let gated_routes = Router::new()
        .route(
            "/posts",
            get(handlers::post::list_posts).post(handlers::post::create_post),
        )
        .route("/posts/:id", delete(handlers::post::delete_post))
        .route("/posts/:id/like", post(handlers::post::toggle_like))
        .route("/users/me/stats", get(handlers::user::get_stats))
        .route("/users/me/posts", get(handlers::user::list_my_posts))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::gate::event_gate,
        ));

    Router::new()
        .nest(
            "/api/v1",
            public_routes.merge(session_routes).merge(gated_routes),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
