//! API Routes
//!
//! This module organizes all HTTP endpoints for the application:
//! - `/api/generatePutUrl` - Signed write URL for direct uploads
//! - `/api/files` - Server-side relay and stored file listing
//! - `/api/health` - Health checks
//! - `/` - Guest upload page
//! - `/image` - Static assets

pub mod files;
pub mod health;
pub mod signed_url;
pub mod static_files;
pub mod ui;

use axum::{extract::DefaultBodyLimit, middleware::from_fn_with_state, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::{apply_cors, rate_limiter_middleware};
use crate::models::AppState;

/// Create the main application router
///
/// API routes share the rate limiter and the upload body limit; the page
/// and static assets are served without either.
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let api_router = Router::new()
        .merge(signed_url::router(state.clone()))
        .merge(files::router(state.clone()))
        .merge(health::router(state.clone()))
        .layer(from_fn_with_state(state.clone(), rate_limiter_middleware))
        .layer(DefaultBodyLimit::max(state.config.relay.max_upload_bytes));

    let router = Router::new()
        .merge(api_router)
        .merge(ui::router())
        .merge(static_files::router(&state.config.server.public_dir))
        .layer(TraceLayer::new_for_http());

    apply_cors(router, &state.config.server.cors_allowed_origins)
}
