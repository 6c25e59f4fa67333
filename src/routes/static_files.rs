//! Static assets (background images) served from `PUBLIC_DIR`.

use std::path::Path;

use axum::Router;
use tower_http::services::ServeDir;
use tracing::{info, warn};

pub fn router(public_dir: &Path) -> Router {
    let image_dir = public_dir.join("image");
    if image_dir.is_dir() {
        info!(path = %image_dir.display(), "Serving static images");
    } else {
        warn!(path = %image_dir.display(), "Static image directory not found");
    }

    Router::new().nest_service("/image", ServeDir::new(image_dir))
}
