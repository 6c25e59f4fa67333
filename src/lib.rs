// Wedding Uploader - guest photo/video uploads brokered through a small API

pub mod client;
pub mod config;
pub mod middleware;
pub mod models;
pub mod relay;
pub mod routes;
pub mod storage;
pub mod types;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
