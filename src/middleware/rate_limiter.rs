// Global request rate limiting with governor

use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tracing::warn;

use crate::models::AppState;
use crate::types::AppError;

/// A zero rate is treated as one request per second.
pub fn build_limiter(per_second: u32) -> Arc<DefaultDirectRateLimiter> {
    let rate = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_second(rate)))
}

pub async fn rate_limiter_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if state.limiter.check().is_err() {
        warn!(path = %req.uri().path(), "Rate limit exceeded");
        return Err(AppError::RateLimited);
    }
    Ok(next.run(req).await)
}
