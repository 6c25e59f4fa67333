use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::json;
use tracing::{debug, info};
use validator::Validate;

use crate::models::{AppState, SignedUrlRequest, SignedUrlResponse};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/generatePutUrl",
            post(generate_put_url).fallback(method_not_allowed),
        )
        .with_state(state)
}

/// POST /api/generatePutUrl - mint a write URL for one object
async fn generate_put_url(
    State(state): State<AppState>,
    payload: Result<Json<SignedUrlRequest>, JsonRejection>,
) -> AppResult<Json<SignedUrlResponse>> {
    // An unreadable body has no usable filename either
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!(error = %rejection.body_text(), "Rejected signed URL request body");
            SignedUrlRequest::default()
        }
    };

    let filename = match request.filename.as_deref() {
        Some(name) if !name.trim().is_empty() => name,
        _ => return Err(AppError::BadRequest("Filename is required".to_string())),
    };
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let url = state
        .issuer
        .signed_put_url(filename, request.content_type.as_deref(), state.signed_url_ttl())
        .await?;

    info!(
        filename = %filename,
        content_type = ?request.content_type,
        provider = state.issuer.provider(),
        "Issued signed upload URL"
    );

    Ok(Json(SignedUrlResponse { url }))
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        Json(json!({ "message": "method not allowed" })),
    )
}

#[cfg(test)]
mod tests {
    use crate::routes::create_router;
    use crate::testing::{body_json, state_with, FailingIssuer, StaticIssuer};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/generatePutUrl")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_issues_url() {
        let issuer = Arc::new(StaticIssuer::default());
        let app = create_router(state_with(issuer.clone(), None));

        let response = app
            .oneshot(post_json(r#"{"filename":"1718476205000-a.jpg","contentType":"image/jpeg"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["url"], "https://storage.test/bucket/1718476205000-a.jpg?signed=1");

        let calls = issuer.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1.as_deref(), Some("image/jpeg"));
        assert_eq!(calls[0].2, 900);
    }

    #[tokio::test]
    async fn test_missing_filename_is_bad_request() {
        for body in [r#"{"contentType":"image/jpeg"}"#, r#"{"filename":"  "}"#] {
            let app = create_router(state_with(Arc::new(StaticIssuer::default()), None));
            let response = app.oneshot(post_json(body)).await.unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let json = body_json(response).await;
            assert_eq!(json["message"], "Filename is required");
        }
    }

    #[tokio::test]
    async fn test_unreadable_body_is_bad_request() {
        let malformed = post_json("{not json");
        let untyped = Request::builder()
            .method("POST")
            .uri("/api/generatePutUrl")
            .body(Body::from(r#"{"filename":"a.jpg"}"#))
            .unwrap();

        for request in [malformed, untyped] {
            let issuer = Arc::new(StaticIssuer::default());
            let app = create_router(state_with(issuer.clone(), None));
            let response = app.oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let json = body_json(response).await;
            assert_eq!(json["message"], "Filename is required");
            assert!(issuer.calls().is_empty());
        }
    }

    #[tokio::test]
    async fn test_issuer_failure_is_server_error() {
        let app = create_router(state_with(Arc::new(FailingIssuer), None));
        let response = app.oneshot(post_json(r#"{"filename":"a.jpg"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["message"], "Failed to generate signed URL");
    }

    #[tokio::test]
    async fn test_other_methods_not_allowed() {
        let app = create_router(state_with(Arc::new(StaticIssuer::default()), None));
        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/generatePutUrl")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let json = body_json(response).await;
        assert_eq!(json["message"], "method not allowed");
    }
}
