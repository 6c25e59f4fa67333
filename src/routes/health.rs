use axum::{extract::State, routing::get, Json, Router};

use crate::models::{AppState, HealthResponse};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let response = HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        storage_provider: state.issuer.provider().to_string(),
        relay_target: state.relay.as_ref().map(|r| r.kind().to_string()),
        script_configured: state.script.is_some(),
    };

    Json(response)
}

#[cfg(test)]
mod tests {
    use crate::routes::create_router;
    use crate::testing::{body_json, state_with, RecordingRelay, StaticIssuer};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_reports_backends() {
        let state = state_with(
            Arc::new(StaticIssuer::default()),
            Some(Arc::new(RecordingRelay::default())),
        );
        let response = create_router(state)
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["storage_provider"], "static");
        assert_eq!(json["relay_target"], "script");
        assert_eq!(json["script_configured"], false);
    }
}
