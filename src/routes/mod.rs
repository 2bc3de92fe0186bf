//! Router assembly: HTTP endpoints, CORS, body limits, and HTTP tracing.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

// Uploads are capped at 10 MB in the handlers; leave some headroom for
// multipart framing.
const BODY_LIMIT_BYTES: usize = 12 * 1024 * 1024;

/// Build the application router with:
/// - REST API under `/api/...`
/// - CORS (allow any origin/method/headers) – adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(http::http_health))
        .route("/api/story", post(http::http_post_story))
        .route("/api/evaluate", post(http::http_post_evaluate))
        .route("/api/history/:user_id", get(http::http_get_history))
        .route(
            "/api/history/:user_id/:record_id",
            delete(http::http_delete_record),
        )
        .route("/api/profile/:user_id", get(http::http_get_profile))
        .route("/api/profile", post(http::http_post_profile))
        .route("/api/stats/:user_id", get(http::http_get_stats))
        .route("/api/achievements/:user_id", get(http::http_get_achievements))
        .route("/api/share", post(http::http_post_share))
        .route("/api/share/:code", get(http::http_get_share))
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::store::MemoryStore;

    fn test_app() -> Router {
        let state = Arc::new(AppState::with_store(Arc::new(MemoryStore::new())));
        build_router(state)
    }

    async fn body_json(res: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let res = test_app()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["ok"], true);
    }

    #[tokio::test]
    async fn profile_upsert_then_read() {
        let app = test_app();

        let res = app
            .clone()
            .oneshot(
                Request::post("/api/profile")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"userId":"u1","nickname":"阿明","level":"beginner"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["profile"]["nickname"], "阿明");

        let res = app
            .oneshot(Request::get("/api/profile/u1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["profile"]["userId"], "u1");
    }

    #[tokio::test]
    async fn unknown_ids_return_404_with_error_envelope() {
        let app = test_app();

        let res = app
            .clone()
            .oneshot(Request::get("/api/profile/ghost").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body = body_json(res).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("ghost"));

        let res = app
            .clone()
            .oneshot(
                Request::delete("/api/history/u1/r1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = app
            .oneshot(Request::get("/api/share/nope1234").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn evaluate_without_audio_field_is_rejected() {
        let boundary = "test-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\n你好\r\n--{boundary}--\r\n"
        );
        let res = test_app()
            .oneshot(
                Request::post("/api/evaluate")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["success"], false);
    }

    #[tokio::test]
    async fn evaluate_rejects_unsupported_audio_extension() {
        let boundary = "test-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"clip.txt\"\r\nContent-Type: text/plain\r\n\r\nnot audio\r\n--{boundary}--\r\n"
        );
        let res = test_app()
            .oneshot(
                Request::post("/api/evaluate")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(res).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("Unsupported"));
    }

    #[tokio::test]
    async fn story_without_api_key_serves_seed_story() {
        let boundary = "test-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"photo.jpg\"\r\nContent-Type: image/jpeg\r\n\r\nfake-jpeg-bytes\r\n--{boundary}--\r\n"
        );
        let res = test_app()
            .oneshot(
                Request::post("/api/story")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["success"], true);
        assert!(!body["mandarin"].as_str().unwrap().is_empty());
        assert!(!body["words"].as_array().unwrap().is_empty());
        // No TTS without a client: audio legs degrade to text-only.
        assert!(body["mandarinAudio"].is_null());
        assert!(body["cantoneseAudio"].is_null());
    }

    #[tokio::test]
    async fn evaluate_without_recognizer_returns_bad_gateway() {
        let boundary = "test-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"clip.wav\"\r\nContent-Type: audio/wav\r\n\r\nfake-wav-bytes\r\n--{boundary}\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\n你好\r\n--{boundary}--\r\n"
        );
        let res = test_app()
            .oneshot(
                Request::post("/api/evaluate")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(res).await;
        assert_eq!(body["success"], false);
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stats_for_unseen_user_are_zeroed() {
        let res = test_app()
            .oneshot(Request::get("/api/stats/new-user").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["statistics"]["totalRecordings"], 0);
        assert_eq!(body["statistics"]["bestScore"], 0);
    }

    #[tokio::test]
    async fn achievements_start_locked() {
        let res = test_app()
            .oneshot(
                Request::get("/api/achievements/new-user")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        let list = body["achievements"].as_array().unwrap();
        assert!(!list.is_empty());
        assert!(list.iter().all(|a| a["unlocked"] == false));
    }
}
