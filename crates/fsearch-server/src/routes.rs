// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rand::Rng;
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::debug;

use fsearch_core::SearchService;
use fsearch_model::{ChatHistoryEntry, SearchError, API_KEY_REQUIRED};

use crate::{
    error::ApiError,
    payload::{
        FollowUpRequestBody, FollowUpResponseBody, RawPayload, ResponseMetadata,
        SearchResponseBody,
    },
};

#[derive(Clone)]
struct AppState {
    service: Arc<SearchService>,
}

/// Build the API router around an injected service.
pub fn router(service: Arc<SearchService>) -> Router {
    Router::new()
        .route("/api/search", get(search_handler))
        .route("/api/follow-up", post(follow_up_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

/// Opaque correlation token for a conversation: 9 random lowercase
/// alphanumerics.  Not server-authoritative; the history array the client
/// holds is the state of record.
pub fn new_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(9)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SearchParams {
    q: String,
    api_key: String,
}

async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponseBody>, ApiError> {
    if params.q.is_empty() {
        return Err(SearchError::missing("Query parameter 'q' is required").into());
    }
    if params.api_key.trim().is_empty() {
        return Err(SearchError::missing(API_KEY_REQUIRED).into());
    }

    debug!(query = %params.q, "search request");
    let outcome = state.service.search(&params.q, &params.api_key).await?;

    let history = vec![
        ChatHistoryEntry::user(&*params.q),
        ChatHistoryEntry::assistant(outcome.text.clone()),
    ];

    Ok(Json(SearchResponseBody {
        session_id: new_session_id(),
        query: params.q,
        summary: outcome.formatted_text,
        sources: outcome.sources,
        history,
        raw: RawPayload { model_response: outcome.text },
        metadata: ResponseMetadata {
            model: state.service.model_name().to_string(),
            timestamp: Utc::now(),
        },
    }))
}

async fn follow_up_handler(
    State(state): State<AppState>,
    Json(body): Json<FollowUpRequestBody>,
) -> Result<Json<FollowUpResponseBody>, ApiError> {
    if body.session_id.is_empty() || body.query.is_empty() {
        return Err(SearchError::missing("SessionId and query are required").into());
    }
    if body.api_key.trim().is_empty() {
        return Err(SearchError::missing(API_KEY_REQUIRED).into());
    }
    if body.history.is_empty() {
        return Err(SearchError::missing(
            "Conversation history is required for follow-up questions",
        )
        .into());
    }

    debug!(session = %body.session_id, turns = body.history.len(), "follow-up request");
    let outcome = state
        .service
        .follow_up(&body.query, &body.history, &body.api_key)
        .await?;

    // Only the new exchange goes back; the caller already holds the rest.
    let new_history_entries = vec![
        ChatHistoryEntry::user(&*body.query),
        ChatHistoryEntry::assistant(outcome.text.clone()),
    ];

    Ok(Json(FollowUpResponseBody {
        session_id: body.session_id,
        summary: outcome.formatted_text,
        sources: outcome.sources,
        new_history_entries,
        raw: RawPayload { model_response: outcome.text },
        metadata: ResponseMetadata {
            model: state.service.model_name().to_string(),
            timestamp: Utc::now(),
        },
    }))
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    use fsearch_model::{
        GenerateRequest, GroundingMetadata, ModelAnswer, ScriptedMockProvider, SearchModel,
    };

    fn app_with(provider: Arc<ScriptedMockProvider>) -> Router {
        router(Arc::new(SearchService::with_default_formatter(provider)))
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    // ── Session ids ───────────────────────────────────────────────────────────

    #[test]
    fn session_ids_are_short_and_unique() {
        let a = new_session_id();
        let b = new_session_id();
        assert_eq!(a.len(), 9);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    // ── GET /api/search ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn search_without_query_is_400() {
        let app = app_with(Arc::new(ScriptedMockProvider::always_text("x")));
        let resp = app
            .oneshot(Request::builder().uri("/api/search?apiKey=AIzaTest").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["message"], "Query parameter 'q' is required");
    }

    #[tokio::test]
    async fn search_without_api_key_is_400() {
        let app = app_with(Arc::new(ScriptedMockProvider::always_text("x")));
        let resp = app
            .oneshot(Request::builder().uri("/api/search?q=rust").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert!(body["message"].as_str().unwrap().contains("API key is required"));
    }

    #[tokio::test]
    async fn search_success_carries_session_history_and_summary() {
        let meta = GroundingMetadata::from_parts(
            vec![("https://a.io", "A")],
            vec![("cited span", vec![0])],
        );
        let app = app_with(Arc::new(ScriptedMockProvider::with_grounding(
            "Overview: grounded answer",
            meta,
        )));

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/search?q=rust&apiKey=AIzaTest")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(resp).await;
        assert_eq!(body["sessionId"].as_str().unwrap().len(), 9);
        assert_eq!(body["query"], "rust");
        assert!(body["summary"].as_str().unwrap().contains("<h2>Overview"));
        assert_eq!(body["sources"][0]["url"], "https://a.io");
        assert_eq!(body["sources"][0]["snippet"], "cited span");

        let history = body["history"].as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["role"], "user");
        assert_eq!(history[0]["content"], "rust");
        assert_eq!(history[1]["role"], "assistant");
        assert_eq!(history[1]["content"], "Overview: grounded answer");

        assert_eq!(body["raw"]["modelResponse"], "Overview: grounded answer");
        assert_eq!(body["metadata"]["model"], "scripted-mock-model");
    }

    // ── POST /api/follow-up ───────────────────────────────────────────────────

    async fn post_follow_up(app: Router, body: serde_json::Value) -> axum::response::Response {
        app.oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/follow-up")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn follow_up_missing_session_or_query_is_400() {
        let app = app_with(Arc::new(ScriptedMockProvider::always_text("x")));
        let resp = post_follow_up(app, serde_json::json!({ "apiKey": "k" })).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["message"], "SessionId and query are required");
    }

    #[tokio::test]
    async fn follow_up_empty_history_is_400() {
        let app = app_with(Arc::new(ScriptedMockProvider::always_text("x")));
        let resp = post_follow_up(
            app,
            serde_json::json!({
                "sessionId": "abc", "query": "more", "apiKey": "AIzaTest", "history": []
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert!(body["message"].as_str().unwrap().contains("Conversation history"));
    }

    #[tokio::test]
    async fn follow_up_success_returns_only_the_new_exchange() {
        let app = app_with(Arc::new(ScriptedMockProvider::always_text("deeper answer")));
        let resp = post_follow_up(
            app,
            serde_json::json!({
                "sessionId": "abc123def",
                "query": "tell me more",
                "apiKey": "AIzaTest",
                "history": [
                    { "role": "user", "content": "rust" },
                    { "role": "assistant", "content": "Rust is a language." }
                ]
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(resp).await;
        assert_eq!(body["sessionId"], "abc123def");
        let new_entries = body["newHistoryEntries"].as_array().unwrap();
        assert_eq!(new_entries.len(), 2, "prior history must not be echoed back");
        assert_eq!(new_entries[0]["content"], "tell me more");
        assert_eq!(new_entries[1]["content"], "deeper answer");
    }

    // ── Error kind → status mapping through the stack ─────────────────────────

    struct FailingProvider(fn() -> SearchError);

    #[async_trait::async_trait]
    impl SearchModel for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }
        fn model_name(&self) -> &str {
            "failing-model"
        }
        async fn generate(&self, _req: GenerateRequest) -> Result<ModelAnswer, SearchError> {
            Err((self.0)())
        }
    }

    fn failing_app(make: fn() -> SearchError) -> Router {
        router(Arc::new(SearchService::with_default_formatter(Arc::new(
            FailingProvider(make),
        ))))
    }

    #[tokio::test]
    async fn rejected_key_maps_to_401_with_fixed_message() {
        let app = failing_app(|| SearchError::credential("Gemini rejected the API key (403)"));
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/search?q=rust&apiKey=bad")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(resp).await;
        assert_eq!(
            body["message"],
            "Invalid API key. Please check your settings and try again."
        );
    }

    #[tokio::test]
    async fn session_error_maps_to_404_on_follow_up() {
        let app = failing_app(|| SearchError::session("Chat session not found or expired"));
        let resp = post_follow_up(
            app,
            serde_json::json!({
                "sessionId": "gone", "query": "q", "apiKey": "AIzaTest",
                "history": [{ "role": "user", "content": "q0" }]
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upstream_failure_maps_to_500_with_message() {
        let app = failing_app(|| SearchError::Upstream(anyhow::anyhow!("quota exceeded")));
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/search?q=rust&apiKey=AIzaTest")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["message"], "quota exceeded");
    }
}
