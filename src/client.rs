// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! HTTP client for a remote fsearch server.
//!
//! Mirrors the wire contract in `fsearch-server`: one GET for a fresh search,
//! one POST for a follow-up.  A follow-up answered with 404 (the server no
//! longer recognises the session) falls back to a fresh search and presents
//! the result in follow-up shape, so callers never observe the miss.

use anyhow::Context;

use fsearch_model::ChatHistoryEntry;
use fsearch_server::{ErrorBody, FollowUpRequestBody, FollowUpResponseBody, SearchResponseBody};

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http: reqwest::Client::new() }
    }

    /// `GET /api/search`
    pub async fn search(&self, query: &str, api_key: &str) -> anyhow::Result<SearchResponseBody> {
        let url = format!("{}/api/search", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("q", query), ("apiKey", api_key)])
            .send()
            .await
            .context("search request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("search failed ({status}): {}", error_message(resp).await);
        }
        resp.json().await.context("decoding search response")
    }

    /// `POST /api/follow-up`, with the session-miss fallback on 404.
    pub async fn follow_up(
        &self,
        session_id: &str,
        query: &str,
        history: &[ChatHistoryEntry],
        api_key: &str,
    ) -> anyhow::Result<FollowUpResponseBody> {
        let url = format!("{}/api/follow-up", self.base_url);
        let body = FollowUpRequestBody {
            session_id: session_id.to_string(),
            query: query.to_string(),
            api_key: api_key.to_string(),
            history: history.to_vec(),
        };
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("follow-up request failed")?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::info!("server lost the session; retrying as a fresh search");
            let fresh = self.search(query, api_key).await?;
            return Ok(FollowUpResponseBody {
                session_id: fresh.session_id,
                summary: fresh.summary,
                sources: fresh.sources,
                // The fresh result's whole history is new to the caller.
                new_history_entries: fresh.history,
                raw: fresh.raw,
                metadata: fresh.metadata,
            });
        }

        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("follow-up failed ({status}): {}", error_message(resp).await);
        }
        resp.json().await.context("decoding follow-up response")
    }
}

async fn error_message(resp: reqwest::Response) -> String {
    match resp.json::<ErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => "no error detail".to_string(),
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use fsearch_core::SearchService;
    use fsearch_model::{GenerateRequest, ModelAnswer, ScriptedMockProvider, SearchError, SearchModel};

    /// Serve a router on an ephemeral port and return its base URL.
    async fn spawn_server(service: SearchService) -> String {
        let app = fsearch_server::router(Arc::new(service));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn search_round_trips_through_a_live_server() {
        let base = spawn_server(SearchService::with_default_formatter(Arc::new(
            ScriptedMockProvider::always_text("Answer: forty-two"),
        )))
        .await;

        let client = ApiClient::new(base);
        let result = client.search("meaning of life", "AIzaTest").await.unwrap();
        assert_eq!(result.query, "meaning of life");
        assert_eq!(result.history.len(), 2);
        assert!(result.summary.contains("<h2>Answer"));
    }

    #[tokio::test]
    async fn search_error_carries_server_message() {
        let base = spawn_server(SearchService::with_default_formatter(Arc::new(
            ScriptedMockProvider::always_text("unused"),
        )))
        .await;

        let err = ApiClient::new(base).search("q", "").await.unwrap_err();
        assert!(err.to_string().contains("400"), "{err}");
    }

    #[tokio::test]
    async fn follow_up_falls_back_to_search_on_404() {
        // First call (the follow-up) dies with a session error → 404;
        // second call (the fallback search) succeeds.
        struct SessionLossProvider {
            calls: std::sync::Mutex<u32>,
        }

        #[async_trait::async_trait]
        impl SearchModel for SessionLossProvider {
            fn name(&self) -> &str {
                "session-loss"
            }
            fn model_name(&self) -> &str {
                "session-loss-model"
            }
            async fn generate(&self, _req: GenerateRequest) -> Result<ModelAnswer, SearchError> {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                if *calls == 1 {
                    Err(SearchError::session("Chat session not found or expired"))
                } else {
                    Ok(ModelAnswer { text: "fresh answer".into(), ..Default::default() })
                }
            }
        }

        let base = spawn_server(SearchService::with_default_formatter(Arc::new(
            SessionLossProvider { calls: std::sync::Mutex::new(0) },
        )))
        .await;

        let history = vec![ChatHistoryEntry::user("q0"), ChatHistoryEntry::assistant("a0")];
        let result = ApiClient::new(base)
            .follow_up("stale-session", "tell me more", &history, "AIzaTest")
            .await
            .unwrap();

        // Fallback shape: a brand-new session whose full history is returned
        // as new entries.
        assert_ne!(result.session_id, "stale-session");
        assert_eq!(result.new_history_entries.len(), 2);
        assert_eq!(result.new_history_entries[1].content, "fresh answer");
    }
}
