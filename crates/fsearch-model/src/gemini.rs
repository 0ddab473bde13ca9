// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Google Gemini driver — native Generative Language API.
//!
//! Uses the non-streaming `generateContent` endpoint with the
//! `google_search` tool attached, so every answer may carry grounding
//! metadata citing the web pages that informed it.
//!
//! # Auth
//! API key via `x-goog-api-key` header, supplied per request.
//!
//! # Endpoint pattern
//! `POST https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent`

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{
    ChatHistoryEntry, ChatRole, GenerateRequest, GroundingMetadata, ModelAnswer, SearchError,
    API_KEY_REQUIRED,
};

/// Sampling parameters forwarded as the `generationConfig` body section.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.9,
            top_p: 1.0,
            top_k: 1,
            max_output_tokens: 2048,
        }
    }
}

pub struct GeminiSearchProvider {
    model: String,
    base_url: String,
    generation: GenerationConfig,
    client: reqwest::Client,
}

impl GeminiSearchProvider {
    pub fn new(model: String, base_url: Option<String>, generation: GenerationConfig) -> Self {
        Self {
            model,
            base_url: base_url.unwrap_or_else(|| "https://generativelanguage.googleapis.com".into()),
            generation,
            client: reqwest::Client::new(),
        }
    }

    /// Build a provider from the `[model]` config table, applying sampling
    /// overrides on top of the defaults.
    pub fn from_model_config(cfg: &fsearch_config::ModelConfig) -> Self {
        let mut generation = GenerationConfig::default();
        if let Some(t) = cfg.temperature {
            generation.temperature = t;
        }
        if let Some(p) = cfg.top_p {
            generation.top_p = p;
        }
        if let Some(k) = cfg.top_k {
            generation.top_k = k;
        }
        if let Some(m) = cfg.max_output_tokens {
            generation.max_output_tokens = m;
        }
        Self::new(cfg.name.clone(), cfg.base_url.clone(), generation)
    }
}

#[async_trait]
impl crate::SearchModel for GeminiSearchProvider {
    fn name(&self) -> &str {
        "gemini"
    }
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, req: GenerateRequest) -> Result<ModelAnswer, SearchError> {
        if req.api_key.trim().is_empty() {
            return Err(SearchError::credential(API_KEY_REQUIRED));
        }

        let body = build_request_body(&req.messages, &self.generation);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );

        debug!(model = %self.model, turns = req.messages.len(), "sending Gemini search request");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", req.api_key.trim())
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::Upstream(anyhow::Error::new(e).context("Gemini request failed")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(classify_api_error(status, &text));
        }

        let v: Value = resp
            .json()
            .await
            .map_err(|e| SearchError::Upstream(anyhow::Error::new(e).context("decoding Gemini response")))?;
        Ok(parse_response(v))
    }
}

/// Assemble the `generateContent` request body: the conversation in wire
/// roles, the `google_search` tool, and the sampling config.
fn build_request_body(messages: &[ChatHistoryEntry], generation: &GenerationConfig) -> Value {
    let contents: Vec<Value> = messages.iter().map(entry_to_content).collect();
    json!({
        "contents": contents,
        "tools": [{ "google_search": {} }],
        "generationConfig": generation,
    })
}

/// Map one history entry onto the Gemini `contents` element.  The API labels
/// its own turns `"model"`; callers say `"assistant"`.  `"user"` passes
/// through unchanged and order is preserved by the caller.
fn entry_to_content(m: &ChatHistoryEntry) -> Value {
    let role = match m.role {
        ChatRole::User => "user",
        ChatRole::Assistant => "model",
    };
    json!({ "role": role, "parts": [{ "text": m.content }] })
}

/// Extract the answer text and typed grounding metadata from a successful
/// `generateContent` response.  Metadata that fails to decode is logged and
/// dropped; the answer text is still usable without citations.
fn parse_response(v: Value) -> ModelAnswer {
    let candidate = &v["candidates"][0];

    let text = candidate["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .concat()
        })
        .unwrap_or_default();

    let grounding = candidate
        .get("groundingMetadata")
        .cloned()
        .and_then(|g| match serde_json::from_value::<GroundingMetadata>(g) {
            Ok(m) => Some(m),
            Err(e) => {
                warn!("discarding undecodable grounding metadata: {e}");
                None
            }
        });

    ModelAnswer { text, grounding, raw: Some(v) }
}

/// Classify a non-2xx API response at the point of failure.
///
/// A bad key surfaces as HTTP 400 with reason `API_KEY_INVALID`; expired or
/// unauthorized keys come back as 401/403.  Everything else is upstream noise
/// we pass along verbatim.
fn classify_api_error(status: reqwest::StatusCode, body: &str) -> SearchError {
    if status == reqwest::StatusCode::UNAUTHORIZED
        || status == reqwest::StatusCode::FORBIDDEN
        || body.contains("API_KEY_INVALID")
    {
        return SearchError::credential(format!("Gemini rejected the API key ({status})"));
    }
    SearchError::Upstream(anyhow::anyhow!("Gemini error {status}: {body}"))
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
