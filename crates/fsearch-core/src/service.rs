// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use fsearch_model::{
    ChatHistoryEntry, GenerateRequest, GroundingMetadata, SearchError, SearchModel,
    API_KEY_REQUIRED,
};

use crate::{extract_sources, MarkdownFormatter, ResponseFormatter, Source};

/// Everything produced for one search or follow-up turn.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Raw answer text, as the model produced it.
    pub text: String,
    /// HTML rendering of the answer.
    pub formatted_text: String,
    /// Deduplicated cited sources, in first-occurrence order.
    pub sources: Vec<Source>,
    /// Decoded grounding metadata, when the model returned any.
    pub grounding: Option<GroundingMetadata>,
    /// The undecoded provider response, for debugging surfaces.
    pub raw: Option<Value>,
}

/// The search gateway: validates inputs, makes exactly one provider call,
/// then runs the formatter and the source extractor over the answer.
///
/// Constructed once at startup and passed to its callers explicitly; there
/// is no global accessor, so tests substitute a mock provider without
/// touching shared state.
pub struct SearchService {
    provider: Arc<dyn SearchModel>,
    formatter: Arc<dyn ResponseFormatter>,
}

impl SearchService {
    pub fn new(provider: Arc<dyn SearchModel>, formatter: Arc<dyn ResponseFormatter>) -> Self {
        Self { provider, formatter }
    }

    /// Service with the default heuristic markdown formatter.
    pub fn with_default_formatter(provider: Arc<dyn SearchModel>) -> Self {
        Self::new(provider, Arc::new(MarkdownFormatter))
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// A fresh query: the conversation is just the query itself.
    pub async fn search(&self, query: &str, api_key: &str) -> Result<SearchOutcome, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::missing("Query is required"));
        }
        if api_key.trim().is_empty() {
            return Err(SearchError::credential(API_KEY_REQUIRED));
        }
        debug!(model = self.provider.model_name(), "search");

        let req = GenerateRequest {
            messages: vec![ChatHistoryEntry::user(query)],
            api_key: api_key.to_string(),
        };
        self.complete(req).await
    }

    /// A follow-up: the supplied history is replayed in order, the new query
    /// appended as the newest turn.
    pub async fn follow_up(
        &self,
        query: &str,
        history: &[ChatHistoryEntry],
        api_key: &str,
    ) -> Result<SearchOutcome, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::missing("Query is required"));
        }
        if api_key.trim().is_empty() {
            return Err(SearchError::credential(API_KEY_REQUIRED));
        }
        if history.is_empty() {
            return Err(SearchError::missing(
                "Conversation history is required for follow-up questions",
            ));
        }
        debug!(model = self.provider.model_name(), turns = history.len(), "follow-up");

        let mut messages = history.to_vec();
        messages.push(ChatHistoryEntry::user(query));
        self.complete(GenerateRequest { messages, api_key: api_key.to_string() })
            .await
    }

    /// One provider round-trip plus post-processing.  Provider failures are
    /// never caught here; they surface to the caller unchanged.
    async fn complete(&self, req: GenerateRequest) -> Result<SearchOutcome, SearchError> {
        let answer = self.provider.generate(req).await?;
        let formatted_text = self.formatter.format_to_markdown(&answer.text).await;
        let sources = extract_sources(answer.grounding.as_ref());
        Ok(SearchOutcome {
            text: answer.text,
            formatted_text,
            sources,
            grounding: answer.grounding,
            raw: answer.raw,
        })
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
