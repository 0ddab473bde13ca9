// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{ChatRole, GenerateRequest, ModelAnswer, SearchError};

/// Deterministic mock provider for tests.  Echoes the last user message
/// back as the answer, with no grounding.
#[derive(Default)]
pub struct MockSearchProvider;

#[async_trait]
impl crate::SearchModel for MockSearchProvider {
    fn name(&self) -> &str {
        "mock"
    }
    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, req: GenerateRequest) -> Result<ModelAnswer, SearchError> {
        let reply = req
            .messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or("[no input]");

        Ok(ModelAnswer {
            text: format!("MOCK: {reply}"),
            grounding: None,
            raw: None,
        })
    }
}

/// A pre-scripted mock provider.  Each call to `generate` pops the next
/// canned answer from the front of the queue.  This lets tests specify exact
/// answers, including grounding metadata, without network access.
pub struct ScriptedMockProvider {
    answers: Mutex<Vec<ModelAnswer>>,
    /// The last `GenerateRequest` seen by this provider.
    /// Written on each `generate()` call so tests can inspect what was sent.
    pub last_request: Mutex<Option<GenerateRequest>>,
}

impl ScriptedMockProvider {
    /// Build a provider from an ordered list of canned answers.
    pub fn new(answers: Vec<ModelAnswer>) -> Self {
        Self {
            answers: Mutex::new(answers),
            last_request: Mutex::new(None),
        }
    }

    /// Convenience: provider that always returns the same plain-text answer.
    pub fn always_text(text: impl Into<String>) -> Self {
        Self::new(vec![ModelAnswer {
            text: text.into(),
            grounding: None,
            raw: None,
        }])
    }

    /// Convenience: a single answer with grounding metadata attached.
    pub fn with_grounding(text: impl Into<String>, grounding: crate::GroundingMetadata) -> Self {
        Self::new(vec![ModelAnswer {
            text: text.into(),
            grounding: Some(grounding),
            raw: None,
        }])
    }
}

#[async_trait]
impl crate::SearchModel for ScriptedMockProvider {
    fn name(&self) -> &str {
        "scripted-mock"
    }
    fn model_name(&self) -> &str {
        "scripted-mock-model"
    }

    async fn generate(&self, req: GenerateRequest) -> Result<ModelAnswer, SearchError> {
        *self.last_request.lock().unwrap() = Some(req);
        let mut answers = self.answers.lock().unwrap();
        if answers.is_empty() {
            // Default fallback when all scripts are consumed
            return Ok(ModelAnswer {
                text: "[no more scripts]".into(),
                grounding: None,
                raw: None,
            });
        }
        Ok(answers.remove(0))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChatHistoryEntry, SearchModel};

    fn req(text: &str) -> GenerateRequest {
        GenerateRequest {
            messages: vec![ChatHistoryEntry::user(text)],
            api_key: "test-key".into(),
        }
    }

    #[tokio::test]
    async fn mock_echoes_last_user_message() {
        let p = MockSearchProvider;
        let answer = p.generate(req("hi")).await.unwrap();
        assert_eq!(answer.text, "MOCK: hi");
    }

    #[tokio::test]
    async fn mock_handles_empty_conversation() {
        let p = MockSearchProvider;
        let answer = p
            .generate(GenerateRequest { messages: vec![], api_key: "k".into() })
            .await
            .unwrap();
        assert!(answer.text.contains("[no input]"));
    }

    #[tokio::test]
    async fn scripted_pops_answers_in_order() {
        let p = ScriptedMockProvider::new(vec![
            ModelAnswer { text: "one".into(), ..Default::default() },
            ModelAnswer { text: "two".into(), ..Default::default() },
        ]);
        assert_eq!(p.generate(req("a")).await.unwrap().text, "one");
        assert_eq!(p.generate(req("b")).await.unwrap().text, "two");
    }

    #[tokio::test]
    async fn scripted_fallback_when_scripts_exhausted() {
        let p = ScriptedMockProvider::new(vec![]);
        let answer = p.generate(req("a")).await.unwrap();
        assert!(answer.text.contains("no more scripts"));
    }

    #[tokio::test]
    async fn scripted_records_last_request() {
        let p = ScriptedMockProvider::always_text("hi");
        p.generate(req("remember me")).await.unwrap();
        let seen = p.last_request.lock().unwrap();
        let seen = seen.as_ref().expect("request should be recorded");
        assert_eq!(seen.messages[0].content, "remember me");
        assert_eq!(seen.api_key, "test-key");
    }
}
