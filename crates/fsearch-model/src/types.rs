// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

use crate::GroundingMetadata;

/// Conversation roles as seen by callers.  The wire role for model turns is
/// provider-specific and mapped inside each driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A single turn in the conversation history.  Order is semantically
/// significant: follow-ups replay the entries to the model exactly as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatHistoryEntry {
    pub role: ChatRole,
    pub content: String,
}

impl ChatHistoryEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: text.into() }
    }
}

/// One request to a search-grounded model: the prior turns (possibly empty)
/// with the newest user query as the last entry, plus the caller's API key.
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub messages: Vec<ChatHistoryEntry>,
    pub api_key: String,
}

/// The provider's answer to one [`GenerateRequest`].
#[derive(Debug, Clone, Default)]
pub struct ModelAnswer {
    /// Plain answer text, concatenated across response parts.
    pub text: String,
    /// Citation metadata, decoded once at the provider boundary.
    pub grounding: Option<GroundingMetadata>,
    /// The undecoded provider response, kept for debugging surfaces.
    pub raw: Option<serde_json::Value>,
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_constructors_set_roles() {
        assert_eq!(ChatHistoryEntry::user("q").role, ChatRole::User);
        assert_eq!(ChatHistoryEntry::assistant("a").role, ChatRole::Assistant);
    }

    #[test]
    fn roles_serialize_lowercase() {
        let e = ChatHistoryEntry::assistant("hi");
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains(r#""role":"assistant""#), "{json}");
    }

    #[test]
    fn entry_round_trips() {
        let e = ChatHistoryEntry::user("what is rust");
        let json = serde_json::to_string(&e).unwrap();
        let back: ChatHistoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
