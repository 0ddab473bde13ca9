// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Wire payloads for the two API operations.  Field names are camelCase on
//! the wire; both serialize and deserialize so the bundled HTTP client can
//! share these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fsearch_core::Source;
use fsearch_model::ChatHistoryEntry;

/// Body of a successful `GET /api/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponseBody {
    pub session_id: String,
    pub query: String,
    /// HTML-rendered answer.
    pub summary: String,
    pub sources: Vec<Source>,
    /// The two-entry conversation seed: `[user: query, assistant: raw text]`.
    pub history: Vec<ChatHistoryEntry>,
    pub raw: RawPayload,
    pub metadata: ResponseMetadata,
}

/// Body of a successful `POST /api/follow-up`.  Deliberately excludes the
/// prior history the caller already holds; only the new exchange is returned
/// and the caller appends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpResponseBody {
    pub session_id: String,
    pub summary: String,
    pub sources: Vec<Source>,
    pub new_history_entries: Vec<ChatHistoryEntry>,
    pub raw: RawPayload,
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPayload {
    /// The raw model answer, for debugging or advanced use.
    pub model_response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

/// Request body of `POST /api/follow-up`.  Every field defaults so that a
/// missing field reaches the validator (which answers 400 with a
/// field-specific message) instead of dying inside the JSON extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FollowUpRequestBody {
    pub session_id: String,
    pub query: String,
    pub api_key: String,
    pub history: Vec<ChatHistoryEntry>,
}

/// Error body shared by every failure response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
