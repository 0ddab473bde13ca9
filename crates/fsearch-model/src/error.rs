// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

/// Canonical message shown whenever a request reaches the pipeline without an
/// API key.
pub const API_KEY_REQUIRED: &str = "API key is required to use this search function. \
     Please provide your Gemini API key in settings.";

/// Typed failure taxonomy for the search pipeline.
///
/// The kind is set at the point of failure and carried unchanged to the API
/// boundary, where it maps to an HTTP status.  Downstream code matches on the
/// variant, never on message text.
#[derive(Debug, Error)]
pub enum SearchError {
    /// A required input was absent or empty.  → 400
    #[error("{0}")]
    MissingParameter(String),

    /// The API key was absent or rejected by the provider.  → 401
    #[error("{0}")]
    InvalidCredential(String),

    /// The referenced chat session is unknown or expired.  → 404
    #[error("{0}")]
    SessionNotFound(String),

    /// Anything else: network failure, quota, provider error.  → 500
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

impl SearchError {
    pub fn missing(msg: impl Into<String>) -> Self {
        Self::MissingParameter(msg.into())
    }

    pub fn credential(msg: impl Into<String>) -> Self {
        Self::InvalidCredential(msg.into())
    }

    pub fn session(msg: impl Into<String>) -> Self {
        Self::SessionNotFound(msg.into())
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
