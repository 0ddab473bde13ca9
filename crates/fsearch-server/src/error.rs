// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use fsearch_model::SearchError;

/// Wrapper that maps the typed error taxonomy onto the wire contract.
/// The mapping is a match on the kind; the carried message is only ever
/// payload, never a classifier.
#[derive(Debug)]
pub struct ApiError(pub SearchError);

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        Self(e)
    }
}

/// Status for each error kind.  Split out of `into_response` so the mapping
/// is directly testable.
pub fn status_for(e: &SearchError) -> StatusCode {
    match e {
        SearchError::MissingParameter(_) => StatusCode::BAD_REQUEST,
        SearchError::InvalidCredential(_) => StatusCode::UNAUTHORIZED,
        SearchError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        SearchError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let message = match self.0 {
            SearchError::MissingParameter(m) => m,
            SearchError::InvalidCredential(_) => {
                "Invalid API key. Please check your settings and try again.".to_string()
            }
            SearchError::SessionNotFound(m) => {
                if m.is_empty() {
                    "Chat session not found or expired".to_string()
                } else {
                    m
                }
            }
            SearchError::Upstream(e) => {
                error!("search pipeline failure: {e:#}");
                let m = e.to_string();
                if m.is_empty() {
                    "An error occurred while processing your search".to_string()
                } else {
                    m
                }
            }
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
