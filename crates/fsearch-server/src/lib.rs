// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! The HTTP API boundary: two operations, stateless across requests.
//!
//! - `GET /api/search?q=...&apiKey=...` for a fresh query
//! - `POST /api/follow-up` for a query plus the caller's accumulated history
//!
//! The server holds no conversation table.  The session id it mints is a
//! correlation hint; the history array the client sends back on follow-up is
//! the sole source of truth.  Typed [`fsearch_model::SearchError`] kinds map
//! to HTTP statuses, never message-text inspection.

mod error;
mod payload;
mod routes;

pub use error::ApiError;
pub use payload::*;
pub use routes::{new_session_id, router};

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use fsearch_core::SearchService;

/// Bind `listen` and serve the API until shutdown.  The service is injected
/// by the caller; substituting a stub provider needs no global state.
pub async fn run(listen: &str, service: Arc<SearchService>) -> anyhow::Result<()> {
    let app = router(service);
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("binding {listen}"))?;
    info!(addr = %listener.local_addr()?, "fsearch API listening");
    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}
