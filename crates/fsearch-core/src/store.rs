// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Local persistence of conversation state.
//!
//! One JSON document, `conversations.json`, under the fsearch data directory
//! (`$XDG_DATA_HOME/fsearch` unless overridden).  Records are keyed by
//! session id; the query string acts as a secondary index so a re-submitted
//! query resumes its conversation.  The same record set backs the
//! session-list view; there is no second store to drift out of sync.
//!
//! Corrupt or unreadable persisted data is treated as absent, never as an
//! error: a damaged file must not block new searches.  Writes are
//! last-writer-wins with no locking; concurrent processes may race, which is
//! an accepted limitation of device-local state.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use fsearch_model::ChatHistoryEntry;

use crate::Source;

/// One saved conversation: resume state and session-list entry in a single
/// record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub session_id: String,
    /// The exact, unencoded query string of the most recent top-level search.
    /// Two different literal queries never share state.
    pub query: String,
    /// Formatted summary from the latest turn.
    pub summary: String,
    pub sources: Vec<Source>,
    /// Full accumulated history, replayed in order on follow-up.
    pub history: Vec<ChatHistoryEntry>,
    /// True once at least one follow-up has been answered.
    pub is_follow_up: bool,
    pub created_at: DateTime<Utc>,
}

impl ConversationState {
    /// State for a fresh top-level search: a two-entry history of the query
    /// and the model's raw answer.
    pub fn from_search(
        session_id: impl Into<String>,
        query: impl Into<String>,
        summary: impl Into<String>,
        sources: Vec<Source>,
        answer_text: impl Into<String>,
    ) -> Self {
        let query = query.into();
        Self {
            session_id: session_id.into(),
            history: vec![
                ChatHistoryEntry::user(query.clone()),
                ChatHistoryEntry::assistant(answer_text),
            ],
            query,
            summary: summary.into(),
            sources,
            is_follow_up: false,
            created_at: Utc::now(),
        }
    }
}

const STORE_FILE: &str = "conversations.json";

/// File-backed conversation store.
pub struct ConversationStore {
    path: PathBuf,
}

impl ConversationStore {
    /// Store rooted at `dir` (the file inside is created lazily on first save).
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { path: dir.into().join(STORE_FILE) }
    }

    /// Store under the default data directory.
    pub fn at_default() -> Self {
        Self::open(Self::default_dir())
    }

    /// `$XDG_DATA_HOME/fsearch` (i.e. `~/.local/share/fsearch`).
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".local")
                    .join("share")
            })
            .join("fsearch")
    }

    /// Idempotent upsert.  No-op when the record's query is empty.  Replaces
    /// any record with the same session id, and any record with the same
    /// query: a query re-submitted as a new search overwrites its prior
    /// conversation rather than duplicating it.
    pub fn save(&self, state: &ConversationState) -> Result<()> {
        if state.query.is_empty() {
            return Ok(());
        }
        let mut records = self.read_all();
        records.retain(|r| r.session_id != state.session_id && r.query != state.query);
        // Most recent first, which is also the list view's order.
        records.insert(0, state.clone());
        self.write_all(&records)
    }

    /// Resume lookup by the exact query string.  Empty, unknown, and corrupt
    /// all come back as `None`.
    pub fn load_by_query(&self, query: &str) -> Option<ConversationState> {
        if query.is_empty() {
            return None;
        }
        self.read_all().into_iter().find(|r| r.query == query)
    }

    pub fn load_by_session(&self, session_id: &str) -> Option<ConversationState> {
        if session_id.is_empty() {
            return None;
        }
        self.read_all().into_iter().find(|r| r.session_id == session_id)
    }

    /// The follow-up mutation: replace summary and sources, append the new
    /// exchange to the history, and mark the conversation as followed-up.
    /// Returns the updated record, or `None` when the session is unknown.
    pub fn append_exchange(
        &self,
        session_id: &str,
        summary: &str,
        sources: &[Source],
        new_entries: &[ChatHistoryEntry],
    ) -> Result<Option<ConversationState>> {
        let mut records = self.read_all();
        let Some(record) = records.iter_mut().find(|r| r.session_id == session_id) else {
            return Ok(None);
        };
        record.summary = summary.to_string();
        record.sources = sources.to_vec();
        record.history.extend(new_entries.iter().cloned());
        record.is_follow_up = true;
        let updated = record.clone();
        self.write_all(&records)?;
        Ok(Some(updated))
    }

    pub fn clear_by_query(&self, query: &str) -> Result<()> {
        if query.is_empty() {
            return Ok(());
        }
        let mut records = self.read_all();
        records.retain(|r| r.query != query);
        self.write_all(&records)
    }

    pub fn delete_session(&self, session_id: &str) -> Result<()> {
        let mut records = self.read_all();
        records.retain(|r| r.session_id != session_id);
        self.write_all(&records)
    }

    pub fn clear_all(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("removing {}", self.path.display()))?;
        }
        Ok(())
    }

    /// Every saved conversation, most recent first.
    pub fn list_all(&self) -> Vec<ConversationState> {
        self.read_all()
    }

    fn read_all(&self) -> Vec<ConversationState> {
        let Ok(text) = fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        match serde_json::from_str(&text) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %self.path.display(), "ignoring corrupt conversation store: {e}");
                Vec::new()
            }
        }
    }

    fn write_all(&self, records: &[ConversationState]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing {}", self.path.display()))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
