// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//!
//! Response-normalization and conversation-state pipeline.
//!
//! - `format`: heuristic markdown promotion + HTML rendering of raw answers
//! - `sources`: deduplicated citation extraction from grounding metadata
//! - `service`: the search/follow-up gateway over a [`fsearch_model::SearchModel`]
//! - `store`: local persistence of conversation state, keyed by session with
//!   a query index

mod format;
mod service;
mod sources;
mod store;

pub use format::{format_to_markdown, MarkdownFormatter, ResponseFormatter};
pub use service::{SearchOutcome, SearchService};
pub use sources::{extract_sources, Source};
pub use store::{ConversationState, ConversationStore};
