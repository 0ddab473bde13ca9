// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use fsearch_model::GroundingMetadata;

/// One cited web source.  At most one per distinct URL within a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
    /// Space-joined text of every grounding span attributed to this URL.
    pub snippet: String,
}

/// Walk the grounding metadata and build the deduplicated, ordered source
/// list.
///
/// A chunk contributes only when it has both a non-empty web URI and title.
/// Chunk iteration order determines output order; the first chunk seen for a
/// URL wins, later chunks with the same URL are ignored even if their title
/// differs.  A chunk with no matching supports yields an empty snippet.
pub fn extract_sources(metadata: Option<&GroundingMetadata>) -> Vec<Source> {
    let Some(metadata) = metadata else {
        return Vec::new();
    };
    let chunks = metadata.grounding_chunks.as_deref().unwrap_or(&[]);
    let supports = metadata.grounding_supports.as_deref().unwrap_or(&[]);

    let mut seen: HashSet<&str> = HashSet::new();
    let mut sources = Vec::new();

    for (index, chunk) in chunks.iter().enumerate() {
        let Some(web) = &chunk.web else { continue };
        let (Some(uri), Some(title)) = (web.uri.as_deref(), web.title.as_deref()) else {
            continue;
        };
        if uri.is_empty() || title.is_empty() {
            continue;
        }
        if !seen.insert(uri) {
            continue;
        }

        let snippet = supports
            .iter()
            .filter(|s| {
                s.grounding_chunk_indices
                    .as_deref()
                    .unwrap_or(&[])
                    .contains(&index)
            })
            .filter_map(|s| s.segment.as_ref()?.text.as_deref())
            .collect::<Vec<_>>()
            .join(" ");

        sources.push(Source {
            title: title.to_string(),
            url: uri.to_string(),
            snippet,
        });
    }

    sources
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
