// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Typed grounding metadata as returned by the Gemini API.
//!
//! Every field is optional: the upstream shape is only loosely documented and
//! responses without web results omit whole sections.  Decoding happens once,
//! in the provider; everything downstream can rely on this shape.

use serde::{Deserialize, Serialize};

/// Citation data linking spans of the answer text to the web sources that
/// informed it.  Never persisted; consumed per response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroundingMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_search_queries: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grounding_chunks: Option<Vec<GroundingChunk>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grounding_supports: Option<Vec<GroundingSupport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_entry_point: Option<SearchEntryPoint>,
}

/// One candidate cited source, referenced by index from grounding supports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundingChunk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web: Option<WebSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A span of the answer text plus the indices of the chunks it is
/// attributed to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroundingSupport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<TextSegment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grounding_chunk_indices: Option<Vec<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_scores: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextSegment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchEntryPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered_content: Option<String>,
}

impl GroundingMetadata {
    /// Convenience constructor used heavily in tests: chunks as
    /// `(uri, title)` pairs and supports as `(text, chunk_indices)` pairs.
    pub fn from_parts(
        chunks: Vec<(&str, &str)>,
        supports: Vec<(&str, Vec<usize>)>,
    ) -> Self {
        Self {
            grounding_chunks: Some(
                chunks
                    .into_iter()
                    .map(|(uri, title)| GroundingChunk {
                        web: Some(WebSource {
                            uri: Some(uri.to_string()),
                            title: Some(title.to_string()),
                        }),
                    })
                    .collect(),
            ),
            grounding_supports: Some(
                supports
                    .into_iter()
                    .map(|(text, idx)| GroundingSupport {
                        segment: Some(TextSegment {
                            text: Some(text.to_string()),
                            ..Default::default()
                        }),
                        grounding_chunk_indices: Some(idx),
                        confidence_scores: None,
                    })
                    .collect(),
            ),
            ..Default::default()
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_camel_case_wire_format() {
        let json = r#"{
            "webSearchQueries": ["rust async"],
            "groundingChunks": [{"web": {"uri": "https://example.com", "title": "Example"}}],
            "groundingSupports": [{
                "segment": {"startIndex": 0, "endIndex": 10, "text": "Rust is"},
                "groundingChunkIndices": [0],
                "confidenceScores": [0.97]
            }]
        }"#;
        let m: GroundingMetadata = serde_json::from_str(json).unwrap();
        let chunks = m.grounding_chunks.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0].web.as_ref().unwrap().uri.as_deref(),
            Some("https://example.com")
        );
        let supports = m.grounding_supports.unwrap();
        assert_eq!(supports[0].grounding_chunk_indices.as_deref(), Some(&[0][..]));
        assert_eq!(
            supports[0].segment.as_ref().unwrap().text.as_deref(),
            Some("Rust is")
        );
    }

    #[test]
    fn decodes_empty_object() {
        let m: GroundingMetadata = serde_json::from_str("{}").unwrap();
        assert!(m.grounding_chunks.is_none());
        assert!(m.grounding_supports.is_none());
    }

    #[test]
    fn tolerates_chunks_without_web_section() {
        // Non-web chunks (e.g. retrieved context) appear as empty objects.
        let json = r#"{"groundingChunks": [{}, {"web": {"uri": "https://a.io", "title": "A"}}]}"#;
        let m: GroundingMetadata = serde_json::from_str(json).unwrap();
        let chunks = m.grounding_chunks.unwrap();
        assert!(chunks[0].web.is_none());
        assert!(chunks[1].web.is_some());
    }

    #[test]
    fn from_parts_builds_expected_shape() {
        let m = GroundingMetadata::from_parts(
            vec![("https://a.io", "A")],
            vec![("quoted span", vec![0])],
        );
        assert_eq!(m.grounding_chunks.as_ref().unwrap().len(), 1);
        assert_eq!(m.grounding_supports.as_ref().unwrap().len(), 1);
    }
}
