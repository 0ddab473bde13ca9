// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Heuristic formatting of raw model answers into renderable HTML.
//!
//! Gemini answers plain text with colon-delimited section labels, unicode
//! bullet glyphs, and bare URLs.  The pipeline below promotes those patterns
//! to markdown structure, then renders the result as HTML.  The heuristic is
//! ambiguous by nature ("Note: see below" in running prose becomes a heading
//! too); it sits behind [`ResponseFormatter`] so a structured-output strategy
//! can replace it without touching callers.
//!
//! Output is deterministic for a given input.  Idempotence is NOT guaranteed:
//! the formatter runs exactly once per raw response.

use std::sync::OnceLock;

use async_trait::async_trait;
use pulldown_cmark::{html, Event, Options, Parser};
use regex::Regex;

/// Formats a raw model answer for rendering.
#[async_trait]
pub trait ResponseFormatter: Send + Sync {
    async fn format_to_markdown(&self, text: &str) -> String;
}

/// The default heuristic formatter.
#[derive(Default)]
pub struct MarkdownFormatter;

#[async_trait]
impl ResponseFormatter for MarkdownFormatter {
    async fn format_to_markdown(&self, text: &str) -> String {
        format_to_markdown(text)
    }
}

/// Run the full pipeline: label promotion, bullet/link normalization,
/// paragraph spacing, HTML rendering.
pub fn format_to_markdown(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let text = promote_section_labels(&text);
    let text = promote_sub_labels(&text);
    let text = normalize_bullets(&text);
    let text = link_bare_urls(&text);
    let markdown = space_paragraphs(&text);
    render_html(&markdown)
}

/// `Label` = a letter followed by letters and spaces, up to a colon.
fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z][A-Za-z ]+):(.*)$").unwrap())
}

/// Lines opening with `Label:` become H2 headings.  The colon is dropped and
/// trailing content stays on the same line.
fn promote_section_labels(text: &str) -> String {
    text.split('\n')
        .map(|line| match label_re().captures(line) {
            Some(c) => format!("## {}{}", &c[1], &c[2]),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remaining `Label:` line starts become H3 headings.  Skips lines already
/// promoted (they now open with `#`) and labels immediately followed by a
/// digit, so time-like patterns such as `3:00` or `Time:30` stay untouched.
fn promote_sub_labels(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.starts_with('#') {
                return line.to_string();
            }
            match label_re().captures(line) {
                Some(c) if !c[2].starts_with(|ch: char| ch.is_ascii_digit()) => {
                    format!("### {}{}", &c[1], &c[2])
                }
                _ => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rewrite unicode bullet glyphs at line start to a markdown list marker.
fn normalize_bullets(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^[•●○]\s*").unwrap());
    text.split('\n')
        .map(|line| match re.find(line) {
            Some(m) => format!("* {}", &line[m.end()..]),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wrap bare `http(s)://` URLs as `[url](url)`.  URLs already inside
/// markdown link syntax (preceded by `(` or `[`) are left alone.
fn link_bare_urls(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"https?://[^\s)]+").unwrap());

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in re.find_iter(text) {
        out.push_str(&text[last..m.start()]);
        let prev = text[..m.start()].chars().next_back();
        if matches!(prev, Some('(') | Some('[')) {
            out.push_str(m.as_str());
        } else {
            out.push_str(&format!("[{0}]({0})", m.as_str()));
        }
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}

/// Re-join paragraphs on blank-line boundaries; plain prose paragraphs get a
/// trailing newline for spacing, headings and lists pass through.
fn space_paragraphs(text: &str) -> String {
    text.split("\n\n")
        .filter(|p| !p.is_empty())
        .map(|p| {
            if p.starts_with('#') || p.starts_with('*') || p.starts_with('-') {
                p.to_string()
            } else {
                format!("{p}\n")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render markdown as HTML with GFM-style extensions; soft line breaks
/// become hard breaks so the model's single newlines survive rendering.
fn render_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options).map(|ev| match ev {
        Event::SoftBreak => Event::HardBreak,
        ev => ev,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
