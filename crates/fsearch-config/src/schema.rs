// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Provider identifier: "gemini" | "mock"
    pub provider: String,
    /// Model name forwarded to the provider API
    pub name: String,
    /// Environment variable that holds the API key (read at runtime)
    pub api_key_env: Option<String>,
    /// Explicit API key; prefer api_key_env in config files to avoid secrets
    /// in version-controlled files
    pub api_key: Option<String>,
    /// Base URL override.  Useful for local proxies or regional endpoints.
    pub base_url: Option<String>,
    /// Maximum tokens to request in a single completion
    pub max_output_tokens: Option<u32>,
    /// Sampling temperature (0.0–2.0)
    pub temperature: Option<f32>,
    /// Nucleus sampling cutoff
    pub top_p: Option<f32>,
    /// Top-k sampling cutoff
    pub top_k: Option<u32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".into(),
            name: "gemini-2.0-flash-exp".into(),
            api_key_env: Some("GEMINI_API_KEY".into()),
            api_key: None,
            base_url: None,
            max_output_tokens: None,
            temperature: None,
            top_p: None,
            top_k: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP API binds to.
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:3017".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for saved conversation state.
    /// Defaults to `$XDG_DATA_HOME/fsearch` when not set.
    pub state_dir: Option<PathBuf>,
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
