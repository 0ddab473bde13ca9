mod error;
mod types;
mod grounding;
mod provider;
mod gemini;
mod mock;

pub use error::{SearchError, API_KEY_REQUIRED};
pub use types::*;
pub use grounding::*;
pub use provider::SearchModel;
pub use gemini::{GeminiSearchProvider, GenerationConfig};
pub use mock::{MockSearchProvider, ScriptedMockProvider};

use anyhow::bail;
use fsearch_config::ModelConfig;

/// Construct a boxed [`SearchModel`] from configuration.
///
/// Provider selection:
/// - `"gemini"` → [`GeminiSearchProvider`]
/// - `"mock"` → [`MockSearchProvider`] (echo-back)
pub fn from_config(cfg: &ModelConfig) -> anyhow::Result<Box<dyn SearchModel>> {
    match cfg.provider.as_str() {
        "gemini" => Ok(Box::new(GeminiSearchProvider::from_model_config(cfg))),
        "mock" => Ok(Box::new(MockSearchProvider)),
        other => bail!("unknown model provider: {other}"),
    }
}

/// Resolve the API key from configuration: explicit key first, then the
/// configured environment variable.  Per-request keys override both.
pub fn resolve_api_key(cfg: &ModelConfig) -> Option<String> {
    if let Some(k) = &cfg.api_key {
        return Some(k.clone());
    }
    if let Some(env) = &cfg.api_key_env {
        return std::env::var(env).ok();
    }
    None
}
