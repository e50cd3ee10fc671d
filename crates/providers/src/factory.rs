//! Build the configured completion backend.

use crate::OpenAiCompatProvider;
use std::sync::Arc;
use toolclaw_config::AppConfig;
use toolclaw_core::error::BackendError;
use toolclaw_core::provider::Provider;
use tracing::info;

/// Backends that run locally and accept any key.
const KEYLESS: [&str; 3] = ["ollama", "vllm", "llamacpp"];

/// Build the backend named by `config.provider`.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, BackendError> {
    let name = config.provider.as_str();
    let api_key = match &config.api_key {
        Some(key) => key.clone(),
        None if KEYLESS.contains(&name) => name.to_string(),
        None => {
            return Err(BackendError::NotConfigured(format!(
                "no API key for '{name}'. Set TOOLCLAW_API_KEY or api_key in the config file"
            )));
        }
    };

    let base_url = config
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(name));

    info!(provider = %name, base_url = %base_url, model = %config.model, "Backend configured");
    Ok(Arc::new(OpenAiCompatProvider::new(name, base_url, api_key)))
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" => "http://localhost:8080/v1".into(),
        _ => "https://api.openai.com/v1".into(),
    }
}
