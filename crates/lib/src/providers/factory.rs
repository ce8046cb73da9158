//! # AI Provider Factory
//!
//! Builds the configured completion client from the read-only provider
//! settings (`provider_api_key`, `model_name`, ...). Any consumer of the
//! library (server, tests) goes through here so construction stays uniform.

use crate::{
    errors::PromptError,
    providers::ai::{
        gemini::{gemini_url_for_model, GeminiProvider},
        openai::{OpenAiProvider, DEFAULT_OPENAI_URL},
        AiProvider, GenerationSettings,
    },
};
use tracing::info;

/// The provider settings the core reads but never writes.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// `openai` (including compatible servers) or `gemini`.
    pub provider: String,
    pub api_url: Option<String>,
    pub provider_api_key: Option<String>,
    pub model_name: String,
    pub generation: GenerationSettings,
}

/// Creates an AI provider instance from the settings.
pub fn create_provider(settings: &ProviderSettings) -> Result<Box<dyn AiProvider>, PromptError> {
    let provider: Box<dyn AiProvider> = match settings.provider.as_str() {
        "openai" | "local" => {
            let api_url = settings
                .api_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());
            info!(api_url = %api_url, model = %settings.model_name, "Configuring OpenAI-compatible provider.");
            Box::new(OpenAiProvider::new(
                api_url,
                settings.provider_api_key.clone(),
                settings.model_name.clone(),
                settings.generation.clone(),
            )?)
        }
        "gemini" => {
            let api_url = settings
                .api_url
                .clone()
                .unwrap_or_else(|| gemini_url_for_model(&settings.model_name));
            info!(api_url = %api_url, "Configuring Gemini provider.");
            Box::new(GeminiProvider::new(
                api_url,
                settings.provider_api_key.clone(),
                settings.generation.clone(),
            )?)
        }
        other => return Err(PromptError::UnsupportedProvider(other.to_string())),
    };
    Ok(provider)
}
