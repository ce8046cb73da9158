pub mod gemini;
pub mod openai;

use crate::{errors::PromptError, types::ConversationMessage};
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::{fmt::Debug, time::Duration};

/// Sampling temperature used for query generation. Kept low so the structure
/// of the generated statement is repeatable.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Request-shaping settings shared by every provider.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// A trait for interacting with a completion endpoint.
///
/// One call is one request: providers never retry on their own.
#[async_trait]
pub trait AiProvider: Send + Sync + Debug + DynClone {
    /// Sends the system instruction, the prior conversation turns verbatim and
    /// the final user turn, and returns the raw completion text.
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[ConversationMessage],
        user_prompt: &str,
    ) -> Result<String, PromptError>;
}

dyn_clone::clone_trait_object!(AiProvider);

pub(crate) fn build_http_client(
    settings: &GenerationSettings,
) -> Result<reqwest::Client, PromptError> {
    reqwest::Client::builder()
        .timeout(settings.timeout)
        .build()
        .map_err(PromptError::ReqwestClientBuild)
}
