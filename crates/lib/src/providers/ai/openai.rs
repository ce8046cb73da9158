use crate::{
    errors::PromptError,
    providers::ai::{build_http_client, AiProvider, GenerationSettings},
    types::ConversationMessage,
};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use tracing::debug;

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

// --- OpenAI-compatible request and response structures ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Deserialize, Debug)]
struct ChatChoiceMessage {
    content: Option<String>,
}

// --- Provider implementation ---

/// A provider for OpenAI and OpenAI-compatible chat completion APIs.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: ReqwestClient,
    api_url: String,
    api_key: Option<String>,
    model: String,
    settings: GenerationSettings,
}

impl Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    /// Creates a new `OpenAiProvider`.
    ///
    /// A missing key is not an error here; it is reported on every `generate`
    /// call so a misconfigured server still starts and explains itself.
    pub fn new(
        api_url: String,
        api_key: Option<String>,
        model: String,
        settings: GenerationSettings,
    ) -> Result<Self, PromptError> {
        let client = build_http_client(&settings)?;
        Ok(Self {
            client,
            api_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model,
            settings,
        })
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[ConversationMessage],
        user_prompt: &str,
    ) -> Result<String, PromptError> {
        let api_key = self.api_key.as_deref().ok_or(PromptError::MissingApiKey)?;

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage {
            role: "system",
            content: system_prompt,
        });
        messages.extend(history.iter().map(|m| ChatMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));
        messages.push(ChatMessage {
            role: "user",
            content: user_prompt,
        });

        let request_body = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_output_tokens,
            stream: false,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(PromptError::AiRequest)?;

        let status = response.status();
        let body = response.text().await.map_err(PromptError::AiRequest)?;
        if !status.is_success() {
            return Err(PromptError::AiApi {
                status: status.as_u16(),
                body,
            });
        }
        debug!("<-- Raw completion body: {body}");

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| PromptError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| {
                PromptError::MalformedResponse(
                    "response has no `choices[0].message.content` field".to_string(),
                )
            })
    }
}
