use crate::{
    errors::PromptError,
    providers::ai::{build_http_client, AiProvider, GenerationSettings},
    types::{ConversationMessage, Role},
};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

// --- Gemini-specific request and response structures ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize, Debug)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize, Debug)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize, Debug)]
struct PartResponse {
    text: Option<String>,
}

// --- Gemini Provider implementation ---

/// A provider for interacting with the Google Gemini API.
#[derive(Clone)]
pub struct GeminiProvider {
    client: ReqwestClient,
    api_url: String,
    api_key: Option<String>,
    settings: GenerationSettings,
}

impl Debug for GeminiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_url", &self.api_url)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

/// Builds the `generateContent` URL for a model.
pub fn gemini_url_for_model(model_name: &str) -> String {
    format!("https://generativelanguage.googleapis.com/v1beta/models/{model_name}:generateContent")
}

impl GeminiProvider {
    /// Creates a new `GeminiProvider`.
    pub fn new(
        api_url: String,
        api_key: Option<String>,
        settings: GenerationSettings,
    ) -> Result<Self, PromptError> {
        let client = build_http_client(&settings)?;
        Ok(Self {
            client,
            api_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            settings,
        })
    }
}

fn text_content(role: &'static str, text: &str) -> Content {
    Content {
        role: Some(role),
        parts: vec![Part {
            text: text.to_string(),
        }],
    }
}

#[async_trait]
impl AiProvider for GeminiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[ConversationMessage],
        user_prompt: &str,
    ) -> Result<String, PromptError> {
        let api_key = self.api_key.as_deref().ok_or(PromptError::MissingApiKey)?;

        // Gemini names the assistant side of the conversation "model".
        let mut contents: Vec<Content> = history
            .iter()
            .map(|m| match m.role {
                Role::User => text_content("user", &m.content),
                Role::Assistant => text_content("model", &m.content),
            })
            .collect();
        contents.push(text_content("user", user_prompt));

        let request_body = GeminiRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: system_prompt.to_string(),
                }],
            },
            contents,
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(&self.api_url)
            .query(&[("key", api_key)])
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

        let gemini_response: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| PromptError::MalformedResponse(e.to_string()))?;

        gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| {
                PromptError::MalformedResponse(
                    "response has no `candidates[0].content.parts[].text` field".to_string(),
                )
            })
    }
}
