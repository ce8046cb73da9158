//! # Query Generator
//!
//! Sends the bounded context, the caller's conversation history and the
//! question to the completion endpoint and returns the candidate statement
//! with any code fences removed. One call per invocation; retries are the
//! pipeline's decision.

use crate::{
    errors::PromptError,
    prompts::{
        context::build_context,
        core::{
            CORRECTION_SYSTEM_ADDENDUM, CORRECTION_USER_PROMPT, FINAL_INSTRUCTION,
            QUERY_GENERATION_SYSTEM_PROMPT, QUERY_GENERATION_USER_PROMPT,
        },
    },
    providers::ai::AiProvider,
    types::{ConversationMessage, Discovery, SchemaSnapshot, ValueProfiles},
};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Everything the context builder needs for one request.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub schema: &'a SchemaSnapshot,
    pub discovery: &'a Discovery,
    pub value_profiles: &'a ValueProfiles,
    pub search_terms: &'a [String],
    pub known_attributes: &'a [String],
}

impl PromptContext<'_> {
    pub fn render(&self) -> String {
        build_context(
            self.schema,
            self.discovery,
            self.value_profiles,
            self.search_terms,
            self.known_attributes,
        )
    }
}

pub struct QueryGenerator<'a> {
    ai_provider: &'a dyn AiProvider,
    dialect: &'a str,
}

fn fenced_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"```(?:[A-Za-z0-9_+-]*[ \t]*\n)?([\s\S]*?)```").expect("fence regex is valid")
    })
}

/// Removes markdown code fences, with or without a language tag.
pub fn strip_code_fences(raw: &str) -> String {
    if let Some(inner) = fenced_block_regex()
        .captures(raw)
        .and_then(|caps| caps.get(1))
    {
        return inner.as_str().trim().to_string();
    }
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // An opening fence without a closing one: drop the tag line.
        text = rest
            .split_once('\n')
            .map(|(_, body)| body)
            .unwrap_or_else(|| rest.trim_start_matches(|c: char| c.is_alphanumeric()));
    }
    text.trim().trim_end_matches("```").trim().to_string()
}

impl<'a> QueryGenerator<'a> {
    pub fn new(ai_provider: &'a dyn AiProvider, dialect: &'a str) -> Self {
        Self {
            ai_provider,
            dialect,
        }
    }

    fn system_prompt(&self, context: &PromptContext<'_>) -> String {
        QUERY_GENERATION_SYSTEM_PROMPT
            .replace("{dialect}", self.dialect)
            .replace("{db_name}", &context.schema.database_name)
            .replace("{context}", &context.render())
    }

    fn final_instruction(&self) -> String {
        FINAL_INSTRUCTION.replace("{dialect}", self.dialect)
    }

    /// Produces a candidate statement for the question.
    pub async fn generate(
        &self,
        question: &str,
        context: &PromptContext<'_>,
        history: &[ConversationMessage],
    ) -> Result<String, PromptError> {
        let system_prompt = self.system_prompt(context);
        let user_prompt = QUERY_GENERATION_USER_PROMPT
            .replace("{question}", question)
            .replace("{final_instruction}", &self.final_instruction());
        self.send(&system_prompt, history, &user_prompt).await
    }

    /// Produces a replacement candidate after a zero-row result. The user
    /// turn is the evidence report instead of the original question.
    pub async fn generate_corrected(
        &self,
        evidence: &str,
        context: &PromptContext<'_>,
        history: &[ConversationMessage],
    ) -> Result<String, PromptError> {
        let system_prompt = format!(
            "{}\n\n{CORRECTION_SYSTEM_ADDENDUM}",
            self.system_prompt(context)
        );
        let user_prompt = CORRECTION_USER_PROMPT
            .replace("{evidence}", evidence)
            .replace("{final_instruction}", &self.final_instruction());
        self.send(&system_prompt, history, &user_prompt).await
    }

    async fn send(
        &self,
        system_prompt: &str,
        history: &[ConversationMessage],
        user_prompt: &str,
    ) -> Result<String, PromptError> {
        debug!(system_prompt = %system_prompt, user_prompt = %user_prompt, history = history.len(), "--> Sending prompts to AI Provider");
        let raw_response = self
            .ai_provider
            .generate(system_prompt, history, user_prompt)
            .await?;
        debug!("<-- Query from AI: {}", &raw_response);

        let candidate = strip_code_fences(&raw_response);
        info!(candidate = %candidate, "Candidate query generated.");
        Ok(candidate)
    }
}
