//! # Ask Pipeline
//!
//! Sequences one question end to end: schema inspection, attribute
//! discovery, generation, validation, execution and, when the first query
//! succeeds with zero rows, a single evidence-driven correction attempt.

use crate::{
    constants::{
        DEFAULT_TABLE_PREFIX, MAX_FALLBACK_ATTRIBUTES, POST_META_SOURCE, PROFILED_POST_ATTRIBUTES,
        PROFILED_USER_ATTRIBUTES, USER_META_SOURCE,
    },
    discovery::{discover_attributes, extract_search_terms, list_known_attributes, profile_value},
    errors::PromptError,
    executor,
    generator::{PromptContext, QueryGenerator},
    providers::{ai::AiProvider, db::storage::Storage},
    schema,
    troubleshoot::{build_debug_report, render_evidence},
    types::{
        profile_key, ChatOutcome, ChatRequest, DebugReport, DiscoveryTrace, Row, SchemaSnapshot,
        ValueProfiles,
    },
    validator::{LexicalValidator, QueryValidator, ValidatedQuery},
};
use std::fmt;
use tracing::{info, warn};

/// Holds the collaborators for answering questions. Cheap to build per
/// request; carries no state between calls to `ask`.
pub struct AskPipeline {
    pub(crate) ai_provider: Box<dyn AiProvider>,
    pub(crate) storage: Box<dyn Storage>,
    pub(crate) validator: Box<dyn QueryValidator>,
    pub(crate) table_prefix: String,
}

impl fmt::Debug for AskPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AskPipeline")
            .field("ai_provider", &self.ai_provider)
            .field("storage", &self.storage)
            .field("validator", &self.validator)
            .field("table_prefix", &self.table_prefix)
            .finish()
    }
}

/// A builder for creating `AskPipeline` instances.
#[derive(Default)]
pub struct AskPipelineBuilder {
    ai_provider: Option<Box<dyn AiProvider>>,
    storage: Option<Box<dyn Storage>>,
    validator: Option<Box<dyn QueryValidator>>,
    table_prefix: Option<String>,
}

impl AskPipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the completion client.
    pub fn ai_provider(mut self, ai_provider: Box<dyn AiProvider>) -> Self {
        self.ai_provider = Some(ai_provider);
        self
    }

    /// Sets the database the questions are about.
    pub fn storage_provider(mut self, storage: Box<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Replaces the default `LexicalValidator`.
    pub fn validator(mut self, validator: Box<dyn QueryValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Sets the table-name prefix (defaults to `wp_`).
    pub fn table_prefix(mut self, table_prefix: impl Into<String>) -> Self {
        self.table_prefix = Some(table_prefix.into());
        self
    }

    pub fn build(self) -> Result<AskPipeline, PromptError> {
        Ok(AskPipeline {
            ai_provider: self.ai_provider.ok_or(PromptError::MissingAiProvider)?,
            storage: self.storage.ok_or(PromptError::MissingStorageProvider)?,
            validator: self
                .validator
                .unwrap_or_else(|| Box::new(LexicalValidator::new())),
            table_prefix: self
                .table_prefix
                .unwrap_or_else(|| DEFAULT_TABLE_PREFIX.to_string()),
        })
    }
}

impl AskPipeline {
    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn validator(&self) -> &dyn QueryValidator {
        self.validator.as_ref()
    }

    /// Inspects the connected database.
    pub async fn inspect_schema(&self) -> Result<SchemaSnapshot, PromptError> {
        schema::inspect(self.storage(), &self.table_prefix).await
    }

    fn validate(&self, candidate: &str) -> Result<ValidatedQuery, PromptError> {
        self.validator.validate(candidate).map_err(|rejection| {
            warn!(candidate = %candidate, reason = %rejection, "Candidate query rejected.");
            PromptError::ValidationRejected(rejection)
        })
    }

    /// Answers one question.
    ///
    /// Errors from generation, validation and the first execution are
    /// returned as-is. A zero-row result is not an error: it triggers at most
    /// one correction attempt, whose query replaces the first one only when
    /// it runs successfully and returns rows.
    pub async fn ask(&self, request: &ChatRequest) -> Result<ChatOutcome, PromptError> {
        info!(question = %request.message, history = request.history.len(), "[ask] Received question.");
        let storage = self.storage();

        let schema = self.inspect_schema().await?;
        let search_terms = extract_search_terms(&request.message);
        let discovery = discover_attributes(storage, &schema, &search_terms).await?;

        let mut value_profiles = ValueProfiles::new();
        for (source, limit) in [
            (USER_META_SOURCE, PROFILED_USER_ATTRIBUTES),
            (POST_META_SOURCE, PROFILED_POST_ATTRIBUTES),
        ] {
            for attribute in discovery.get(source).into_iter().flatten().take(limit) {
                let key = profile_key(source, &attribute.key_name);
                if value_profiles.contains_key(&key) {
                    continue;
                }
                let profile = profile_value(storage, &schema, &attribute.key_name, source).await;
                value_profiles.insert(key, profile);
            }
        }

        let known_attributes = if discovery.is_empty() {
            list_known_attributes(storage, &schema, USER_META_SOURCE, MAX_FALLBACK_ATTRIBUTES)
                .await?
        } else {
            Vec::new()
        };

        let generator = QueryGenerator::new(self.ai_provider.as_ref(), storage.dialect());
        let context = PromptContext {
            schema: &schema,
            discovery: &discovery,
            value_profiles: &value_profiles,
            search_terms: &search_terms,
            known_attributes: &known_attributes,
        };
        let candidate = generator
            .generate(&request.message, &context, &request.history)
            .await?;
        let validated = self.validate(&candidate)?;
        let rows = executor::execute(storage, &validated).await?;

        if !rows.is_empty() {
            info!(rows = rows.len(), "[ask] Answered on the first attempt.");
            return Ok(ChatOutcome {
                sql_query: validated.to_string(),
                rows,
                discovery_trace: DiscoveryTrace {
                    search_terms,
                    discovered_attributes: discovery,
                    value_samples: value_profiles,
                },
                debug_report: None,
            });
        }

        warn!(query = %validated, "[ask] Query returned zero rows; troubleshooting.");
        let mut report = build_debug_report(
            storage,
            &schema,
            validated.as_str(),
            &discovery,
            &mut value_profiles,
        )
        .await;

        let mut outcome = ChatOutcome {
            sql_query: validated.to_string(),
            rows,
            ..Default::default()
        };

        if report.suggestions.is_empty() {
            info!("[ask] No suggestions found; skipping correction.");
        } else {
            let context = PromptContext {
                schema: &schema,
                discovery: &discovery,
                value_profiles: &value_profiles,
                search_terms: &search_terms,
                known_attributes: &known_attributes,
            };
            if let Some((query, rows)) = self
                .attempt_correction(&generator, &context, request, &mut report)
                .await?
            {
                outcome.sql_query = query.to_string();
                outcome.rows = rows;
                report.corrected = true;
            }
        }

        outcome.debug_report = Some(report);
        outcome.discovery_trace = DiscoveryTrace {
            search_terms,
            discovered_attributes: discovery,
            value_samples: value_profiles,
        };
        Ok(outcome)
    }

    /// Runs the single correction pass. A rejected corrected query is fatal;
    /// generation and execution failures are recorded in the report and the
    /// first result is kept.
    async fn attempt_correction(
        &self,
        generator: &QueryGenerator<'_>,
        context: &PromptContext<'_>,
        request: &ChatRequest,
        report: &mut DebugReport,
    ) -> Result<Option<(ValidatedQuery, Vec<Row>)>, PromptError> {
        let evidence = render_evidence(report);
        info!("[ask] Requesting a corrected query.");

        let candidate = match generator
            .generate_corrected(&evidence, context, &request.history)
            .await
        {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!("[ask] Corrected generation failed: {e}");
                report.issues.push(format!("Correction attempt failed: {e}"));
                return Ok(None);
            }
        };

        let validated = self.validate(&candidate)?;

        match executor::execute(self.storage(), &validated).await {
            Ok(rows) if !rows.is_empty() => {
                info!(rows = rows.len(), query = %validated, "[ask] Corrected query returned rows.");
                Ok(Some((validated, rows)))
            }
            Ok(_) => {
                warn!(query = %validated, "[ask] Corrected query also returned zero rows.");
                report
                    .issues
                    .push(format!("Corrected query also returned zero rows: {validated}"));
                Ok(None)
            }
            Err(e) => {
                warn!("[ask] Corrected query failed: {e}");
                report
                    .issues
                    .push(format!("Corrected query failed to execute: {e}"));
                Ok(None)
            }
        }
    }
}
