use thiserror::Error;

/// The reason a candidate query was refused by the security gate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("The query is empty after comments were removed.")]
    Empty,
    #[error("Only SELECT statements are allowed, but the query starts with `{found}`.")]
    NotSelect { found: String },
    #[error("The query contains the forbidden keyword `{0}`.")]
    ForbiddenKeyword(String),
    #[error("The query contains {0} statements; only a single statement is allowed.")]
    MultipleStatements(usize),
    #[error("The query uses the forbidden function or clause `{0}`.")]
    DangerousFunction(String),
}

/// Custom error types for the application.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("No API key is configured for the AI provider")]
    MissingApiKey,
    #[error("AI provider is not configured")]
    MissingAiProvider,
    #[error("Storage provider is not configured")]
    MissingStorageProvider,
    #[error("Unsupported AI provider type: {0}")]
    UnsupportedProvider(String),
    #[error("Failed to send request to AI provider: {0}")]
    AiRequest(reqwest::Error),
    #[error("AI provider returned status {status}: {body}")]
    AiApi { status: u16, body: String },
    #[error("AI provider response is malformed: {0}")]
    MalformedResponse(String),
    #[error("Query rejected by the security validator: {0}")]
    ValidationRejected(Rejection),
    #[error("Storage connection error: {0}")]
    StorageConnection(String),
    #[error("Database error: {0}")]
    StorageOperationFailed(String),
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),
    #[error("CSV export error: {0}")]
    Csv(String),
}

impl PromptError {
    /// A stable category name for the error, matching the failure taxonomy
    /// reported to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            PromptError::MissingApiKey
            | PromptError::MissingAiProvider
            | PromptError::MissingStorageProvider
            | PromptError::UnsupportedProvider(_)
            | PromptError::ReqwestClientBuild(_) => "configuration",
            PromptError::AiRequest(_)
            | PromptError::AiApi { .. }
            | PromptError::MalformedResponse(_) => "upstream_generation",
            PromptError::ValidationRejected(_) => "validation_rejected",
            PromptError::StorageOperationFailed(_) => "execution",
            PromptError::StorageConnection(_) => "connectivity",
            PromptError::Regex(_) | PromptError::JsonSerialization(_) | PromptError::Csv(_) => {
                "internal"
            }
        }
    }
}

impl From<Rejection> for PromptError {
    fn from(rejection: Rejection) -> Self {
        PromptError::ValidationRejected(rejection)
    }
}

impl From<csv::Error> for PromptError {
    fn from(err: csv::Error) -> Self {
        PromptError::Csv(err.to_string())
    }
}
