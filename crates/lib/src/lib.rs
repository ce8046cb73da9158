//! # Ask DB
//!
//! Turns natural-language questions into read-only SQL against a
//! WordPress-style database. Attribute names and stored values are
//! discovered from the key-value side tables before generation, every
//! candidate passes a lexical security gate, and a query that returns no
//! rows gets one evidence-driven correction attempt.

pub mod constants;
pub mod discovery;
pub mod errors;
pub mod executor;
pub mod export;
pub mod generator;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod schema;
pub mod troubleshoot;
pub mod types;
pub mod validator;

pub use errors::{PromptError, Rejection};
pub use pipeline::{AskPipeline, AskPipelineBuilder};
pub use types::{ChatOutcome, ChatRequest, ConversationMessage, Role};
pub use validator::{LexicalValidator, QueryValidator, ValidatedQuery};
