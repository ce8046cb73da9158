//! # Shared Constants
//!
//! Fixed vocabularies and limits used across the pipeline. Keeping them in one
//! place avoids "magic strings" drifting apart between the stages that share them.

/// The default path for the application database.
pub const DEFAULT_DB_FILE: &str = "db/askdb.db";

/// The default table-name prefix of the platform schema.
pub const DEFAULT_TABLE_PREFIX: &str = "wp_";

/// Well-known platform tables (without prefix). Anything else is "custom".
pub const CORE_TABLE_NAMES: &[&str] = &[
    "users",
    "usermeta",
    "posts",
    "postmeta",
    "comments",
    "commentmeta",
    "terms",
    "termmeta",
    "term_taxonomy",
    "term_relationships",
    "options",
    "links",
];

/// Core tables whose full column list is emitted into the generation context.
pub const CONTEXT_CORE_TABLES: &[&str] = &["users", "usermeta", "posts", "postmeta"];

/// Side key-value tables searched by attribute discovery, primary source first.
pub const USER_META_SOURCE: &str = "usermeta";
pub const POST_META_SOURCE: &str = "postmeta";
pub const META_SOURCES: &[&str] = &[USER_META_SOURCE, POST_META_SOURCE];

/// Values treated as the "checked" state of a boolean-like attribute.
pub const AFFIRMATIVE_VALUES: &[&str] = &["1", "yes", "true", "checked", "on", "active"];

/// Pattern name under which affirmative encodings are reported.
pub const AFFIRMATIVE_PATTERN: &str = "affirmative_encoding";


/// Words ignored by the fallback term extractor.
pub const STOP_WORDS: &[&str] = &[
    "show", "find", "list", "give", "with", "that", "have", "from", "which", "what", "where",
    "when", "many", "much", "users", "user", "does", "there", "their", "this", "those", "these",
    "were", "into", "about", "some", "every", "field", "fields", "value", "values", "checked",
    "please", "registered", "count", "number", "total", "whose", "all",
];

/// Statement keywords that can mutate state or escalate privileges.
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "TRUNCATE", "REPLACE", "GRANT",
    "REVOKE", "EXEC", "EXECUTE", "CALL", "LOCK", "UNLOCK",
];

/// Functions and clauses that touch the filesystem or stall the server.
pub const DANGEROUS_FUNCTIONS: &[&str] = &[
    "LOAD_FILE",
    "INTO OUTFILE",
    "INTO DUMPFILE",
    "BENCHMARK",
    "SLEEP",
];

pub const MAX_SAMPLE_COLUMNS: usize = 10;
pub const MAX_SAMPLE_VALUE_CHARS: usize = 100;
pub const MAX_ATTRIBUTES_PER_TERM: usize = 20;
pub const MAX_VALUE_SAMPLES: usize = 20;
pub const MAX_CONTEXT_VALUE_SAMPLES: usize = 10;
pub const MAX_SECONDARY_ATTRIBUTES: usize = 10;
pub const MAX_FALLBACK_ATTRIBUTES: usize = 100;
pub const MAX_FALLBACK_TERMS: usize = 5;
pub const MAX_SUGGESTED_ATTRIBUTES: usize = 10;
pub const PROFILED_USER_ATTRIBUTES: usize = 5;
pub const PROFILED_POST_ATTRIBUTES: usize = 3;
