use anyhow::Result;
use askdb::errors::PromptError;
use askdb::providers::{ai::AiProvider, db::sqlite::SqliteProvider};
use askdb::types::ConversationMessage;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Number of rows in the fixture's `wp_users` table.
pub const FIXTURE_USER_COUNT: usize = 150;
/// Users `1..=FIXTURE_LICENSED_USERS` have `iar_license_status = 'on'`.
pub const FIXTURE_LICENSED_USERS: usize = 40;

// --- Test Setup ---

/// A WordPress-shaped in-memory database shared by the lib and server tests.
pub struct TestSetup {
    pub provider: SqliteProvider,
}

impl TestSetup {
    /// Creates a new, isolated in-memory database seeded with the fixture.
    pub async fn new() -> Result<Self> {
        let provider = SqliteProvider::new(":memory:").await?;
        provider.initialize_with_data(&fixture_sql()).await?;
        Ok(Self { provider })
    }
}

/// The fixture as a `;`-separated script.
pub fn fixture_sql() -> String {
    let mut sql = String::from(
        "CREATE TABLE wp_users (ID INTEGER PRIMARY KEY, user_login TEXT NOT NULL, user_email TEXT NOT NULL, user_registered TEXT, display_name TEXT);
        CREATE TABLE wp_usermeta (umeta_id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL DEFAULT 0, meta_key TEXT, meta_value TEXT);
        CREATE INDEX usermeta_user_id ON wp_usermeta (user_id);
        CREATE INDEX usermeta_meta_key ON wp_usermeta (meta_key);
        CREATE TABLE wp_posts (ID INTEGER PRIMARY KEY, post_author INTEGER NOT NULL DEFAULT 0, post_title TEXT, post_status TEXT DEFAULT 'publish', post_type TEXT DEFAULT 'post');
        CREATE TABLE wp_postmeta (meta_id INTEGER PRIMARY KEY, post_id INTEGER NOT NULL DEFAULT 0, meta_key TEXT, meta_value TEXT);
        CREATE INDEX postmeta_post_id ON wp_postmeta (post_id);
        CREATE TABLE wp_comments (comment_ID INTEGER PRIMARY KEY, comment_post_ID INTEGER NOT NULL, user_id INTEGER, comment_content TEXT);
        CREATE TABLE wp_options (option_id INTEGER PRIMARY KEY, option_name TEXT NOT NULL, option_value TEXT);
        CREATE UNIQUE INDEX option_name ON wp_options (option_name);
        CREATE TABLE wp_course_enrollments (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL, course_name TEXT NOT NULL);
        ",
    );

    for id in 1..=FIXTURE_USER_COUNT {
        sql.push_str(&format!(
            "INSERT INTO wp_users (ID, user_login, user_email, user_registered, display_name) VALUES ({id}, 'user{id}', 'user{id}@example.com', '2024-01-01 00:00:00', 'User {id}');\n"
        ));
        sql.push_str(&format!(
            "INSERT INTO wp_usermeta (user_id, meta_key, meta_value) VALUES ({id}, 'first_name', 'First{id}');\n"
        ));
        if id <= FIXTURE_LICENSED_USERS {
            sql.push_str(&format!(
                "INSERT INTO wp_usermeta (user_id, meta_key, meta_value) VALUES ({id}, 'iar_license_status', 'on');\n"
            ));
        } else if id <= FIXTURE_LICENSED_USERS + 20 {
            sql.push_str(&format!(
                "INSERT INTO wp_usermeta (user_id, meta_key, meta_value) VALUES ({id}, 'iar_license_status', '');\n"
            ));
        }
        if id % 10 == 0 {
            sql.push_str(&format!(
                "INSERT INTO wp_usermeta (user_id, meta_key, meta_value) VALUES ({id}, 'billing_country', '{}');\n",
                if id % 20 == 0 { "JP" } else { "TH" }
            ));
        }
    }

    for id in 1..=10 {
        let author = id;
        sql.push_str(&format!(
            "INSERT INTO wp_posts (ID, post_author, post_title) VALUES ({id}, {author}, 'Post {id}');\n"
        ));
        sql.push_str(&format!(
            "INSERT INTO wp_postmeta (post_id, meta_key, meta_value) VALUES ({id}, 'license_type', '{}');\n",
            if id % 2 == 0 { "gpl" } else { "mit" }
        ));
        sql.push_str(&format!(
            "INSERT INTO wp_comments (comment_post_ID, user_id, comment_content) VALUES ({id}, {author}, 'Nice post');\n"
        ));
    }

    sql.push_str(
        "INSERT INTO wp_options (option_name, option_value) VALUES ('siteurl', 'https://example.com');
        INSERT INTO wp_course_enrollments (user_id, course_name) VALUES (1, 'Safety 101');
        INSERT INTO wp_course_enrollments (user_id, course_name) VALUES (2, 'Safety 101');
        ",
    );
    sql
}

// --- Mock AI Provider ---

/// One recorded call: the system prompt, the history length and the user prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedCall {
    pub system_prompt: String,
    pub history: Vec<ConversationMessage>,
    pub user_prompt: String,
}

/// Returns scripted responses in order and records every call.
#[derive(Clone, Debug, Default)]
pub struct MockAiProvider {
    responses: Arc<Mutex<VecDeque<Result<String, PromptError>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockAiProvider {
    pub fn new(responses: Vec<&str>) -> Self {
        let provider = Self::default();
        for response in responses {
            provider.push_response(response);
        }
        provider
    }

    /// Queues a successful completion.
    pub fn push_response(&self, response: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(response.to_string()));
    }

    /// Queues a failed completion.
    pub fn push_error(&self, error: PromptError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Retrieves the recorded calls for assertion.
    pub fn get_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[ConversationMessage],
        user_prompt: &str,
    ) -> Result<String, PromptError> {
        self.calls.lock().unwrap().push(RecordedCall {
            system_prompt: system_prompt.to_string(),
            history: history.to_vec(),
            user_prompt: user_prompt.to_string(),
        });

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(PromptError::MalformedResponse(
                    "MockAiProvider: no response programmed".to_string(),
                ))
            })
    }
}
