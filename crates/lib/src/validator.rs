//! # Security Validator
//!
//! A deterministic lexical gate every candidate must pass before execution.
//! It is deliberately not a SQL parser: it works on the comment-stripped,
//! upper-cased text and refuses anything that is not a single `SELECT`.
//!
//! Known gap: encoded or assembled keywords (hex literals, `CHAR(...)`
//! concatenation) and non-`;` statement separators are not detected.

use crate::{
    constants::{DANGEROUS_FUNCTIONS, FORBIDDEN_KEYWORDS},
    errors::Rejection,
};
use regex::Regex;
use std::{fmt::Debug, sync::OnceLock};

/// A statement that passed validation. Only validators can build one, so the
/// executor cannot be handed an unchecked string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery(String);

impl ValidatedQuery {
    /// The comment-stripped statement, with its original casing.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ValidatedQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The seam behind which the lexical gate could be replaced by a parser-based one.
pub trait QueryValidator: Send + Sync + Debug {
    fn validate(&self, candidate: &str) -> Result<ValidatedQuery, Rejection>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalValidator;

fn comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/|--[^\n]*").expect("comment regex is valid"))
}

fn forbidden_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alternation = FORBIDDEN_KEYWORDS.join("|");
        Regex::new(&format!(r"\b({alternation})\b")).expect("keyword regex is valid")
    })
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex is valid"))
}

/// Removes `--` line comments and `/* */` block comments. An unterminated
/// block comment is left in place so the leading-token rule rejects it.
pub fn strip_comments(sql: &str) -> String {
    comment_regex().replace_all(sql, " ").into_owned()
}

/// Comment-stripped, upper-cased text with whitespace runs collapsed.
pub fn normalize(sql: &str) -> String {
    whitespace_regex()
        .replace_all(&strip_comments(sql).to_uppercase(), " ")
        .trim()
        .to_string()
}

/// Returns the first token: a run of identifier characters, or else the
/// single leading symbol (so `(SELECT ...)` yields `(`).
fn leading_token(normalized: &str) -> Option<String> {
    let trimmed = normalized.trim_start();
    let first = trimmed.chars().next()?;
    if first.is_alphanumeric() || first == '_' {
        Some(
            trimmed
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect(),
        )
    } else {
        Some(first.to_string())
    }
}

impl LexicalValidator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluates every rule and returns all violations in rule order. The
    /// verdict of `validate` is the first entry of this list.
    pub fn violations(&self, candidate: &str) -> Vec<Rejection> {
        let normalized = normalize(candidate);
        let mut violations = Vec::new();

        match leading_token(&normalized) {
            None => {
                violations.push(Rejection::Empty);
                return violations;
            }
            Some(token) if token != "SELECT" => {
                violations.push(Rejection::NotSelect { found: token })
            }
            Some(_) => {}
        }

        if let Some(m) = forbidden_regex().find(&normalized) {
            violations.push(Rejection::ForbiddenKeyword(m.as_str().to_string()));
        }

        let segments: Vec<&str> = normalized.split(';').collect();
        let statements = segments.iter().filter(|s| !s.trim().is_empty()).count();
        if segments.len() > 2 || statements > 1 {
            violations.push(Rejection::MultipleStatements(statements.max(segments.len() - 1)));
        }

        if let Some(function) = DANGEROUS_FUNCTIONS
            .iter()
            .find(|function| normalized.contains(*function))
        {
            violations.push(Rejection::DangerousFunction(function.to_string()));
        }

        violations
    }
}

impl QueryValidator for LexicalValidator {
    fn validate(&self, candidate: &str) -> Result<ValidatedQuery, Rejection> {
        match self.violations(candidate).into_iter().next() {
            Some(rejection) => Err(rejection),
            None => Ok(ValidatedQuery(strip_comments(candidate).trim().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(sql: &str) -> Result<ValidatedQuery, Rejection> {
        LexicalValidator::new().validate(sql)
    }

    #[test]
    fn accepts_plain_select() {
        assert!(check("SELECT COUNT(*) FROM wp_users").is_ok());
        assert!(check("  select id from wp_posts;").is_ok());
    }

    #[test]
    fn keyword_inside_identifier_is_not_a_keyword() {
        assert!(check("SELECT created_at FROM posts").is_ok());
        assert!(check("SELECT updated_by, deleted_flag FROM posts").is_ok());
    }

    #[test]
    fn leading_token_is_checked_before_keywords() {
        assert_eq!(
            check("UPDATE users SET user_email='x'"),
            Err(Rejection::NotSelect {
                found: "UPDATE".to_string()
            })
        );
    }

    #[test]
    fn parenthesized_select_is_rejected() {
        assert_eq!(
            check("(SELECT 1)"),
            Err(Rejection::NotSelect {
                found: "(".to_string()
            })
        );
    }

    #[test]
    fn comments_cannot_hide_a_second_statement() {
        let violations =
            LexicalValidator::new().violations("SELECT 1 /* ; */; DROP TABLE wp_users; -- ok");
        assert!(violations.contains(&Rejection::ForbiddenKeyword("DROP".to_string())));
        assert!(violations
            .iter()
            .any(|v| matches!(v, Rejection::MultipleStatements(_))));
    }

    #[test]
    fn leading_comment_is_stripped_first() {
        let validated = check("-- count users\nSELECT COUNT(*) FROM wp_users").unwrap();
        assert_eq!(validated.as_str(), "SELECT COUNT(*) FROM wp_users");
    }

    #[test]
    fn unterminated_comment_is_rejected() {
        assert!(matches!(
            check("/* SELECT 1"),
            Err(Rejection::NotSelect { .. })
        ));
    }

    #[test]
    fn only_whitespace_is_empty() {
        assert_eq!(check("  -- nothing\n "), Err(Rejection::Empty));
    }

    #[test]
    fn two_selects_are_rejected() {
        assert!(matches!(
            check("SELECT 1; SELECT 2"),
            Err(Rejection::MultipleStatements(2))
        ));
    }

    #[test]
    fn dangerous_functions_are_rejected_case_insensitively() {
        assert_eq!(
            check("SELECT sleep(5)"),
            Err(Rejection::DangerousFunction("SLEEP".to_string()))
        );
        assert_eq!(
            check("SELECT * FROM wp_users INTO   outfile '/tmp/x'"),
            Err(Rejection::DangerousFunction("INTO OUTFILE".to_string()))
        );
    }

    #[test]
    fn verdict_is_idempotent() {
        for sql in [
            "SELECT 1",
            "DELETE FROM wp_users",
            "SELECT * FROM posts; DROP TABLE posts;",
        ] {
            assert_eq!(check(sql), check(sql));
        }
    }
}
