//! # Attribute Discovery
//!
//! Finds the sparse attributes a question is probably about. Search terms are
//! pulled out of the question with a short list of heuristics, matched
//! against attribute names in the side key-value tables, and the most
//! relevant attributes get their stored values profiled.

use crate::{
    constants::{
        AFFIRMATIVE_PATTERN, AFFIRMATIVE_VALUES, MAX_ATTRIBUTES_PER_TERM, MAX_FALLBACK_TERMS,
        MAX_VALUE_SAMPLES, META_SOURCES, STOP_WORDS,
    },
    errors::PromptError,
    providers::db::{sqlite::sql, storage::Storage},
    types::{value_to_string, DiscoveredAttribute, Discovery, SchemaSnapshot, ValueProfile, ValueSample},
};
use regex::Regex;
use serde_json::Value;
use std::{collections::BTreeSet, sync::OnceLock};
use tracing::{debug, info, warn};

fn double_quoted_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]+)""#).expect("quoted regex is valid"))
}

fn field_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:[A-Z][A-Z0-9_]{1,}|[A-Za-z0-9]+(?:_[A-Za-z0-9]+)+)\b")
            .expect("field token regex is valid")
    })
}

fn domain_shape_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:\w+_licen[cs]e|\w+_iar|licen[cs]e_\w+|iar_\w+)\b")
            .expect("domain shape regex is valid")
    })
}

/// Splits on anything that is not a letter or digit, underscores included.
fn word_pieces(question: &str) -> Vec<String> {
    question
        .split(|c: char| !c.is_alphanumeric())
        .filter(|p| !p.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn seed_terms(question: &str) -> Vec<String> {
    let mut terms = Vec::new();
    for piece in word_pieces(question) {
        match piece.as_str() {
            "iar" => terms.push("iar".to_string()),
            "license" | "licence" | "licenses" | "licences" => {
                terms.push("license".to_string());
                terms.push("licence".to_string());
            }
            _ => {}
        }
    }
    terms
}

/// Single-quoted phrases. An apostrophe with a letter or digit on both sides
/// (`what's`, `haven't`) is part of a word, not a quote mark.
fn single_quoted_phrases(question: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = question.char_indices().collect();
    let quote_marks: Vec<usize> = chars
        .iter()
        .enumerate()
        .filter(|(_, (_, c))| *c == '\'')
        .filter(|(i, _)| {
            let before = i.checked_sub(1).and_then(|j| chars.get(j));
            let after = chars.get(i + 1);
            let inside_word = matches!(
                (before, after),
                (Some((_, b)), Some((_, a))) if b.is_alphanumeric() && a.is_alphanumeric()
            );
            !inside_word
        })
        .map(|(_, (byte, _))| *byte)
        .collect();
    quote_marks
        .chunks_exact(2)
        .map(|pair| &question[pair[0] + 1..pair[1]])
        .filter(|phrase| !phrase.trim().is_empty())
        .collect()
}

fn quoted_terms(question: &str) -> Vec<String> {
    double_quoted_regex()
        .captures_iter(question)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .chain(single_quoted_phrases(question))
        .map(|phrase| phrase.trim().to_lowercase())
        .collect()
}

fn field_name_terms(question: &str) -> Vec<String> {
    field_token_regex()
        .find_iter(question)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

fn domain_shape_terms(question: &str) -> Vec<String> {
    domain_shape_regex()
        .find_iter(question)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

fn fallback_terms(question: &str) -> Vec<String> {
    word_pieces(question)
        .into_iter()
        .filter(|w| w.chars().count() > 3 && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Escapes `LIKE` wildcards so a term matches as a plain substring.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn dedupe(terms: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    terms
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

/// Pulls search terms out of a question. The first rule that yields
/// anything wins: seeded domain terms, quoted phrases, field-name-shaped
/// tokens, then domain field shapes. If none fire, words longer than three
/// characters that are not stop words are used, at most five of them.
pub fn extract_search_terms(question: &str) -> Vec<String> {
    let rules: [fn(&str) -> Vec<String>; 4] = [
        seed_terms,
        quoted_terms,
        field_name_terms,
        domain_shape_terms,
    ];
    for rule in rules {
        let terms = dedupe(rule(question));
        if !terms.is_empty() {
            debug!(?terms, "Search terms extracted.");
            return terms;
        }
    }
    let mut terms = dedupe(fallback_terms(question));
    terms.truncate(MAX_FALLBACK_TERMS);
    debug!(?terms, "Search terms from fallback words.");
    terms
}

/// Searches every side key-value table for attribute names containing each
/// term. Per term and table at most 20 names are kept, most frequent first;
/// an attribute already found by an earlier term keeps that term's entry.
pub async fn discover_attributes(
    storage: &dyn Storage,
    schema: &SchemaSnapshot,
    terms: &[String],
) -> Result<Discovery, PromptError> {
    let mut discovery = Discovery::new();

    for source in META_SOURCES {
        if schema.table(source).is_none() {
            debug!(source, "Side table not present; skipping discovery.");
            continue;
        }
        let query = sql::discover_meta_keys(&schema.prefixed(source), MAX_ATTRIBUTES_PER_TERM);
        let mut found: Vec<DiscoveredAttribute> = Vec::new();

        for term in terms {
            let rows = storage
                .execute_with_params(&query, vec![like_pattern(term)])
                .await?;
            for row in rows {
                let Some(key_name) = row.get("meta_key").map(value_to_string) else {
                    continue;
                };
                if found.iter().any(|a| a.key_name == key_name) {
                    continue;
                }
                found.push(DiscoveredAttribute {
                    key_name,
                    occurrence_count: row
                        .get("occurrences")
                        .and_then(Value::as_u64)
                        .unwrap_or(0),
                    matched_search_term: term.clone(),
                });
            }
        }

        found.sort_by(|a, b| b.occurrence_count.cmp(&a.occurrence_count));
        if !found.is_empty() {
            discovery.insert(source.to_string(), found);
        }
    }

    info!(
        terms = terms.len(),
        attributes = discovery.values().map(Vec::len).sum::<usize>(),
        "Attribute discovery finished."
    );
    Ok(discovery)
}

/// Samples the stored values of one attribute. Never fails: a missing
/// attribute or a storage error yields an empty profile with zero counts.
pub async fn profile_value(
    storage: &dyn Storage,
    schema: &SchemaSnapshot,
    key_name: &str,
    source: &str,
) -> ValueProfile {
    let mut profile = ValueProfile {
        key_name: key_name.to_string(),
        source_table: source.to_string(),
        ..Default::default()
    };
    if schema.table(source).is_none() {
        return profile;
    }
    let table = schema.prefixed(source);

    match storage
        .execute_with_params(
            &sql::sample_meta_values(&table, MAX_VALUE_SAMPLES),
            vec![key_name.to_string()],
        )
        .await
    {
        Ok(rows) => {
            profile.value_samples = rows
                .iter()
                .map(|row| {
                    let value = row.get("meta_value").map(value_to_string).unwrap_or_default();
                    ValueSample {
                        length: value.chars().count(),
                        count: row.get("occurrences").and_then(Value::as_u64).unwrap_or(0),
                        value,
                    }
                })
                .collect();
        }
        Err(e) => {
            warn!(key = %key_name, source, "Value sampling failed: {e}");
            return profile;
        }
    }

    match storage
        .execute_with_params(&sql::count_meta_rows(&table), vec![key_name.to_string()])
        .await
    {
        Ok(rows) => {
            if let Some(row) = rows.first() {
                profile.total_row_count = row.get("total_rows").and_then(Value::as_u64).unwrap_or(0);
                profile.non_empty_row_count = row
                    .get("non_empty_rows")
                    .and_then(Value::as_u64)
                    .unwrap_or(0)
                    .min(profile.total_row_count);
            }
        }
        Err(e) => warn!(key = %key_name, source, "Row counting failed: {e}"),
    }

    let affirmative: Vec<String> = profile
        .value_samples
        .iter()
        .filter(|s| {
            AFFIRMATIVE_VALUES
                .iter()
                .any(|a| s.value.trim().eq_ignore_ascii_case(a))
        })
        .map(|s| s.value.clone())
        .collect();
    if !affirmative.is_empty() {
        profile
            .detected_patterns
            .insert(AFFIRMATIVE_PATTERN.to_string(), affirmative);
    }

    debug!(
        key = %key_name,
        samples = profile.value_samples.len(),
        total = profile.total_row_count,
        "Value profile built."
    );
    profile
}

/// Lists known attribute names of a side table, most frequent first. Used
/// as raw material when nothing matched the question.
pub async fn list_known_attributes(
    storage: &dyn Storage,
    schema: &SchemaSnapshot,
    source: &str,
    limit: usize,
) -> Result<Vec<String>, PromptError> {
    if schema.table(source).is_none() {
        return Ok(Vec::new());
    }
    let rows = storage
        .execute_query(&sql::list_meta_keys(&schema.prefixed(source), limit))
        .await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.get("meta_key").map(value_to_string))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{extract_search_terms, like_pattern};

    #[test]
    fn seeds_domain_terms_from_compound_field() {
        let terms = extract_search_terms("Show me users with the IAR_license field checked");
        assert!(terms.contains(&"iar".to_string()));
        assert!(terms.contains(&"license".to_string()));
    }

    #[test]
    fn quoted_phrases_are_lowercased() {
        let terms = extract_search_terms("users whose 'Billing Country' is set");
        assert_eq!(terms, vec!["billing country"]);
    }

    #[test]
    fn contractions_are_not_quotes() {
        let terms = extract_search_terms("What's the number of customers who haven't logged in?");
        assert_eq!(terms, vec!["customers", "haven", "logged"]);
    }

    #[test]
    fn quoted_phrase_after_contraction() {
        let terms = extract_search_terms("What's stored in 'Billing Country' for them?");
        assert_eq!(terms, vec!["billing country"]);
    }

    #[test]
    fn field_shaped_tokens() {
        let terms = extract_search_terms("list users with first_name and NICKNAME");
        assert_eq!(terms, vec!["first_name", "nickname"]);
    }

    #[test]
    fn fallback_skips_stop_words_and_caps_count() {
        let terms = extract_search_terms(
            "which members joined during summer holidays through membership programs before",
        );
        assert_eq!(
            terms,
            vec!["members", "joined", "during", "summer", "holidays"]
        );
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("First_Name"), r"%first\_name%");
        assert_eq!(like_pattern("50%"), r"%50\%%");
    }

    #[test]
    fn plain_count_question_has_no_terms() {
        assert!(extract_search_terms("How many users are registered?").is_empty());
    }
}
