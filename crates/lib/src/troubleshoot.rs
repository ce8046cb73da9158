//! # Zero-Result Troubleshooting
//!
//! When a query succeeds but returns nothing, the attribute conditions it
//! used are checked against what discovery actually found in the data. The
//! resulting `DebugReport` is the evidence handed to the correction attempt.

use crate::{
    constants::{MAX_SUGGESTED_ATTRIBUTES, META_SOURCES},
    discovery::profile_value,
    providers::db::storage::Storage,
    types::{profile_key, DebugReport, Discovery, SchemaSnapshot, ValueProfiles},
};
use regex::Regex;
use std::{fmt::Write, sync::OnceLock};
use tracing::{debug, info};

/// Number of stored values quoted back when a literal does not match.
const MAX_REPORTED_VALUES: usize = 5;

/// One `meta_key = '...'` condition and the `meta_value = '...'` paired
/// with it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeCondition {
    pub key: String,
    pub value: Option<String>,
}

fn meta_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)(?:\b\w+\.)?\bmeta_key\s*=\s*(?:'([^']*)'|"([^"]*)")"#)
            .expect("meta_key regex is valid")
    })
}

fn meta_value_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)(?:\b\w+\.)?\bmeta_value\s*=\s*(?:'([^']*)'|"([^"]*)")"#)
            .expect("meta_value regex is valid")
    })
}

fn literal(caps: &regex::Captures<'_>) -> Option<String> {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Extracts attribute conditions from a query's text. Each key is paired
/// with the first value condition between it and the next key; a key left
/// without one takes the nearest unpaired value between the previous key
/// and itself (`meta_value = '1' AND meta_key = 'x'`).
pub fn extract_conditions(query: &str) -> Vec<AttributeCondition> {
    let keys: Vec<(usize, String)> = meta_key_regex()
        .captures_iter(query)
        .filter_map(|caps| Some((caps.get(0)?.start(), literal(&caps)?)))
        .collect();
    let values: Vec<(usize, String)> = meta_value_regex()
        .captures_iter(query)
        .filter_map(|caps| Some((caps.get(0)?.start(), literal(&caps)?)))
        .collect();

    let mut claimed = vec![false; values.len()];
    let mut paired: Vec<Option<usize>> = vec![None; keys.len()];

    for (i, (start, _)) in keys.iter().enumerate() {
        let end = keys.get(i + 1).map(|(next, _)| *next).unwrap_or(usize::MAX);
        if let Some(v) = values
            .iter()
            .position(|(pos, _)| pos > start && *pos < end)
            .filter(|v| !claimed[*v])
        {
            claimed[v] = true;
            paired[i] = Some(v);
        }
    }
    for (i, (start, _)) in keys.iter().enumerate() {
        if paired[i].is_some() {
            continue;
        }
        let begin = i.checked_sub(1).map(|prev| keys[prev].0).unwrap_or(0);
        if let Some(v) = values
            .iter()
            .enumerate()
            .rev()
            .find(|(v, (pos, _))| !claimed[*v] && *pos >= begin && pos < start)
            .map(|(v, _)| v)
        {
            claimed[v] = true;
            paired[i] = Some(v);
        }
    }

    keys.into_iter()
        .zip(paired)
        .map(|((_, key), value)| AttributeCondition {
            key,
            value: value.map(|v| values[v].1.clone()),
        })
        .collect()
}

/// Finds a discovered attribute by name, ignoring case. Returns its source
/// and exact spelling. Sources in `referenced` are searched first.
fn find_attribute<'d>(
    discovery: &'d Discovery,
    key: &str,
    referenced: &[&str],
) -> Option<(&'d str, &'d str)> {
    let mut sources: Vec<(&String, _)> = discovery.iter().collect();
    sources.sort_by_key(|(source, _)| !referenced.contains(&source.as_str()));
    sources.into_iter().find_map(|(source, attributes)| {
        attributes
            .iter()
            .find(|a| a.key_name.eq_ignore_ascii_case(key))
            .map(|a| (source.as_str(), a.key_name.as_str()))
    })
}

/// Discovered attributes whose names contain, or are contained in, `key`.
fn similar_attributes<'d>(discovery: &'d Discovery, key: &str) -> Vec<(&'d str, &'d str)> {
    let needle = key.to_lowercase();
    discovery
        .iter()
        .flat_map(|(source, attributes)| {
            attributes.iter().map(move |a| (source.as_str(), a.key_name.as_str()))
        })
        .filter(|(_, name)| {
            let name = name.to_lowercase();
            name.contains(&needle) || needle.contains(&name)
        })
        .collect()
}

fn quote_all<'v>(values: impl Iterator<Item = &'v str>) -> String {
    values
        .map(|v| format!("'{v}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builds the evidence report for a query that returned zero rows.
///
/// Attributes referenced by the query but not yet profiled are profiled
/// here and added to `value_profiles`.
pub async fn build_debug_report(
    storage: &dyn Storage,
    schema: &SchemaSnapshot,
    query: &str,
    discovery: &Discovery,
    value_profiles: &mut ValueProfiles,
) -> DebugReport {
    let mut report = DebugReport {
        query: query.to_string(),
        ..Default::default()
    };

    let lowered = query.to_lowercase();
    let referenced: Vec<&str> = META_SOURCES
        .iter()
        .copied()
        .filter(|source| lowered.contains(&schema.prefixed(source).to_lowercase()))
        .collect();

    let conditions = extract_conditions(query);
    debug!(?conditions, "Attribute conditions extracted from failed query.");
    if conditions.is_empty() {
        report
            .issues
            .push("The query filters on no attribute names that could be checked against the data.".to_string());
    }

    for condition in conditions {
        let effective = match find_attribute(discovery, &condition.key, &referenced) {
            Some(found) => Some(found),
            None => {
                report.issues.push(format!(
                    "Attribute `{}` does not exist in the data.",
                    condition.key
                ));
                let similar = similar_attributes(discovery, &condition.key);
                if similar.is_empty() {
                    let available: Vec<&str> = discovery
                        .values()
                        .flatten()
                        .take(MAX_SUGGESTED_ATTRIBUTES)
                        .map(|a| a.key_name.as_str())
                        .collect();
                    if !available.is_empty() {
                        report.suggestions.push(format!(
                            "Available attributes are: {}.",
                            available.join(", ")
                        ));
                    }
                } else {
                    let names: Vec<&str> = similar.iter().map(|(_, name)| *name).collect();
                    report.suggestions.push(format!(
                        "Use meta_key = '{}' instead of '{}'{}.",
                        names[0],
                        condition.key,
                        if names.len() > 1 {
                            format!(" (other close matches: {})", names[1..].join(", "))
                        } else {
                            String::new()
                        }
                    ));
                }
                similar.into_iter().next()
            }
        };

        let (Some((source, key_name)), Some(value)) = (effective, condition.value.as_deref())
        else {
            continue;
        };

        let key = profile_key(source, key_name);
        if !value_profiles.contains_key(&key) {
            let profile = profile_value(storage, schema, key_name, source).await;
            value_profiles.insert(key.clone(), profile);
        }
        let Some(profile) = value_profiles.get(&key) else {
            continue;
        };
        if profile.has_value(value) {
            continue;
        }

        let top_values = quote_all(
            profile
                .value_samples
                .iter()
                .take(MAX_REPORTED_VALUES)
                .map(|s| s.value.as_str()),
        );
        report.issues.push(format!(
            "Value '{value}' is never stored for `{key_name}`; stored values are: {}.",
            if top_values.is_empty() { "none".to_string() } else { top_values.clone() }
        ));

        let affirmative = profile.affirmative_values();
        if !affirmative.is_empty() {
            report.suggestions.push(format!(
                "`{key_name}` is boolean-like; its checked state is stored as {}. Use meta_value = '{}'.",
                quote_all(affirmative.iter().map(String::as_str)),
                affirmative[0]
            ));
        } else if !top_values.is_empty() {
            report.suggestions.push(format!(
                "Compare `{key_name}` with one of the stored values: {top_values}."
            ));
        }
    }

    info!(
        issues = report.issues.len(),
        suggestions = report.suggestions.len(),
        "Debug report built."
    );
    report
}

/// Renders a report as the user turn of the correction attempt.
pub fn render_evidence(report: &DebugReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "This query returned zero rows:\n{}\n", report.query);
    let _ = writeln!(out, "Issues found in the data:");
    for issue in &report.issues {
        let _ = writeln!(out, "- {issue}");
    }
    let _ = writeln!(out, "\nSuggestions:");
    for suggestion in &report.suggestions {
        let _ = writeln!(out, "- {suggestion}");
    }
    let _ = write!(
        out,
        "\nWrite a corrected query that answers the original question using only the attribute names and values listed above."
    );
    out
}
