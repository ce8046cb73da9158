//! # Context Builder
//!
//! Turns a schema snapshot and discovery results into the instruction
//! context for the generator. Output stays bounded: full column lists only
//! for a handful of core tables, capped attribute and value lists, and a
//! raw attribute-name dump only when discovery found nothing.

use crate::{
    constants::{
        CONTEXT_CORE_TABLES, MAX_CONTEXT_VALUE_SAMPLES, MAX_FALLBACK_ATTRIBUTES,
        MAX_SECONDARY_ATTRIBUTES, POST_META_SOURCE, USER_META_SOURCE,
    },
    prompts::core::QUERY_CONSTRUCTION_RULES,
    types::{profile_key, DiscoveredAttribute, Discovery, KeyRole, SchemaSnapshot, ValueProfiles},
};
use std::fmt::Write;

const MAX_CONTEXT_RELATIONSHIPS: usize = 3;

/// Builds the generation context.
///
/// `known_attributes` is only used when `discovery` is empty.
pub fn build_context(
    schema: &SchemaSnapshot,
    discovery: &Discovery,
    value_profiles: &ValueProfiles,
    search_terms: &[String],
    known_attributes: &[String],
) -> String {
    let mut out = String::new();
    let prefix = &schema.table_prefix;

    let _ = writeln!(out, "# Database");
    let _ = writeln!(
        out,
        "Database `{}`. Every table name starts with the prefix `{prefix}`.",
        schema.database_name
    );

    let _ = writeln!(out, "\n# Core Tables");
    for short_name in CONTEXT_CORE_TABLES {
        let Some(table) = schema.table(short_name) else {
            continue;
        };
        let _ = writeln!(out, "## {} ({} rows)", table.name, table.row_count);
        for column in &table.columns {
            let role = match column.key_role {
                KeyRole::Primary => " PRIMARY KEY",
                KeyRole::Indexed => " INDEXED",
                KeyRole::None => "",
            };
            let _ = writeln!(out, "- {} {}{role}", column.name, column.declared_type);
        }
    }

    if !schema.custom_table_names.is_empty() {
        let _ = writeln!(out, "\n# Other Tables");
        for name in &schema.custom_table_names {
            if let Some(table) = schema.tables.get(name) {
                let _ = writeln!(out, "- {name} ({} rows)", table.row_count);
            }
        }
    }

    let relationships: Vec<_> = schema
        .relationships
        .iter()
        .filter(|r| {
            let in_context = |table: &str| {
                CONTEXT_CORE_TABLES
                    .iter()
                    .any(|short| schema.prefixed(short) == table)
            };
            in_context(&r.from_table) && in_context(&r.to_table)
        })
        .take(MAX_CONTEXT_RELATIONSHIPS)
        .collect();
    if !relationships.is_empty() {
        let _ = writeln!(out, "\n# Relationships (inferred from column names)");
        for r in relationships {
            let _ = writeln!(
                out,
                "- {}.{} -> {}.{}",
                r.from_table, r.from_column, r.to_table, r.to_column
            );
        }
    }

    let _ = writeln!(out, "\n# Attribute Storage");
    let _ = writeln!(
        out,
        "User attributes are rows of `{prefix}usermeta` (user_id, meta_key, meta_value). Post attributes are rows of `{prefix}postmeta` (post_id, meta_key, meta_value)."
    );

    if discovery.is_empty() {
        if !known_attributes.is_empty() {
            let _ = writeln!(
                out,
                "\n# Known User Attribute Names\nNo attribute matched the question; these names exist:"
            );
            let names: Vec<&str> = known_attributes
                .iter()
                .take(MAX_FALLBACK_ATTRIBUTES)
                .map(String::as_str)
                .collect();
            let _ = writeln!(out, "{}", names.join(", "));
        }
    } else {
        if !search_terms.is_empty() {
            let _ = writeln!(out, "\nSearch terms: {}", search_terms.join(", "));
        }
        if let Some(attributes) = discovery.get(USER_META_SOURCE) {
            let _ = writeln!(out, "\n# Discovered User Attributes ({prefix}usermeta)");
            write_attributes(&mut out, attributes.iter(), USER_META_SOURCE, value_profiles);
        }
        if let Some(attributes) = discovery.get(POST_META_SOURCE) {
            let _ = writeln!(out, "\n# Discovered Post Attributes ({prefix}postmeta)");
            write_attributes(
                &mut out,
                attributes.iter().take(MAX_SECONDARY_ATTRIBUTES),
                POST_META_SOURCE,
                value_profiles,
            );
        }
    }

    let _ = writeln!(out);
    out.push_str(&QUERY_CONSTRUCTION_RULES.replace("{prefix}", prefix));
    out
}

fn write_attributes<'a>(
    out: &mut String,
    attributes: impl Iterator<Item = &'a DiscoveredAttribute>,
    source: &str,
    value_profiles: &ValueProfiles,
) {
    for attribute in attributes {
        let _ = writeln!(
            out,
            "- `{}` ({} rows, matched \"{}\")",
            attribute.key_name, attribute.occurrence_count, attribute.matched_search_term
        );
        let Some(profile) = value_profiles.get(&profile_key(source, &attribute.key_name)) else {
            continue;
        };
        if !profile.value_samples.is_empty() {
            let samples: Vec<String> = profile
                .value_samples
                .iter()
                .take(MAX_CONTEXT_VALUE_SAMPLES)
                .map(|s| format!("'{}' ({})", s.value, s.count))
                .collect();
            let _ = writeln!(out, "  values: {}", samples.join(", "));
        }
        let affirmative = profile.affirmative_values();
        if !affirmative.is_empty() {
            let quoted: Vec<String> = affirmative.iter().map(|v| format!("'{v}'")).collect();
            let _ = writeln!(
                out,
                "  boolean-like: the checked state is stored as {}",
                quoted.join(" or ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TableInfo, ValueProfile, ValueSample};

    fn snapshot() -> SchemaSnapshot {
        let mut schema = SchemaSnapshot {
            database_name: "shop".to_string(),
            table_prefix: "wp_".to_string(),
            ..Default::default()
        };
        for name in ["wp_users", "wp_usermeta"] {
            schema.tables.insert(
                name.to_string(),
                TableInfo {
                    name: name.to_string(),
                    columns: Vec::new(),
                    primary_key: None,
                    indexes: Vec::new(),
                    row_count: 3,
                    engine: "SQLite".to_string(),
                    charset: "UTF-8".to_string(),
                    sample_row: None,
                },
            );
            schema.core_table_names.insert(name.to_string());
        }
        schema
    }

    #[test]
    fn falls_back_to_known_attribute_names() {
        let known: Vec<String> = (0..150).map(|i| format!("key_{i}")).collect();
        let context = build_context(&snapshot(), &Discovery::new(), &ValueProfiles::new(), &[], &known);
        assert!(context.contains("key_99"));
        assert!(!context.contains("key_100"));
        assert!(context.contains("# Query Construction Rules"));
    }

    #[test]
    fn lists_discovered_values_and_affirmative_hint() {
        let mut discovery = Discovery::new();
        discovery.insert(
            USER_META_SOURCE.to_string(),
            vec![DiscoveredAttribute {
                key_name: "iar_license_status".to_string(),
                occurrence_count: 4,
                matched_search_term: "license".to_string(),
            }],
        );
        let mut profiles = ValueProfiles::new();
        let mut profile = ValueProfile {
            key_name: "iar_license_status".to_string(),
            source_table: USER_META_SOURCE.to_string(),
            value_samples: vec![ValueSample {
                value: "on".to_string(),
                count: 3,
                length: 2,
            }],
            total_row_count: 4,
            non_empty_row_count: 3,
            ..Default::default()
        };
        profile
            .detected_patterns
            .insert("affirmative_encoding".to_string(), vec!["on".to_string()]);
        profiles.insert(profile_key(USER_META_SOURCE, "iar_license_status"), profile);

        let context = build_context(
            &snapshot(),
            &discovery,
            &profiles,
            &["license".to_string()],
            &[],
        );
        assert!(context.contains("`iar_license_status` (4 rows"));
        assert!(context.contains("'on' (3)"));
        assert!(context.contains("checked state is stored as 'on'"));
        assert!(!context.contains("# Known User Attribute Names"));
    }
}
