//! Local repair of unquoted string literals in INSERT / UPDATE ... SET title statements
//!
//! The replacement literal is rebuilt from the user's own wording, never from the statement.

use regex::Regex;
use std::sync::OnceLock;

/// Verbs that already make a complete task title ("buy milk", "call mom")
const ACTION_VERBS: &[&str] = &["order", "buy", "call"];

fn unquoted_insert() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?is)^(\s*insert\s+into\s+todos\s*\([^)]*\)\s*values\s*\(\s*)([^'"\s,)][^,)]*?)(\s*(?:,[^)]*)?\)\s*;?\s*)$"#,
        )
        .expect("valid insert repair pattern")
    })
}

fn unquoted_update_title() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?is)^(\s*update\s+todos\s+set\s+title\s*=\s*)([^'"\s][^']*?)(\s+where\s+.*)?\s*;?\s*$"#,
        )
        .expect("valid update repair pattern")
    })
}

fn command_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:please\s+)?(?:create|add|new|make|insert)\s+(?:(?:a|an|new|another)\s+)*(?:(?:task|todo|to-do|item)s?\s+)?(?:for\s+me\s+)?(?:to\s+)?",
        )
        .expect("valid command prefix pattern")
    })
}

/// Task title implied by the user's own words.
///
/// Strips a leading "add/create/new/make/insert a task/todo/item [for me] [to]" phrase,
/// keeps the remainder when it starts with an action verb, otherwise prefers the part
/// after the first " to ", and capitalises the first letter.
pub fn extract_task_description(original: &str) -> String {
    let trimmed = original
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?'))
        .trim();
    let remainder = command_prefix().replace(trimmed, "");
    let remainder = remainder.trim();

    let first_word = remainder
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_lowercase();

    let description = if ACTION_VERBS.contains(&first_word.as_str()) {
        remainder
    } else if let Some(pos) = remainder.find(" to ") {
        &remainder[pos + " to ".len()..]
    } else {
        remainder
    };

    capitalize_first(description.trim())
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// True when the first VALUES argument of an INSERT is written without quotes
pub fn has_unquoted_insert_literal(statement: &str) -> bool {
    unquoted_insert().is_match(statement)
}

/// Rewrite the unquoted literal of an INSERT or `UPDATE todos SET title = ...`.
///
/// Anything that does not show the defect passes through unchanged.
pub fn repair_statement(statement: &str, original_text: &str) -> String {
    if let Some(caps) = unquoted_insert().captures(statement) {
        let description = extract_task_description(original_text);
        if description.is_empty() {
            return statement.to_string();
        }
        tracing::debug!(literal = &caps[2], %description, "Repairing unquoted INSERT literal");
        return format!("{}{}{}", &caps[1], quote_literal(&description), &caps[3]);
    }

    if let Some(caps) = unquoted_update_title().captures(statement) {
        let description = extract_task_description(original_text);
        if description.is_empty() {
            return statement.to_string();
        }
        tracing::debug!(literal = &caps[2], %description, "Repairing unquoted UPDATE title");
        let tail = caps.get(3).map_or("", |m| m.as_str());
        return format!("{}{}{}", &caps[1], quote_literal(&description), tail);
    }

    statement.to_string()
}
