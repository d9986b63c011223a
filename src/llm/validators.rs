//! SQL Validator - second-opinion check of a drafted statement
//!
//! The validation provider is asked for a JSON verdict. When it is unreachable or its
//! reply carries no decodable verdict, a local heuristic decides instead.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};

use super::provider::{CompletionProvider, CompletionRequest};
use super::sql_generator::TODOS_SCHEMA;
use crate::sql::repair::has_unquoted_insert_literal;
use crate::sql::{extract_sql, repair_statement};

/// Who produced a verdict
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictSource {
    Provider,
    Heuristic,
}

impl fmt::Display for VerdictSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider => f.write_str("provider"),
            Self::Heuristic => f.write_str("heuristic"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Verdict {
    pub valid: bool,
    pub reason: Option<String>,
    /// Corrected statement, already extracted and repaired
    pub suggestion: Option<String>,
    pub source: VerdictSource,
}

impl Verdict {
    fn heuristic(valid: bool, reason: Option<String>, suggestion: Option<String>) -> Self {
        Self {
            valid,
            reason,
            suggestion,
            source: VerdictSource::Heuristic,
        }
    }
}

/// Verdict as the provider writes it
#[derive(Deserialize)]
struct ProviderVerdict {
    valid: bool,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    suggestion: Option<String>,
}

fn dangerous_keywords() -> &'static [(Regex, &'static str)] {
    static RE: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RE.get_or_init(|| {
        [
            (r"(?i)\bdrop\b", "DROP"),
            (r"(?i)\balter\b", "ALTER"),
            (r"(?i)\btruncate\b", "TRUNCATE"),
        ]
        .iter()
        .map(|(p, label)| (Regex::new(p).expect("valid danger pattern"), *label))
        .collect()
    })
}

/// Mutations that are only dangerous without a WHERE clause
fn unqualified_mutations() -> &'static [(Regex, &'static str)] {
    static RE: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RE.get_or_init(|| {
        [
            (r"(?is)\bdelete\s+from\s+todos\b", "DELETE without WHERE"),
            (r"(?is)\bupdate\s+todos\s+set\b", "UPDATE without WHERE"),
        ]
        .iter()
        .map(|(p, label)| (Regex::new(p).expect("valid mutation pattern"), *label))
        .collect()
    })
}

fn where_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bwhere\b").expect("valid where pattern"))
}

fn quoted_literal() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'(?:[^']|'')*'").expect("valid literal pattern"))
}

/// Keywords are only looked for outside quoted text values
fn dangerous_operation(statement: &str) -> Option<&'static str> {
    let bare = quoted_literal().replace_all(statement, "''");
    if let Some((_, label)) = dangerous_keywords()
        .iter()
        .find(|(pattern, _)| pattern.is_match(&bare))
    {
        return Some(*label);
    }
    unqualified_mutations().iter().find_map(|(pattern, label)| {
        let head = pattern.find(&bare)?;
        (!where_keyword().is_match(&bare[head.end()..])).then_some(*label)
    })
}

/// Locate the first balanced `{...}` block, skipping braces inside JSON strings
pub fn find_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Decode a provider reply into a verdict; `None` when no usable JSON is present
pub fn decode_verdict(reply: &str, original_text: &str) -> Option<Verdict> {
    let block = find_json_object(reply)?;
    let raw: ProviderVerdict = match serde_json::from_str(block) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!(error = %e, "Validator JSON did not decode");
            return None;
        }
    };

    let suggestion = raw
        .suggestion
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
        .map(|s| repair_statement(&extract_sql(&s), original_text))
        .filter(|s| !s.is_empty());

    Some(Verdict {
        valid: raw.valid,
        reason: raw.reason.filter(|r| !r.trim().is_empty()),
        suggestion,
        source: VerdictSource::Provider,
    })
}

/// Local safety net used when the provider gives no verdict
pub fn heuristic_verdict(statement: &str, original_text: &str) -> Verdict {
    let statement = statement.trim();
    if statement.is_empty() {
        return Verdict::heuristic(false, Some("Empty SQL statement".to_string()), None);
    }

    if let Some(label) = dangerous_operation(statement) {
        return Verdict::heuristic(
            false,
            Some(format!("Dangerous operation detected: {}", label)),
            None,
        );
    }

    if has_unquoted_insert_literal(statement) {
        let repaired = repair_statement(statement, original_text);
        let suggestion = (repaired != statement).then_some(repaired);
        return Verdict::heuristic(
            false,
            Some("String literal in VALUES clause is not quoted".to_string()),
            suggestion,
        );
    }

    Verdict::heuristic(true, None, None)
}

/// Checks drafted statements with the validation provider
pub struct SqlValidator {
    provider: Arc<dyn CompletionProvider>,
}

impl SqlValidator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn provider(&self) -> &Arc<dyn CompletionProvider> {
        &self.provider
    }

    fn build_prompt(&self, original_text: &str, statement: &str) -> String {
        format!(
            r#"You review SQL written for a todo list application.

Schema:
{schema}

User request: {original}
Proposed SQL: {statement}

Check that the SQL does what the user asked, is safe (no DROP, ALTER or TRUNCATE, UPDATE and DELETE have a WHERE clause), only uses the schema above and quotes every text value.
Respond with a single JSON object and nothing else:
{{"valid": true or false, "reason": "short explanation", "suggestion": "corrected SQL or null"}}"#,
            schema = TODOS_SCHEMA,
            original = original_text,
            statement = statement,
        )
    }

    /// Never fails: provider errors and unusable replies fall back to [`heuristic_verdict`]
    pub async fn validate(&self, original_text: &str, statement: &str) -> Verdict {
        let request = CompletionRequest::new(self.build_prompt(original_text, statement))
            .with_temperature(0.0)
            .with_max_tokens(300)
            .json();

        match self.provider.complete(&request).await {
            Ok(reply) => match decode_verdict(&reply, original_text) {
                Some(verdict) => verdict,
                None => {
                    tracing::warn!(provider = self.provider.name(), "Validator reply had no JSON verdict, using heuristics");
                    heuristic_verdict(statement, original_text)
                }
            },
            Err(e) => {
                tracing::warn!(provider = self.provider.name(), error = %format!("{:#}", e), "Validation provider failed, using heuristics");
                heuristic_verdict(statement, original_text)
            }
        }
    }
}
