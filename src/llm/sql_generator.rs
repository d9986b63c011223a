//! SQL Generator - natural language to a draft statement via the generation provider

use std::sync::Arc;

use super::provider::{CompletionProvider, CompletionRequest};
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::intent::Intent;
use crate::sql::{extract_sql, repair_statement};

/// Schema text shown to both providers
pub const TODOS_SCHEMA: &str = "Table todos (\n  id SERIAL PRIMARY KEY,\n  title TEXT NOT NULL,\n  completed BOOLEAN NOT NULL DEFAULT FALSE,\n  created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()\n)";

const GENERATION_TEMPERATURE: f32 = 0.1;
const GENERATION_MAX_TOKENS: u32 = 200;

const WORKED_EXAMPLES: &[(&str, Intent, &str)] = &[
    (
        "add a task to buy milk",
        Intent::Create,
        "INSERT INTO todos (title, completed) VALUES ('Buy milk', false);",
    ),
    (
        "show all tasks",
        Intent::Read,
        "SELECT * FROM todos ORDER BY created_at DESC;",
    ),
    (
        "mark the first task as complete",
        Intent::Update,
        "UPDATE todos SET completed = true WHERE id = (SELECT id FROM todos ORDER BY created_at ASC LIMIT 1);",
    ),
    (
        "delete the task about milk",
        Intent::Delete,
        "DELETE FROM todos WHERE title LIKE '%milk%';",
    ),
];

/// Drafts one SQL statement per request using the generation provider
pub struct SqlGenerator {
    provider: Arc<dyn CompletionProvider>,
}

impl SqlGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn provider(&self) -> &Arc<dyn CompletionProvider> {
        &self.provider
    }

    /// Deterministic prompt for `cleaned` text and its intent
    pub fn build_prompt(&self, cleaned: &str, intent: Intent) -> String {
        let examples = WORKED_EXAMPLES
            .iter()
            .map(|(request, intent, sql)| {
                format!("Request: {}\nIntent: {}\nSQL: {}", request, intent, sql)
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            r#"Translate the request into exactly one PostgreSQL statement against this schema:

{schema}

Rules:
- Use only the todos table and its columns.
- Quote every text value with single quotes.
- UPDATE and DELETE must always have a WHERE clause.
- Answer with the SQL statement only, no explanation.

{examples}

Request: {request}
Intent: {intent}
SQL:"#,
            schema = TODOS_SCHEMA,
            examples = examples,
            request = cleaned,
            intent = intent,
        )
    }

    /// Ask the provider for a statement, then extract and repair it.
    ///
    /// A malformed reply still yields a string; only a failed provider call is an error.
    /// `original` is the user's unprocessed text, used to rebuild unquoted literals.
    pub async fn generate(
        &self,
        original: &str,
        cleaned: &str,
        intent: Intent,
    ) -> PipelineResult<String> {
        let request = CompletionRequest::new(self.build_prompt(cleaned, intent))
            .with_system("You write SQL for a todo list application.")
            .with_temperature(GENERATION_TEMPERATURE)
            .with_max_tokens(GENERATION_MAX_TOKENS);

        let reply = self
            .provider
            .complete(&request)
            .await
            .map_err(|e| PipelineError::generation(format!("{:#}", e)))?;
        tracing::debug!(provider = self.provider.name(), %reply, "Generation reply");

        let extracted = extract_sql(&reply);
        Ok(repair_statement(&extracted, original))
    }
}
