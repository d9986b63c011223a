//! Pipeline Orchestrator - runs one natural-language request end to end
//!
//! received -> preprocessed -> intent-classified -> sql-generated -> sql-validated
//! -> sql-executed -> responded. Every stage leaves milestones in the trace, and the
//! trace is returned on success and failure alike.

use serde::Serialize;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use super::intent::{classify_intent, Intent};
use super::preprocess::preprocess;
use super::trace::PipelineTrace;
use crate::error::{PipelineError, PipelineResult};
use crate::llm::{CompletionProvider, SqlGenerator, SqlValidator};
use crate::sql::{repair_statement, ExecutionOutcome, StatementExecutor};
use crate::storage::TaskStore;

/// Reachability of one configured provider
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProviderHealth {
    pub role: &'static str,
    pub name: String,
    pub reachable: bool,
}

/// Per-request record of what each stage produced
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryBundle {
    pub request_id: Uuid,
    pub original: String,
    pub preprocessed: Option<String>,
    pub intent: Option<Intent>,
    pub generated_sql: Option<String>,
    pub validated_sql: Option<String>,
}

impl QueryBundle {
    fn new(request_id: Uuid, original: &str) -> Self {
        Self {
            request_id,
            original: original.to_string(),
            ..Self::default()
        }
    }
}

/// Response envelope of `/api/query`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Statement that was executed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ExecutionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Best-effort statement surfaced when validation could not be satisfied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    pub milestones: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queries: Option<QueryBundle>,
    #[serde(skip)]
    pub status: u16,
}

impl QueryResponse {
    /// Failure answered before the pipeline runs (bad body, missing configuration)
    pub fn rejected(status: u16, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            sql: None,
            data: None,
            error: Some(error.into()),
            suggestion: None,
            milestones: Vec::new(),
            queries: None,
            status,
        }
    }

    pub fn failure(
        error: &PipelineError,
        milestones: Vec<String>,
        queries: Option<QueryBundle>,
    ) -> Self {
        let suggestion = match error {
            PipelineError::Unrepairable { suggestion, .. } => Some(suggestion.clone()),
            _ => None,
        };
        Self {
            success: false,
            message: None,
            sql: None,
            data: None,
            error: Some(error.to_string()),
            suggestion,
            milestones,
            queries,
            status: error.status_code(),
        }
    }
}

pub struct QueryPipeline {
    generator: SqlGenerator,
    validator: SqlValidator,
    executor: StatementExecutor,
}

impl QueryPipeline {
    pub fn new(
        generation: Arc<dyn CompletionProvider>,
        validation: Arc<dyn CompletionProvider>,
        store: Arc<dyn TaskStore>,
    ) -> Self {
        Self {
            generator: SqlGenerator::new(generation),
            validator: SqlValidator::new(validation),
            executor: StatementExecutor::new(store),
        }
    }

    /// Probe the generation and validation providers
    pub async fn provider_health(&self) -> Vec<ProviderHealth> {
        let providers = [
            ("generation", self.generator.provider()),
            ("validation", self.validator.provider()),
        ];
        let mut report = Vec::with_capacity(providers.len());
        for (role, provider) in providers {
            let reachable = match provider.health_check().await {
                Ok(reachable) => reachable,
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %format!("{:#}", e), "Provider health probe failed");
                    false
                }
            };
            report.push(ProviderHealth {
                role,
                name: provider.name().to_string(),
                reachable,
            });
        }
        report
    }

    /// Run one request. Never fails; errors come back inside the envelope.
    pub async fn run(&self, raw: &str) -> QueryResponse {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("query", request_id = %request_id);
        self.run_request(request_id, raw).instrument(span).await
    }

    async fn run_request(&self, request_id: Uuid, raw: &str) -> QueryResponse {
        let mut trace = PipelineTrace::new();
        let mut bundle = QueryBundle::new(request_id, raw);

        if raw.trim().is_empty() {
            trace.push("Rejected empty query");
            return QueryResponse::failure(
                &PipelineError::EmptyQuery,
                trace.into_milestones(),
                Some(bundle),
            );
        }

        match self.execute_stages(raw, &mut trace, &mut bundle).await {
            Ok((sql, outcome)) => {
                trace.push("Response ready");
                QueryResponse {
                    success: true,
                    message: Some(outcome.message.clone()),
                    sql: Some(sql),
                    data: Some(outcome),
                    error: None,
                    suggestion: None,
                    milestones: trace.into_milestones(),
                    queries: Some(bundle),
                    status: 200,
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "Query failed");
                trace.push(format!("Query failed: {}", err));
                QueryResponse::failure(&err, trace.into_milestones(), Some(bundle))
            }
        }
    }

    async fn execute_stages(
        &self,
        raw: &str,
        trace: &mut PipelineTrace,
        bundle: &mut QueryBundle,
    ) -> PipelineResult<(String, ExecutionOutcome)> {
        trace.push(format!("Received query: {}", raw.trim()));

        let cleaned = preprocess(raw);
        trace.push(format!("Preprocessed query: {}", cleaned));
        bundle.preprocessed = Some(cleaned.clone());

        let intent = classify_intent(&cleaned);
        trace.push(format!("Classified intent: {}", intent));
        bundle.intent = Some(intent);

        trace.push(format!(
            "Generating SQL with {}",
            self.generator.provider_name()
        ));
        let generated = self.generator.generate(raw, &cleaned, intent).await?;
        trace.push(format!("Generated SQL: {}", generated));
        bundle.generated_sql = Some(generated.clone());

        trace.push(format!(
            "Validating SQL with {}",
            self.validator.provider_name()
        ));
        let verdict = self.validator.validate(raw, &generated).await;
        let reason = verdict.reason.clone().unwrap_or_default();
        if verdict.valid {
            trace.push(format!("SQL approved ({})", verdict.source));
        } else {
            trace.push(format!("SQL rejected ({}): {}", verdict.source, reason));
        }

        let statement = match verdict.suggestion {
            Some(suggestion) => {
                trace.push(format!("Using validator suggestion: {}", suggestion));
                suggestion
            }
            None if !verdict.valid => {
                trace.push("Attempting local repair");
                let repaired = repair_statement(&generated, raw);
                if repaired == generated {
                    return Err(PipelineError::Unrepairable {
                        reason: if reason.is_empty() {
                            "statement failed validation".to_string()
                        } else {
                            reason
                        },
                        suggestion: generated,
                    });
                }
                trace.push(format!("Repaired SQL: {}", repaired));
                repaired
            }
            None => generated,
        };
        bundle.validated_sql = Some(statement.clone());

        trace.push(format!("Executing SQL: {}", statement));
        let outcome = self.executor.execute(&statement, trace).await?;
        trace.push(format!("Executed {}: {}", outcome.kind, outcome.message));
        Ok((statement, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionRequest;
    use crate::storage::InMemoryTaskStore;
    use async_trait::async_trait;

    struct Canned(&'static str);

    #[async_trait]
    impl CompletionProvider for Canned {
        async fn complete(&self, _request: &CompletionRequest) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    fn pipeline(generation: &'static str, validation: &'static str) -> QueryPipeline {
        QueryPipeline::new(
            Arc::new(Canned(generation)),
            Arc::new(Canned(validation)),
            Arc::new(InMemoryTaskStore::new()),
        )
    }

    #[tokio::test]
    async fn test_empty_query_only_records_rejection() {
        let response = pipeline("", "").run("   ").await;
        assert!(!response.success);
        assert_eq!(response.status, 400);
        assert_eq!(response.milestones, vec!["Rejected empty query".to_string()]);
    }

    #[tokio::test]
    async fn test_insert_round() {
        let response = pipeline(
            "INSERT INTO todos (title, completed) VALUES ('Buy milk', false);",
            r#"{"valid": true}"#,
        )
        .run("Add a task to buy milk")
        .await;
        assert!(response.success, "{:?}", response.error);
        assert_eq!(response.status, 200);
        let data = response.data.unwrap();
        assert_eq!(data.count, 1);
        assert_eq!(data.items[0].title, "Buy milk");

        let bundle = response.queries.unwrap();
        assert_eq!(bundle.intent, Some(Intent::Create));
        assert_eq!(bundle.preprocessed.as_deref(), Some("add a task to buy milk"));
        assert_eq!(
            bundle.validated_sql.as_deref(),
            Some("INSERT INTO todos (title, completed) VALUES ('Buy milk', false)")
        );
    }

    #[tokio::test]
    async fn test_validator_suggestion_wins() {
        let response = pipeline(
            "SELECT * FROM todos WHERE done = 1",
            r#"{"valid": false, "reason": "no column done", "suggestion": "SELECT * FROM todos WHERE completed = true;"}"#,
        )
        .run("show finished tasks")
        .await;
        assert!(response.success);
        assert_eq!(
            response.sql.as_deref(),
            Some("SELECT * FROM todos WHERE completed = true")
        );
    }

    #[tokio::test]
    async fn test_unrepairable_is_client_error() {
        let response = pipeline(
            "SELECT * FROM todos",
            r#"{"valid": false, "reason": "does not match the request"}"#,
        )
        .run("show tasks")
        .await;
        assert!(!response.success);
        assert_eq!(response.status, 400);
        assert_eq!(response.suggestion.as_deref(), Some("SELECT * FROM todos"));
        assert!(response.error.unwrap().contains("does not match the request"));
        assert!(response.milestones.last().unwrap().starts_with("Query failed"));
    }

    #[tokio::test]
    async fn test_execution_failure_keeps_trace() {
        let response = pipeline("DELETE FROM todos WHERE completed = true", r#"{"valid": true}"#)
            .run("remove finished tasks")
            .await;
        assert!(!response.success);
        assert_eq!(response.status, 500);
        assert!(response
            .milestones
            .iter()
            .any(|m| m.starts_with("Executing SQL")));
        let bundle = response.queries.unwrap();
        assert!(bundle.validated_sql.is_some());
    }
}
