//! Dispatches a validated statement to its handler and runs it against the task store

use serde::Serialize;
use std::sync::Arc;

use super::statement::{
    DeleteStatement, InsertStatement, RowTarget, SelectStatement, Statement, StatementKind,
    UpdateStatement,
};
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::trace::PipelineTrace;
use crate::storage::{ListQuery, NewTask, Task, TaskFilter, TaskStore};

/// What a handler hands back to the orchestrator
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExecutionOutcome {
    #[serde(skip)]
    pub kind: StatementKind,
    pub items: Vec<Task>,
    pub count: usize,
    pub message: String,
}

/// Runs statements against a [`TaskStore`].
///
/// Every mutation is followed by a fresh newest-first `list`, so callers always
/// see the collection as the store has it after the operation.
pub struct StatementExecutor {
    store: Arc<dyn TaskStore>,
}

impl StatementExecutor {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        sql: &str,
        trace: &mut PipelineTrace,
    ) -> PipelineResult<ExecutionOutcome> {
        let statement = Statement::parse(sql)?;
        let kind = statement.kind();
        trace.push(format!("Dispatching {} statement", kind));
        tracing::debug!(%kind, "Statement parsed");

        match statement {
            Statement::Select(select) => self.run_select(select, trace).await,
            Statement::Insert(insert) => self.run_insert(insert, trace).await,
            Statement::Update(update) => self.run_update(update, trace).await,
            Statement::Delete(delete) => self.run_delete(delete, trace).await,
        }
    }

    async fn current_tasks(&self) -> PipelineResult<Vec<Task>> {
        Ok(self.store.list(&ListQuery::newest_first()).await?)
    }

    async fn run_select(
        &self,
        select: SelectStatement,
        trace: &mut PipelineTrace,
    ) -> PipelineResult<ExecutionOutcome> {
        if let Some(clause) = &select.ignored_where {
            tracing::warn!(%clause, "Unrecognised SELECT WHERE clause, returning every task");
            trace.push(format!("WHERE clause ignored: {}", clause));
        }

        let query = match select.filter {
            Some(filter) => {
                trace.push(format!("Filtering tasks where {}", filter));
                ListQuery::filtered(filter)
            }
            None => ListQuery::newest_first(),
        };

        let items = self.store.list(&query).await?;
        let count = items.len();
        trace.push(format!("Fetched {} task(s)", count));
        Ok(ExecutionOutcome {
            kind: StatementKind::Select,
            message: format!("Found {} task(s)", count),
            items,
            count,
        })
    }

    async fn run_insert(
        &self,
        insert: InsertStatement,
        trace: &mut PipelineTrace,
    ) -> PipelineResult<ExecutionOutcome> {
        let created = self
            .store
            .create(NewTask {
                title: insert.title,
                completed: insert.completed,
            })
            .await?;
        trace.push(format!("Created task {} '{}'", created.id, created.title));

        let items = self.current_tasks().await?;
        Ok(ExecutionOutcome {
            kind: StatementKind::Insert,
            message: format!("Task '{}' created", created.title),
            count: items.len(),
            items,
        })
    }

    async fn run_update(
        &self,
        update: UpdateStatement,
        trace: &mut PipelineTrace,
    ) -> PipelineResult<ExecutionOutcome> {
        let selector = match update.target {
            RowTarget::Matching(filter) => filter,
            RowTarget::Oldest => {
                let oldest = self
                    .store
                    .list(&ListQuery::oldest())
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| PipelineError::store("no tasks to update"))?;
                trace.push(format!("Resolved earliest task to id {}", oldest.id));
                TaskFilter::Id(oldest.id)
            }
        };

        let changed = self.store.update(&selector, &update.patch).await?;
        trace.push(format!("Updated {} task(s) where {}", changed, selector));

        let items = self.current_tasks().await?;
        Ok(ExecutionOutcome {
            kind: StatementKind::Update,
            message: format!("Updated {} task(s)", changed),
            count: items.len(),
            items,
        })
    }

    async fn run_delete(
        &self,
        delete: DeleteStatement,
        trace: &mut PipelineTrace,
    ) -> PipelineResult<ExecutionOutcome> {
        let removed = self.store.delete(&delete.target).await?;
        trace.push(format!("Deleted {} task(s) where {}", removed, delete.target));

        let items = self.current_tasks().await?;
        Ok(ExecutionOutcome {
            kind: StatementKind::Delete,
            message: format!("Deleted {} task(s)", removed),
            count: items.len(),
            items,
        })
    }
}
