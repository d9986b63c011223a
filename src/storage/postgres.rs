//! PostgreSQL task store over tokio-postgres

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio_postgres::{Client, NoTls, Row};

use super::store::{validate_title, StoreResult, TaskStore};
use super::task::{ListQuery, NewTask, SortOrder, Task, TaskFilter, TaskId, TaskPatch};

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS todos (
    id BIGSERIAL PRIMARY KEY,
    title TEXT NOT NULL,
    completed BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

const COLUMNS: &str = "id, title, completed, created_at";

/// Bound value of a single-predicate WHERE clause
enum FilterParam {
    Int(i64),
    Text(String),
    Bool(bool),
}

pub struct PostgresTaskStore {
    client: Client,
}

impl PostgresTaskStore {
    /// Connect, spawn the connection driver and make sure `todos` exists
    pub async fn connect(database_url: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(database_url, NoTls)
            .await
            .context("Failed to connect to PostgreSQL")?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "PostgreSQL connection error");
            }
        });

        client
            .execute(CREATE_TABLE_SQL, &[])
            .await
            .context("Failed to create todos table")?;

        tracing::info!("PostgreSQL task store ready");
        Ok(Self { client })
    }

    fn row_to_task(row: &Row) -> StoreResult<Task> {
        Ok(Task {
            id: TaskId(row.try_get("id")?),
            title: row.try_get("title")?,
            completed: row.try_get("completed")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// WHERE fragment for `filter`, bound at placeholder `$n`
fn filter_clause(filter: &TaskFilter, n: usize) -> (String, FilterParam) {
    match filter {
        TaskFilter::Id(id) => (format!("id = ${}", n), FilterParam::Int(id.0)),
        TaskFilter::TitleEquals(title) => {
            (format!("title = ${}", n), FilterParam::Text(title.clone()))
        }
        TaskFilter::TitleContains(term) => (
            format!("title ILIKE ${}", n),
            FilterParam::Text(format!("%{}%", escape_like(term))),
        ),
        TaskFilter::Completed(completed) => {
            (format!("completed = ${}", n), FilterParam::Bool(*completed))
        }
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    async fn create(&self, task: NewTask) -> StoreResult<Task> {
        validate_title(&task.title)?;
        let sql = format!(
            "INSERT INTO todos (title, completed) VALUES ($1, $2) RETURNING {}",
            COLUMNS
        );
        let row = self
            .client
            .query_one(sql.as_str(), &[&task.title, &task.completed])
            .await?;
        Self::row_to_task(&row)
    }

    async fn list(&self, query: &ListQuery) -> StoreResult<Vec<Task>> {
        let direction = match query.order {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        };

        let mut sql = format!("SELECT {} FROM todos", COLUMNS);
        let bound = query.filter.as_ref().map(|f| filter_clause(f, 1));
        if let Some((clause, _)) = &bound {
            sql.push_str(" WHERE ");
            sql.push_str(clause);
        }
        sql.push_str(&format!(
            " ORDER BY created_at {dir}, id {dir}",
            dir = direction
        ));
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let rows = match bound.as_ref().map(|(_, p)| p) {
            None => self.client.query(sql.as_str(), &[]).await?,
            Some(FilterParam::Int(v)) => self.client.query(sql.as_str(), &[v]).await?,
            Some(FilterParam::Text(v)) => self.client.query(sql.as_str(), &[v]).await?,
            Some(FilterParam::Bool(v)) => self.client.query(sql.as_str(), &[v]).await?,
        };
        rows.iter().map(Self::row_to_task).collect()
    }

    async fn update(&self, selector: &TaskFilter, patch: &TaskPatch) -> StoreResult<usize> {
        if let Some(title) = &patch.title {
            validate_title(title)?;
        }
        let (clause, param) = filter_clause(selector, 3);
        let sql = format!(
            "UPDATE todos SET title = COALESCE($1, title), completed = COALESCE($2, completed) WHERE {}",
            clause
        );
        let changed = match &param {
            FilterParam::Int(v) => {
                self.client
                    .execute(sql.as_str(), &[&patch.title, &patch.completed, v])
                    .await?
            }
            FilterParam::Text(v) => {
                self.client
                    .execute(sql.as_str(), &[&patch.title, &patch.completed, v])
                    .await?
            }
            FilterParam::Bool(v) => {
                self.client
                    .execute(sql.as_str(), &[&patch.title, &patch.completed, v])
                    .await?
            }
        };
        Ok(changed as usize)
    }

    async fn delete(&self, selector: &TaskFilter) -> StoreResult<usize> {
        let (clause, param) = filter_clause(selector, 1);
        let sql = format!("DELETE FROM todos WHERE {}", clause);
        let removed = match &param {
            FilterParam::Int(v) => self.client.execute(sql.as_str(), &[v]).await?,
            FilterParam::Text(v) => self.client.execute(sql.as_str(), &[v]).await?,
            FilterParam::Bool(v) => self.client.execute(sql.as_str(), &[v]).await?,
        };
        Ok(removed as usize)
    }

    fn name(&self) -> &str {
        "postgres"
    }
}
