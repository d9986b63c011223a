//! Row-store capability the pipeline depends on

use async_trait::async_trait;
use thiserror::Error;

use super::task::{ListQuery, NewTask, Task, TaskFilter, TaskPatch};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Record rejected before it reached the backend
    #[error("{0}")]
    InvalidRecord(String),

    /// Backend (driver, connection, query) failure
    #[error("{0}")]
    Backend(String),
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Narrow CRUD capability over the `todos` table.
///
/// Stores own id and timestamp assignment; callers never cache rows and re-read
/// through `list` after every mutation.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create(&self, task: NewTask) -> StoreResult<Task>;

    async fn list(&self, query: &ListQuery) -> StoreResult<Vec<Task>>;

    /// Apply `patch` to every row matching `selector`; returns the number of rows changed
    async fn update(&self, selector: &TaskFilter, patch: &TaskPatch) -> StoreResult<usize>;

    /// Remove every row matching `selector`; returns the number of rows removed
    async fn delete(&self, selector: &TaskFilter) -> StoreResult<usize>;

    /// Short backend name for logs and health output
    fn name(&self) -> &str;
}

pub(crate) fn validate_title(title: &str) -> StoreResult<()> {
    if title.trim().is_empty() {
        return Err(StoreError::InvalidRecord(
            "title must not be empty".to_string(),
        ));
    }
    Ok(())
}
