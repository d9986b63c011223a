//! In-process task store

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::store::{validate_title, StoreResult, TaskStore};
use super::task::{ListQuery, NewTask, SortOrder, Task, TaskFilter, TaskId, TaskPatch};

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    tasks: Vec<Task>,
}

/// Task store backed by a `Vec` behind an async lock.
///
/// Rows created within the same clock tick are ordered by id, so creation order is
/// always total.
#[derive(Default)]
pub struct InMemoryTaskStore {
    state: RwLock<MemoryState>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, task: NewTask) -> StoreResult<Task> {
        validate_title(&task.title)?;

        let mut state = self.state.write().await;
        state.next_id += 1;
        let record = Task {
            id: TaskId(state.next_id),
            title: task.title,
            completed: task.completed,
            created_at: Utc::now(),
        };
        state.tasks.push(record.clone());
        Ok(record)
    }

    async fn list(&self, query: &ListQuery) -> StoreResult<Vec<Task>> {
        let state = self.state.read().await;
        let mut tasks: Vec<Task> = state
            .tasks
            .iter()
            .filter(|t| query.filter.as_ref().map_or(true, |f| f.matches(t)))
            .cloned()
            .collect();

        tasks.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        if query.order == SortOrder::Descending {
            tasks.reverse();
        }
        if let Some(limit) = query.limit {
            tasks.truncate(limit);
        }
        Ok(tasks)
    }

    async fn update(&self, selector: &TaskFilter, patch: &TaskPatch) -> StoreResult<usize> {
        if let Some(title) = &patch.title {
            validate_title(title)?;
        }

        let mut state = self.state.write().await;
        let mut changed = 0;
        for task in state.tasks.iter_mut().filter(|t| selector.matches(t)) {
            if let Some(title) = &patch.title {
                task.title = title.clone();
            }
            if let Some(completed) = patch.completed {
                task.completed = completed;
            }
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete(&self, selector: &TaskFilter) -> StoreResult<usize> {
        let mut state = self.state.write().await;
        let before = state.tasks.len();
        state.tasks.retain(|t| !selector.matches(t));
        Ok(before - state.tasks.len())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
