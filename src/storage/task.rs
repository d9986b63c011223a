//! Task record and the value types the row-store capability is expressed in

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned task identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the `todos` table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied on create; id and created_at are assigned by the store
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            completed: false,
        }
    }
}

/// Mutable columns of a task; `None` leaves the column untouched
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none()
    }
}

/// Row predicate understood by every store
#[derive(Clone, Debug, PartialEq)]
pub enum TaskFilter {
    Id(TaskId),
    TitleEquals(String),
    /// Case-insensitive substring match
    TitleContains(String),
    Completed(bool),
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Self::Id(id) => task.id == *id,
            Self::TitleEquals(title) => task.title == *title,
            Self::TitleContains(term) => task.title.to_lowercase().contains(&term.to_lowercase()),
            Self::Completed(completed) => task.completed == *completed,
        }
    }
}

impl fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id = {}", id),
            Self::TitleEquals(title) => write!(f, "title = '{}'", title),
            Self::TitleContains(term) => write!(f, "title contains '{}'", term),
            Self::Completed(completed) => write!(f, "completed = {}", completed),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// Parameters of a `list` call. Ordering is always by creation time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListQuery {
    pub order: SortOrder,
    pub filter: Option<TaskFilter>,
    pub limit: Option<usize>,
}

impl ListQuery {
    /// Every task, newest first
    pub fn newest_first() -> Self {
        Self::default()
    }

    pub fn filtered(filter: TaskFilter) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    /// The single earliest-created task
    pub fn oldest() -> Self {
        Self {
            order: SortOrder::Ascending,
            filter: None,
            limit: Some(1),
        }
    }
}
