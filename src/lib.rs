//! # Todo SQL Engine
//!
//! Turns natural-language commands about a todo list into SQL against a single
//! `todos` table, checks the statement with a second model, repairs common defects
//! locally and executes it through a narrow task-store capability.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use todo_sql_engine::llm::OllamaClient;
//! use todo_sql_engine::storage::InMemoryTaskStore;
//! use todo_sql_engine::QueryPipeline;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let model = Arc::new(OllamaClient::new(None, None, Duration::from_secs(60))?);
//! let pipeline = QueryPipeline::new(model.clone(), model, Arc::new(InMemoryTaskStore::new()));
//!
//! let response = pipeline.run("add a task to buy milk").await;
//! println!("{}", response.sql.unwrap_or_default());
//! for milestone in &response.milestones {
//!     println!("  - {}", milestone);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Four statement shapes**: INSERT, SELECT, UPDATE and DELETE against `todos`, each
//!   with its own restricted grammar
//! - **Two providers**: one drafts the statement, the other reviews it; local heuristics
//!   take over when the reviewer is unavailable
//! - **Safety rails**: UPDATE and DELETE never run without a WHERE clause
//! - **Traceable**: every request returns its milestones and a query bundle

pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod sql;
pub mod storage;
pub mod web;

pub use config::AppConfig;
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{QueryPipeline, QueryResponse};
pub use storage::{InMemoryTaskStore, PostgresTaskStore, Task, TaskStore};
