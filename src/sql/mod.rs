//! Statement handling: extraction from model replies, local repair, parsing and execution

pub mod extractor;
pub mod repair;
pub mod statement;
pub mod executor;

pub use executor::{ExecutionOutcome, StatementExecutor};
pub use extractor::extract_sql;
pub use repair::{extract_task_description, repair_statement};
pub use statement::{Statement, StatementKind};
