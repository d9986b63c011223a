//! Unified error type for the query pipeline
//! Each variant is one failure mode a request can end in; `status_code` decides how it is framed over HTTP.
use thiserror::Error;

use crate::sql::statement::StatementKind;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Missing provider credentials/endpoints or store settings
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Empty or missing user query
    #[error("Query is required and must not be empty")]
    EmptyQuery,

    /// Generation provider unreachable or erroring
    #[error("SQL generation failed: {message}")]
    Generation { message: String },

    /// Validator rejected the statement and nobody could fix it
    #[error("Invalid SQL: {reason}")]
    Unrepairable { reason: String, suggestion: String },

    /// Statement does not match the restricted grammar of its kind
    #[error("Failed to parse {kind} statement: {message}")]
    Parse { kind: StatementKind, message: String },

    /// Row-store call failed
    #[error("operation failed: {message}")]
    Store { message: String },

    /// Leading keyword is not one of the four supported statement kinds
    #[error("Unsupported query type '{found}'. Allowed types: select, insert, update, delete")]
    UnsupportedStatement { found: String },

    #[error("Unsupported WHERE clause for {kind}: {clause}")]
    UnsupportedWhere { kind: StatementKind, clause: String },

    /// UPDATE/DELETE issued without a WHERE clause
    #[error("WHERE clause required for {kind} statements")]
    MissingWhere { kind: StatementKind },
}

impl PipelineError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    pub fn parse(kind: StatementKind, message: impl Into<String>) -> Self {
        Self::Parse {
            kind,
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// HTTP status the response envelope is sent with.
    ///
    /// Only empty input and unrepairable statements count as client errors; parse and
    /// shape failures are reported as 500 like every other execution failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::EmptyQuery | Self::Unrepairable { .. } => 400,
            _ => 500,
        }
    }
}

impl From<crate::storage::StoreError> for PipelineError {
    fn from(err: crate::storage::StoreError) -> Self {
        Self::store(err.to_string())
    }
}

/// Result type alias for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(PipelineError::EmptyQuery.status_code(), 400);
        assert_eq!(
            PipelineError::Unrepairable {
                reason: "bad".into(),
                suggestion: "DROP TABLE todos".into()
            }
            .status_code(),
            400
        );
        assert_eq!(PipelineError::configuration("missing key").status_code(), 500);
        assert_eq!(
            PipelineError::parse(StatementKind::Insert, "no VALUES").status_code(),
            500
        );
        assert_eq!(
            PipelineError::MissingWhere {
                kind: StatementKind::Delete
            }
            .status_code(),
            500
        );
    }

    #[test]
    fn test_messages() {
        let err = PipelineError::MissingWhere {
            kind: StatementKind::Delete,
        };
        assert!(err.to_string().contains("WHERE clause required"));

        let err = PipelineError::UnsupportedStatement {
            found: "drop".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'drop'"));
        assert!(msg.contains("select, insert, update, delete"));

        let err = PipelineError::store("connection reset");
        assert_eq!(err.to_string(), "operation failed: connection reset");
    }
}
