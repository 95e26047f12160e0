use thiserror::Error;

/// Failures of the statement pipeline
///
/// Classification and filtering never produce one of these; they only come
/// out of parsing, arity checks, dispatch handlers and the engine.
#[derive(Debug, Error)]
pub enum StatementError {
    #[error("Failed to parse statement{}: {message}\n{statement}", position_suffix(.position))]
    Parse {
        position: Option<usize>,
        statement: String,
        message: String,
    },

    #[error("{expected} Got {count} operations from: {statement}")]
    MultiStatement {
        statement: String,
        count: usize,
        expected: String,
    },

    #[error("{reason}")]
    EmptyBatch { reason: String },

    #[error("{reason} Statement: {statement}")]
    UnsupportedStatementKind { statement: String, reason: String },

    #[error("Failed to translate {context}: {message}")]
    Translate { context: String, message: String },

    #[error("Failed to execute {context}: {message}")]
    Execution { context: String, message: String },

    #[error("Failed to explain {context}: {message}")]
    Explain { context: String, message: String },

    #[error("Handler for {kind} failed: {message}")]
    Handler { kind: String, message: String },
}

fn position_suffix(position: &Option<usize>) -> String {
    position
        .map(|p| format!(" #{}", p + 1))
        .unwrap_or_default()
}

impl StatementError {
    pub fn parse(statement: impl Into<String>, message: impl ToString) -> Self {
        StatementError::Parse {
            position: None,
            statement: statement.into(),
            message: message.to_string(),
        }
    }

    /// Attach the batch position of the offending statement
    pub fn at_position(self, index: usize) -> Self {
        match self {
            StatementError::Parse {
                statement, message, ..
            } => StatementError::Parse {
                position: Some(index),
                statement,
                message,
            },
            other => other,
        }
    }

    pub fn empty_batch(reason: impl Into<String>) -> Self {
        StatementError::EmptyBatch {
            reason: reason.into(),
        }
    }

    pub fn translate(context: impl Into<String>, err: impl ToString) -> Self {
        StatementError::Translate {
            context: context.into(),
            message: err.to_string(),
        }
    }

    pub fn execution(context: impl Into<String>, err: impl ToString) -> Self {
        StatementError::Execution {
            context: context.into(),
            message: err.to_string(),
        }
    }

    pub fn explain(context: impl Into<String>, err: impl ToString) -> Self {
        StatementError::Explain {
            context: context.into(),
            message: err.to_string(),
        }
    }

    pub fn handler(kind: impl Into<String>, err: impl ToString) -> Self {
        StatementError::Handler {
            kind: kind.into(),
            message: err.to_string(),
        }
    }

    /// Whether the failure was caused by the statement content rather than the engine
    pub fn is_statement_content_error(&self) -> bool {
        matches!(
            self,
            StatementError::Parse { .. }
                | StatementError::MultiStatement { .. }
                | StatementError::UnsupportedStatementKind { .. }
        )
    }
}
