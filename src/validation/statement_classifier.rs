use serde::Serialize;

use crate::models::{JobStatement, SqlType};

/// Shape of the request a statement is submitted with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    ExecuteBatch,
    ExplainBatch,
    ExecuteSingle,
    ExplainSingle,
}

/// How the pipeline treats a statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "policy", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HandlingPolicy {
    /// Never reaches the parser or translator
    Skip,
    /// Declared kind is disallowed in this engine version
    RejectUnsupported { reason: String },
    /// Offered to the dispatcher before the default path
    InterceptCandidate,
    /// Goes straight to the default translate path
    Translate,
}

/// Maps a statement's declared type to a handling policy
///
/// Pure function of (declared type, request mode): it never fails and never
/// looks at anything but its arguments. Unknown declared types fall through
/// to `Translate`; logging that is left to the caller.
pub struct StatementClassifier;

impl StatementClassifier {
    pub fn classify(statement: &JobStatement, mode: RequestMode) -> HandlingPolicy {
        Self::classify_type(statement.sql_type(), mode)
    }

    pub fn classify_type(sql_type: SqlType, mode: RequestMode) -> HandlingPolicy {
        if sql_type.is_table_as_select() {
            match mode {
                RequestMode::ExecuteBatch => return HandlingPolicy::Skip,
                RequestMode::ExplainBatch => {
                    return HandlingPolicy::RejectUnsupported {
                        reason: Self::unsupported_reason(sql_type),
                    }
                }
                _ => {}
            }
        }

        if sql_type == SqlType::Unknown {
            return HandlingPolicy::Translate;
        }

        if mode == RequestMode::ExecuteBatch && !sql_type.is_sink_modify() {
            return HandlingPolicy::Skip;
        }

        match mode {
            RequestMode::ExecuteSingle => HandlingPolicy::InterceptCandidate,
            _ => HandlingPolicy::Translate,
        }
    }

    /// Fixed human-readable reason for a rejected declared type
    pub fn unsupported_reason(sql_type: SqlType) -> String {
        format!("{} is not supported in this engine version.", sql_type.label())
    }

    /// Order-preserving filter of statements that survive classification
    ///
    /// Each survivor keeps its zero-based position in the original batch.
    pub fn retain_eligible(
        statements: &[JobStatement],
        mode: RequestMode,
    ) -> Vec<(usize, &JobStatement)> {
        statements
            .iter()
            .enumerate()
            .filter(|(_, statement)| Self::classify(statement, mode) != HandlingPolicy::Skip)
            .collect()
    }
}
