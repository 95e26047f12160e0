// Explain Result Model
//
// Terminal record of an explain request. Fields are filled in pipeline order:
// parse flag, then explain flag, then the timestamp is stamped on build.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Extra detail the engine may include in an explanation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExplainDetail {
    EstimatedCost,
    ChangelogMode,
    JsonExecutionPlan,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExplainResult {
    pub sql: Option<String>,
    #[serde(rename = "type")]
    pub sql_type: String,
    pub parse_succeeded: bool,
    pub explain_succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub explain_time: DateTime<Utc>,
}

impl ExplainResult {
    pub fn builder() -> ExplainResultBuilder {
        ExplainResultBuilder::default()
    }

    /// True when both the parse and the explain stage succeeded
    pub fn is_success(&self) -> bool {
        self.parse_succeeded && self.explain_succeeded
    }
}

#[derive(Debug, Default)]
pub struct ExplainResultBuilder {
    sql: Option<String>,
    sql_type: Option<String>,
    parse_succeeded: bool,
    explain_succeeded: bool,
    explain: Option<String>,
    error: Option<String>,
}

impl ExplainResultBuilder {
    pub fn sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    pub fn sql_type(mut self, sql_type: impl Into<String>) -> Self {
        self.sql_type = Some(sql_type.into());
        self
    }

    pub fn parse_succeeded(mut self, parsed: bool) -> Self {
        self.parse_succeeded = parsed;
        self
    }

    pub fn explain_succeeded(mut self, explained: bool) -> Self {
        self.explain_succeeded = explained;
        self
    }

    pub fn explain(mut self, explain: impl Into<String>) -> Self {
        self.explain = Some(explain.into());
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Stamp the explain time and produce the terminal record
    ///
    /// A failed parse can never carry a successful explain, and a terminal
    /// record holds either an error or an explanation, never both.
    pub fn build(self) -> ExplainResult {
        let explain_succeeded = self.parse_succeeded && self.explain_succeeded;
        let (explain, error) = if explain_succeeded {
            let text = self.explain.filter(|text| !text.is_empty());
            match text {
                Some(text) => (Some(text), None),
                None => (
                    None,
                    Some(
                        self.error
                            .unwrap_or_else(|| "Engine returned an empty explanation".to_string()),
                    ),
                ),
            }
        } else {
            (
                None,
                Some(self.error.unwrap_or_else(|| "Explain failed".to_string())),
            )
        };

        ExplainResult {
            sql: self.sql,
            sql_type: self.sql_type.unwrap_or_default(),
            parse_succeeded: self.parse_succeeded,
            explain_succeeded: explain_succeeded && explain.is_some(),
            explain,
            error,
            explain_time: Utc::now(),
        }
    }
}
