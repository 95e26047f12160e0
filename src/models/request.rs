// Statement Request Models
//
// Request bodies accepted by the REST surface. Statement-set entries may omit
// their declared type, in which case it is inferred from the statement text.

use serde::{Deserialize, Serialize};

use super::explain::ExplainDetail;
use super::statement::{JobStatement, SqlType};

/// Single statement request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementRequest {
    pub statement: String,

    /// Extra explain details (ignored by execute requests)
    #[serde(default)]
    pub details: Vec<ExplainDetail>,
}

impl StatementRequest {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            details: Vec::new(),
        }
    }
}

/// One entry of a statement-set request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementEntry {
    pub statement: String,

    /// Declared type; inferred from the text when absent
    #[serde(default)]
    pub sql_type: Option<SqlType>,
}

impl From<StatementEntry> for JobStatement {
    fn from(entry: StatementEntry) -> JobStatement {
        match entry.sql_type {
            Some(sql_type) => JobStatement::new(entry.statement, sql_type),
            None => JobStatement::inferred(entry.statement),
        }
    }
}

/// Statement-set request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementSetRequest {
    pub statements: Vec<StatementEntry>,

    #[serde(default)]
    pub details: Vec<ExplainDetail>,
}

impl StatementSetRequest {
    /// Validate the request
    pub fn validate(&self) -> Result<(), String> {
        if self.statements.is_empty() {
            return Err("Statement set cannot be empty".to_string());
        }
        if let Some(position) = self
            .statements
            .iter()
            .position(|entry| entry.statement.trim().is_empty())
        {
            return Err(format!("Statement #{} is empty", position + 1));
        }
        Ok(())
    }

    pub fn into_job_statements(self) -> Vec<JobStatement> {
        self.statements.into_iter().map(JobStatement::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_type_inference() {
        let request: StatementSetRequest = serde_json::from_value(serde_json::json!({
            "statements": [
                {"statement": "INSERT INTO a SELECT 1"},
                {"statement": "CREATE TABLE b AS SELECT 1", "sql_type": "INSERT"}
            ]
        }))
        .unwrap();

        assert!(request.validate().is_ok());
        let statements = request.into_job_statements();
        assert_eq!(statements[0].sql_type(), SqlType::Insert);
        // Declared metadata wins over inference
        assert_eq!(statements[1].sql_type(), SqlType::Insert);
    }

    #[test]
    fn test_validate_rejects_empty() {
        let request = StatementSetRequest {
            statements: vec![],
            details: vec![],
        };
        assert!(request.validate().is_err());

        let request = StatementSetRequest {
            statements: vec![StatementEntry {
                statement: "   ".to_string(),
                sql_type: None,
            }],
            details: vec![],
        };
        assert_eq!(request.validate().unwrap_err(), "Statement #1 is empty");
    }

    #[test]
    fn test_details_default_to_empty() {
        let request: StatementRequest =
            serde_json::from_str(r#"{"statement": "SELECT 1"}"#).unwrap();
        assert!(request.details.is_empty());
    }
}
