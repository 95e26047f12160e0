// Result Models
//
// `ResultSet` is what the engine hands back after running a job graph.
// `ResultEnvelope` is the uniform shape every execute request returns,
// whether the rows came from a dispatcher handler or from the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

pub type Row = Vec<JsonValue>;

/// Column description of a result schema
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Materialized rows returned by the execution engine
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultKind {
    /// Statement ran, nothing to show beyond "OK"
    Success,
    /// Statement ran and produced rows
    SuccessWithContent,
}

/// Where an envelope's rows were produced
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Dispatcher,
    Engine,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultEnvelope {
    /// Unique id of this execution
    pub id: String,
    pub kind: ResultKind,
    pub source: ResultSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub executed_at: DateTime<Utc>,
}

impl ResultEnvelope {
    pub fn new(
        kind: ResultKind,
        source: ResultSource,
        columns: Vec<Column>,
        rows: Vec<Row>,
    ) -> Self {
        let row_count = rows.len();
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            source,
            job_name: None,
            columns,
            rows,
            row_count,
            executed_at: Utc::now(),
        }
    }

    pub fn with_job_name(mut self, job_name: Option<String>) -> Self {
        self.job_name = job_name;
        self
    }
}
