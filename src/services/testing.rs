// Test doubles for the engine-facing traits
//
// `ScriptedParser` splits on ';' and classifies by leading keyword; any text
// containing "broken" fails to parse. `RecordingEngine` records every call so
// tests can assert on call counts and ordering, and can be told to fail its
// translate or explain calls.

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::models::{
    Column, CustomOperation, DefinitionOperation, ExplainDetail, ModifyOperation, Operation,
    QueryOperation, ResultSet,
};
use crate::services::engine::{ExecutionEngine, JobGraph, StatementParser};
use crate::services::error::StatementError;

#[derive(Default)]
pub struct ScriptedParser {
    parsed: Mutex<Vec<String>>,
}

impl ScriptedParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every text handed to `parse`, in call order
    pub fn parsed(&self) -> Vec<String> {
        self.parsed.lock().unwrap().clone()
    }
}

impl StatementParser for ScriptedParser {
    fn parse(&self, sql: &str) -> Result<Vec<Operation>, StatementError> {
        self.parsed.lock().unwrap().push(sql.to_string());
        if sql.contains("broken") {
            return Err(StatementError::parse(sql, "sql parse failed"));
        }

        Ok(sql
            .split(';')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                let upper = part.to_uppercase();
                if upper.starts_with("INSERT") {
                    Operation::Modify(ModifyOperation::Sink {
                        target: upper.split_whitespace().nth(2).map(str::to_lowercase),
                        sql: part.to_string(),
                    })
                } else if upper.starts_with("SELECT") {
                    Operation::Query(QueryOperation::new(part))
                } else if upper.starts_with("SET") {
                    Operation::Custom(CustomOperation {
                        kind: "set".to_string(),
                        payload: part[3..].trim().to_string(),
                        sql: part.to_string(),
                    })
                } else {
                    Operation::Definition(DefinitionOperation {
                        sql: part.to_string(),
                        summary: part.to_string(),
                    })
                }
            })
            .collect())
    }
}

#[derive(Default)]
pub struct RecordingEngine {
    translate_calls: Mutex<Vec<Vec<String>>>,
    explain_calls: Mutex<Vec<usize>>,
    definitions: Mutex<Vec<String>>,
    fail_translate: bool,
    fail_explain: bool,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records translate calls, then fails them
    pub fn failing_translate() -> Self {
        Self {
            fail_translate: true,
            ..Self::default()
        }
    }

    /// Records explain calls, then fails them
    pub fn failing_explain() -> Self {
        Self {
            fail_explain: true,
            ..Self::default()
        }
    }

    /// SQL of each modification per translate call; collects are prefixed with "collect:"
    pub fn translate_calls(&self) -> Vec<Vec<String>> {
        self.translate_calls.lock().unwrap().clone()
    }

    pub fn explain_calls(&self) -> usize {
        self.explain_calls.lock().unwrap().len()
    }

    /// Number of operations passed to the most recent explain call
    pub fn last_explained(&self) -> usize {
        self.explain_calls.lock().unwrap().last().copied().unwrap_or(0)
    }

    pub fn definitions(&self) -> Vec<String> {
        self.definitions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionEngine for RecordingEngine {
    type Graph = Vec<String>;

    async fn translate(
        &self,
        modifications: &[ModifyOperation],
    ) -> Result<Self::Graph, StatementError> {
        let plans: Vec<String> = modifications
            .iter()
            .map(|m| match m {
                ModifyOperation::Collect(query) => format!("collect:{}", query.sql),
                ModifyOperation::Sink { sql, .. } => sql.clone(),
            })
            .collect();
        self.translate_calls.lock().unwrap().push(plans.clone());
        if self.fail_translate {
            return Err(StatementError::translate(plans.join("; "), "planner rejected the graph"));
        }
        Ok(plans)
    }

    async fn run(&self, graph: JobGraph<Self::Graph>) -> Result<ResultSet, StatementError> {
        let rows = graph
            .into_inner()
            .into_iter()
            .map(|plan| vec![json!(plan)])
            .collect();
        Ok(ResultSet::new(vec![Column::new("plan", "Utf8")], rows))
    }

    async fn explain(
        &self,
        operations: &[Operation],
        _details: &[ExplainDetail],
    ) -> Result<String, StatementError> {
        self.explain_calls.lock().unwrap().push(operations.len());
        if self.fail_explain {
            return Err(StatementError::explain("operations", "planner rejected the plan"));
        }
        Ok(operations
            .iter()
            .map(|op| op.summary())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn to_display_format(&self, graph: &JobGraph<Self::Graph>) -> JsonValue {
        json!({ "name": graph.name(), "plans": graph.inner() })
    }

    async fn execute_definition(
        &self,
        definition: &DefinitionOperation,
    ) -> Result<ResultSet, StatementError> {
        self.definitions.lock().unwrap().push(definition.sql.clone());
        Ok(ResultSet::default())
    }

    fn effective_configuration(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("engine.name".to_string(), "recording".to_string())])
    }
}
