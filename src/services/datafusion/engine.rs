// DataFusion execution engine
//
// Default `ExecutionEngine`: every modification becomes one logical plan on a
// shared SessionContext, and a job graph is the ordered list of those plans
// together with the statements they were planned from.

use async_trait::async_trait;
use datafusion::logical_expr::LogicalPlan;
use datafusion::physical_plan::displayable;
use datafusion::prelude::*;
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::models::{DefinitionOperation, ExplainDetail, ModifyOperation, Operation, ResultSet};
use crate::services::datafusion::converter::DataFusionResultConverter;
use crate::services::engine::{ExecutionEngine, JobGraph};
use crate::services::error::StatementError;

/// One planned modification of a job graph
#[derive(Debug)]
pub struct PlannedStatement {
    pub sql: String,
    pub plan: LogicalPlan,
}

impl PlannedStatement {
    /// Error context naming the statement's position in the graph and its text
    fn context(&self, index: usize) -> String {
        format!("statement #{} ({})", index + 1, self.sql)
    }
}

/// Executes statements on a single DataFusion session
///
/// Tables created through DDL are registered in the session's in-memory
/// catalog and stay visible to later statements.
pub struct DataFusionEngine {
    ctx: SessionContext,
}

impl DataFusionEngine {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Get the session context
    pub fn session_context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Plan SQL without executing it
    ///
    /// Unlike `SessionContext::sql`, this never runs DDL eagerly.
    async fn plan(&self, sql: &str) -> datafusion::error::Result<LogicalPlan> {
        self.ctx.state().create_logical_plan(sql).await
    }

    async fn execute_plan(
        &self,
        index: usize,
        planned: PlannedStatement,
    ) -> Result<ResultSet, StatementError> {
        let context = planned.context(index);
        let plan_schema = planned.plan.schema().inner().clone();
        let df = DataFrame::new(self.ctx.state(), planned.plan);
        let batches = df
            .collect()
            .await
            .map_err(|e| StatementError::execution(context, e))?;

        let schema = batches
            .first()
            .map(|batch| batch.schema())
            .unwrap_or(plan_schema);
        DataFusionResultConverter::convert(schema, &batches)
            .map_err(|e| StatementError::execution("result conversion", e))
    }

    async fn explain_operation(
        &self,
        operation: &Operation,
        details: &[ExplainDetail],
    ) -> Result<String, StatementError> {
        let plan = self
            .plan(operation.sql())
            .await
            .map_err(|e| StatementError::explain(operation.summary(), e))?;

        let mut sections = vec![format!("== Logical Plan ==\n{}", plan.display_indent())];

        for detail in details {
            let section = match detail {
                ExplainDetail::ChangelogMode => {
                    format!("== Logical Plan With Schema ==\n{}", plan.display_indent_schema())
                }
                ExplainDetail::JsonExecutionPlan => {
                    format!("== JSON Execution Plan ==\n{}", plan.display_pg_json())
                }
                ExplainDetail::EstimatedCost => {
                    let physical = self
                        .ctx
                        .state()
                        .create_physical_plan(&plan)
                        .await
                        .map_err(|e| StatementError::explain(operation.summary(), e))?;
                    format!(
                        "== Physical Plan With Statistics ==\n{}",
                        displayable(physical.as_ref())
                            .set_show_statistics(true)
                            .indent(true)
                    )
                }
            };
            sections.push(section);
        }

        Ok(sections.join("\n\n"))
    }
}

#[async_trait]
impl ExecutionEngine for DataFusionEngine {
    type Graph = Vec<PlannedStatement>;

    async fn translate(
        &self,
        modifications: &[ModifyOperation],
    ) -> Result<Self::Graph, StatementError> {
        let mut plans = Vec::with_capacity(modifications.len());
        for modification in modifications {
            let plan = self
                .plan(modification.sql())
                .await
                .map_err(|e| StatementError::translate(modification.sql(), e))?;
            plans.push(PlannedStatement {
                sql: modification.sql().to_string(),
                plan,
            });
        }
        Ok(plans)
    }

    async fn run(&self, graph: JobGraph<Self::Graph>) -> Result<ResultSet, StatementError> {
        let start_time = Instant::now();
        let name = graph.name().unwrap_or("unnamed").to_string();
        let mut combined: Option<ResultSet> = None;

        for (index, planned) in graph.into_inner().into_iter().enumerate() {
            let result = self.execute_plan(index, planned).await?;
            combined = Some(match combined {
                None => result,
                Some(mut acc) if acc.columns == result.columns => {
                    acc.rows.extend(result.rows);
                    acc
                }
                Some(acc) => {
                    return Err(StatementError::execution(
                        format!("job {}", name),
                        format!(
                            "plans produced incompatible results ({:?} vs {:?})",
                            acc.column_names(),
                            result.column_names()
                        ),
                    ))
                }
            });
        }

        tracing::info!(
            "Job {} finished in {}ms",
            name,
            start_time.elapsed().as_millis()
        );
        Ok(combined.unwrap_or_default())
    }

    async fn explain(
        &self,
        operations: &[Operation],
        details: &[ExplainDetail],
    ) -> Result<String, StatementError> {
        let mut output = Vec::with_capacity(operations.len());

        for (idx, operation) in operations.iter().enumerate() {
            let body = match operation {
                Operation::Query(_) | Operation::Modify(_) => {
                    self.explain_operation(operation, details).await?
                }
                Operation::Definition(_) | Operation::Custom(_) => operation.summary(),
            };
            output.push(format!("== Operation #{} ==\n{}", idx + 1, body));
        }

        Ok(output.join("\n\n"))
    }

    fn to_display_format(&self, graph: &JobGraph<Self::Graph>) -> JsonValue {
        let mut plans = Vec::with_capacity(graph.inner().len());
        for planned in graph.inner() {
            match serde_json::from_str::<JsonValue>(&planned.plan.display_pg_json().to_string()) {
                Ok(value) => plans.push(value),
                Err(e) => {
                    tracing::warn!("Job graph could not be rendered as JSON: {}", e);
                    return json!({});
                }
            }
        }

        json!({ "name": graph.name(), "plans": plans })
    }

    async fn execute_definition(
        &self,
        definition: &DefinitionOperation,
    ) -> Result<ResultSet, StatementError> {
        let df = self
            .ctx
            .sql(&definition.sql)
            .await
            .map_err(|e| StatementError::execution(definition.summary.clone(), e))?;
        let schema = df.schema().inner().clone();
        let batches = df
            .collect()
            .await
            .map_err(|e| StatementError::execution(definition.summary.clone(), e))?;

        DataFusionResultConverter::convert(schema, &batches)
            .map_err(|e| StatementError::execution("result conversion", e))
    }

    fn effective_configuration(&self) -> BTreeMap<String, String> {
        self.ctx
            .copied_config()
            .options()
            .entries()
            .into_iter()
            .map(|entry| (entry.key, entry.value.unwrap_or_default()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::datafusion::parser::SqlStatementParser;
    use crate::services::engine::StatementParser;

    fn engine() -> DataFusionEngine {
        DataFusionEngine::new(SessionContext::new())
    }

    fn modifications(sql: &str) -> Vec<ModifyOperation> {
        SqlStatementParser::generic()
            .parse(sql)
            .unwrap()
            .into_iter()
            .map(|op| match op {
                Operation::Modify(modify) => modify,
                Operation::Query(query) => ModifyOperation::collect(query),
                other => panic!("unexpected operation {:?}", other),
            })
            .collect()
    }

    async fn create_table(engine: &DataFusionEngine) {
        engine
            .execute_definition(&DefinitionOperation {
                sql: "CREATE TABLE t (a INT)".to_string(),
                summary: "CREATE TABLE t (a INT)".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_collect_select() {
        let engine = engine();
        let plans = engine.translate(&modifications("SELECT 1 AS num")).await.unwrap();
        let result = engine.run(JobGraph::new(plans)).await.unwrap();

        assert_eq!(result.column_names(), vec!["num"]);
        assert_eq!(result.rows, vec![vec![json!(1)]]);
    }

    #[tokio::test]
    async fn test_insert_then_select() {
        let engine = engine();
        create_table(&engine).await;

        let plans = engine
            .translate(&modifications("INSERT INTO t VALUES (1), (2); INSERT INTO t VALUES (3)"))
            .await
            .unwrap();
        assert_eq!(plans.len(), 2);
        let inserted = engine.run(JobGraph::new(plans)).await.unwrap();
        // One count row per sink write
        assert_eq!(inserted.row_count(), 2);

        let plans = engine
            .translate(&modifications("SELECT count(*) AS n FROM t"))
            .await
            .unwrap();
        let result = engine.run(JobGraph::new(plans)).await.unwrap();
        assert_eq!(result.rows, vec![vec![json!(3)]]);
    }

    #[tokio::test]
    async fn test_run_rejects_mismatched_results() {
        let engine = engine();
        let plans = engine
            .translate(&modifications("SELECT 1 AS a; SELECT 'x' AS b"))
            .await
            .unwrap();
        let err = engine.run(JobGraph::new(plans)).await.unwrap_err();
        assert!(matches!(err, StatementError::Execution { .. }));
    }

    #[tokio::test]
    async fn test_runtime_failure_names_the_statement() {
        let engine = engine();
        let plans = engine
            .translate(&modifications("SELECT 1 AS a; SELECT CAST('abc' AS INT) AS a"))
            .await
            .unwrap();
        match engine.run(JobGraph::new(plans)).await.unwrap_err() {
            StatementError::Execution { context, .. } => {
                assert!(context.contains("#2"));
                assert!(context.contains("'abc'"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_translate_unknown_table_fails() {
        let engine = engine();
        let err = engine
            .translate(&modifications("INSERT INTO missing VALUES (1)"))
            .await
            .unwrap_err();
        assert!(matches!(err, StatementError::Translate { .. }));
    }

    #[tokio::test]
    async fn test_explain_with_details() {
        let engine = engine();
        create_table(&engine).await;
        let operations = SqlStatementParser::generic()
            .parse("INSERT INTO t SELECT 1; CREATE VIEW v AS SELECT 1")
            .unwrap();

        let explain = engine
            .explain(&operations, &[ExplainDetail::EstimatedCost, ExplainDetail::ChangelogMode])
            .await
            .unwrap();
        assert!(explain.contains("== Operation #1 =="));
        assert!(explain.contains("== Logical Plan =="));
        assert!(explain.contains("== Physical Plan With Statistics =="));
        assert!(explain.contains("== Logical Plan With Schema =="));
        assert!(explain.contains("== Operation #2 ==\nCREATE VIEW v AS SELECT 1"));

        // Explaining never executes the view definition
        assert!(!engine.session_context().table_exist("v").unwrap());
    }

    #[tokio::test]
    async fn test_display_format() {
        let engine = engine();
        let plans = engine.translate(&modifications("SELECT 1")).await.unwrap();
        let graph = JobGraph::new(plans).with_name(Some("nightly".to_string()));

        let display = engine.to_display_format(&graph);
        assert_eq!(display["name"], "nightly");
        assert_eq!(display["plans"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_effective_configuration() {
        let configuration = engine().effective_configuration();
        assert!(configuration.contains_key("datafusion.execution.batch_size"));
    }
}
