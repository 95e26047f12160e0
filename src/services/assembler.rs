// Result Assembler
//
// Normalizes what a dispatcher handler or the engine produced into the
// caller-visible shapes.

use futures::TryStreamExt;
use serde_json::Value as JsonValue;

use crate::models::{ResultEnvelope, ResultKind, ResultSet, ResultSource, Row};
use crate::services::dispatcher::HandlerResult;
use crate::services::engine::{ExecutionEngine, JobGraph};
use crate::services::error::StatementError;

pub struct ResultAssembler;

impl ResultAssembler {
    /// Materialize a handler result into an envelope
    ///
    /// Pulls every row into memory. Intended for interactive statements,
    /// not bulk exports.
    pub async fn from_handler(result: HandlerResult) -> Result<ResultEnvelope, StatementError> {
        let HandlerResult { kind, columns, rows } = result;
        let rows: Vec<Row> = rows.try_collect().await?;
        Ok(ResultEnvelope::new(kind, ResultSource::Dispatcher, columns, rows))
    }

    /// Wrap rows returned by the engine
    pub fn from_result_set(result: ResultSet, job_name: Option<String>) -> ResultEnvelope {
        let kind = if result.columns.is_empty() {
            ResultKind::Success
        } else {
            ResultKind::SuccessWithContent
        };
        ResultEnvelope::new(kind, ResultSource::Engine, result.columns, result.rows)
            .with_job_name(job_name)
    }

    /// Hand a graph to the engine for execution
    pub async fn execute_graph<E: ExecutionEngine>(
        engine: &E,
        graph: JobGraph<E::Graph>,
    ) -> Result<ResultEnvelope, StatementError> {
        let job_name = graph.name().map(str::to_string);
        let result = engine.run(graph).await?;
        Ok(Self::from_result_set(result, job_name))
    }

    /// Render a graph in display format; the graph is consumed and never run
    pub fn display_graph<E: ExecutionEngine>(engine: &E, graph: JobGraph<E::Graph>) -> JsonValue {
        engine.to_display_format(&graph)
    }
}
