use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::models::{
    ExplainDetail, ExplainResult, JobStatement, LineageEdge, ResultEnvelope, SqlType,
};
use crate::services::assembler::ResultAssembler;
use crate::services::dispatcher::OperationDispatcher;
use crate::services::engine::{ExecutionEngine, LineageAnalyzer, StatementParser};
use crate::services::error::StatementError;
use crate::services::properties::SessionProperties;
use crate::services::statement_translator::{StatementTranslator, SINGLE_EXECUTE_EXPECTED};
use crate::validation::{HandlingPolicy, RequestMode, StatementClassifier};

/// Entry point for every statement request shape
///
/// Each call is one sequential pipeline: classify, parse, then either
/// intercept through the dispatcher or translate through the engine.
pub struct StatementService<E: ExecutionEngine> {
    translator: StatementTranslator<E>,
    dispatcher: OperationDispatcher,
    lineage: Arc<dyn LineageAnalyzer>,
    properties: SessionProperties,
}

impl<E: ExecutionEngine> StatementService<E> {
    pub fn new(
        parser: Arc<dyn StatementParser>,
        engine: Arc<E>,
        lineage: Arc<dyn LineageAnalyzer>,
        dispatcher: OperationDispatcher,
        properties: SessionProperties,
    ) -> Self {
        Self {
            translator: StatementTranslator::new(parser, engine, properties.clone()),
            dispatcher,
            lineage,
            properties,
        }
    }

    /// Execute a single statement
    ///
    /// The dispatcher gets the first chance; when nothing intercepts, the
    /// operation takes the engine's translate/run path.
    pub async fn execute_sql(&self, sql: &str) -> Result<ResultEnvelope, StatementError> {
        let start_time = Instant::now();
        let sql_type = SqlType::infer(sql);
        let policy = StatementClassifier::classify_type(sql_type, RequestMode::ExecuteSingle);
        if sql_type == SqlType::Unknown {
            tracing::warn!("Executing statement of unknown type: {}", sql);
        }

        let operation = self.translator.parse_single(sql, SINGLE_EXECUTE_EXPECTED)?;

        if policy == HandlingPolicy::InterceptCandidate
            && self.dispatcher.has_handler(&operation.kind())
        {
            if let Some(result) = self.dispatcher.dispatch(&operation).await? {
                let envelope = ResultAssembler::from_handler(result).await?;
                tracing::info!(
                    "Statement intercepted by dispatcher in {}ms",
                    start_time.elapsed().as_millis()
                );
                return Ok(envelope);
            }
        }

        let (result, job_name) = self.translator.execute_operation(operation).await?;
        tracing::info!(
            "Statement executed by engine in {}ms, {} row(s)",
            start_time.elapsed().as_millis(),
            result.row_count()
        );
        Ok(ResultAssembler::from_result_set(result, job_name))
    }

    /// Execute a statement set as one merged job
    pub async fn execute_statement_set(
        &self,
        statements: &[JobStatement],
    ) -> Result<ResultEnvelope, StatementError> {
        tracing::info!("Executing statement set of {} statement(s)", statements.len());
        let graph = self.translator.batch_graph(statements).await?;
        ResultAssembler::execute_graph(self.translator.engine(), graph).await
    }

    /// Explain a single statement
    pub async fn explain_sql(
        &self,
        sql: &str,
        details: &[ExplainDetail],
    ) -> Result<ExplainResult, StatementError> {
        self.translator.explain_single(sql, details).await
    }

    /// Explain a statement set as one combined explanation
    pub async fn explain_statement_set(
        &self,
        statements: &[JobStatement],
        details: &[ExplainDetail],
    ) -> Result<ExplainResult, StatementError> {
        tracing::info!("Explaining statement set of {} statement(s)", statements.len());
        self.translator.explain_batch(statements, details).await
    }

    /// Display format of the graph a single insert would run
    pub async fn statement_graph(&self, sql: &str) -> Result<JsonValue, StatementError> {
        let graph = self.translator.statement_graph(sql).await?;
        Ok(ResultAssembler::display_graph(self.translator.engine(), graph))
    }

    /// Display format of the merged graph a statement set would run
    pub async fn job_plan(&self, statements: &[JobStatement]) -> Result<JsonValue, StatementError> {
        let graph = self.translator.batch_graph(statements).await?;
        Ok(ResultAssembler::display_graph(self.translator.engine(), graph))
    }

    pub fn lineage(&self, sql: &str) -> Result<Vec<LineageEdge>, StatementError> {
        self.lineage.analyze(sql)
    }

    /// Engine options merged with session properties; session values win
    pub async fn effective_configuration(&self) -> BTreeMap<String, String> {
        let mut configuration = self.translator.engine().effective_configuration();
        configuration.extend(self.properties.snapshot().await);
        configuration
    }
}
