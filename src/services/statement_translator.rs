// Statement Translator
//
// Folds statements into job graphs or explanations. Every request shape is a
// single sequential pass over its statements: order decides which statement
// wins a short-circuit and in which order sinks are merged.

use std::sync::Arc;

use crate::models::{
    ExplainDetail, ExplainResult, JobStatement, ModifyOperation, Operation, ResultSet, SqlType,
};
use crate::services::engine::{ExecutionEngine, JobGraph, StatementParser};
use crate::services::error::StatementError;
use crate::services::properties::{SessionProperties, PIPELINE_NAME};
use crate::validation::{HandlingPolicy, RequestMode, StatementClassifier};

pub const SINGLE_ENTRY_EXPECTED: &str = "Only single statement per entry is supported.";
pub const SINGLE_EXPLAIN_EXPECTED: &str =
    "Unsupported SQL query! explain only accepts a single SQL statement.";
pub const SINGLE_GRAPH_EXPECTED: &str =
    "Unsupported SQL query! graph rendering only accepts a single SQL statement.";
pub const SINGLE_EXECUTE_EXPECTED: &str = "Unsupported SQL query! execute only accepts a single \
     SQL statement of type SELECT, INSERT, UPDATE, DELETE, MERGE, CREATE TABLE, DROP TABLE, \
     ALTER TABLE, CREATE VIEW, DROP VIEW, CREATE SCHEMA, DROP SCHEMA, SHOW, DESCRIBE, SET, \
     RESET, ADD JAR or ADD FILE.";

/// Type label of a combined statement-set explanation
const STATEMENT_SET_TYPE: SqlType = SqlType::Insert;

/// Prefix each line of a statement with its line number
pub fn add_line_numbers(sql: &str) -> String {
    sql.lines()
        .enumerate()
        .map(|(idx, line)| format!("{:<4}{}", idx + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct StatementTranslator<E: ExecutionEngine> {
    parser: Arc<dyn StatementParser>,
    engine: Arc<E>,
    properties: SessionProperties,
}

impl<E: ExecutionEngine> StatementTranslator<E> {
    pub fn new(
        parser: Arc<dyn StatementParser>,
        engine: Arc<E>,
        properties: SessionProperties,
    ) -> Self {
        Self {
            parser,
            engine,
            properties,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Parse text that must yield exactly one operation
    pub fn parse_single(&self, sql: &str, expected: &str) -> Result<Operation, StatementError> {
        let mut operations = self.parser.parse(sql)?;
        if operations.len() != 1 {
            return Err(StatementError::MultiStatement {
                statement: sql.to_string(),
                count: operations.len(),
                expected: expected.to_string(),
            });
        }
        Ok(operations.remove(0))
    }

    /// Coerce the operations of an execute-batch into modifications
    ///
    /// Skipped statements (CTAS, RTAS, non-sink-modifying) are never parsed.
    /// Queries are wrapped into collect modifications; definitions and custom
    /// operations are dropped with a notice.
    pub fn batch_modifications(
        &self,
        statements: &[JobStatement],
    ) -> Result<Vec<ModifyOperation>, StatementError> {
        let eligible = StatementClassifier::retain_eligible(statements, RequestMode::ExecuteBatch);
        tracing::debug!(
            "{} of {} statement(s) eligible for execution",
            eligible.len(),
            statements.len()
        );

        let mut modifications = Vec::new();
        for (position, statement) in eligible {
            if statement.sql_type() == SqlType::Unknown {
                tracing::warn!(
                    "Statement #{} has an unknown declared type, translating it anyway",
                    position + 1
                );
            }

            let operation = self
                .parse_single(statement.statement(), SINGLE_ENTRY_EXPECTED)
                .map_err(|e| e.at_position(position))?;

            match operation {
                Operation::Modify(modify) => modifications.push(modify),
                Operation::Query(query) => modifications.push(ModifyOperation::collect(query)),
                Operation::Definition(_) | Operation::Custom(_) => {
                    tracing::info!(
                        "Only insert statement or select is supported now. The statement is skipped: {}",
                        operation.summary()
                    );
                }
            }
        }

        if modifications.is_empty() {
            return Err(StatementError::empty_batch(
                "Only insert statement or select is supported now. None operation to execute.",
            ));
        }

        Ok(modifications)
    }

    /// Translate all modifications in one engine call and annotate the job name
    pub async fn translate(
        &self,
        modifications: &[ModifyOperation],
    ) -> Result<JobGraph<E::Graph>, StatementError> {
        let graph = self.engine.translate(modifications).await?;
        let name = self.properties.get(PIPELINE_NAME).await;
        Ok(JobGraph::new(graph).with_name(name))
    }

    /// Execute-batch graph construction
    pub async fn batch_graph(
        &self,
        statements: &[JobStatement],
    ) -> Result<JobGraph<E::Graph>, StatementError> {
        let modifications = self.batch_modifications(statements)?;
        tracing::info!(
            "Translating {} modification(s) into one job graph",
            modifications.len()
        );
        self.translate(&modifications).await
    }

    /// Graph for a single statement; only modifications are translated
    pub async fn statement_graph(&self, sql: &str) -> Result<JobGraph<E::Graph>, StatementError> {
        let operation = self.parse_single(sql, SINGLE_GRAPH_EXPECTED)?;
        let modifications: Vec<ModifyOperation> = match operation {
            Operation::Modify(modify) => vec![modify],
            _ => Vec::new(),
        };
        if modifications.is_empty() {
            return Err(StatementError::empty_batch(
                "Only insert statements can be rendered as a job graph.",
            ));
        }
        self.translate(&modifications).await
    }

    /// Default (non-intercepted) execution path for a single operation
    pub async fn execute_operation(
        &self,
        operation: Operation,
    ) -> Result<(ResultSet, Option<String>), StatementError> {
        let modification = match operation {
            Operation::Modify(modify) => modify,
            Operation::Query(query) => ModifyOperation::collect(query),
            Operation::Definition(definition) => {
                let result = self.engine.execute_definition(&definition).await?;
                return Ok((result, None));
            }
            Operation::Custom(custom) => {
                return Err(StatementError::UnsupportedStatementKind {
                    statement: custom.sql,
                    reason: format!(
                        "No handler accepted the {} operation and the engine cannot run it.",
                        custom.kind.to_uppercase()
                    ),
                });
            }
        };

        let graph = self.translate(std::slice::from_ref(&modification)).await?;
        let job_name = graph.name().map(str::to_string);
        let result = self.engine.run(graph).await?;
        Ok((result, job_name))
    }

    /// Explain a statement set as one combined explanation
    ///
    /// A CTAS/RTAS anywhere in the set rejects the whole set before anything
    /// is parsed. The first statement that fails to parse ends the request.
    pub async fn explain_batch(
        &self,
        statements: &[JobStatement],
        details: &[ExplainDetail],
    ) -> Result<ExplainResult, StatementError> {
        for statement in statements {
            if let HandlingPolicy::RejectUnsupported { reason } =
                StatementClassifier::classify(statement, RequestMode::ExplainBatch)
            {
                return Ok(ExplainResult::builder()
                    .sql(statement.statement())
                    .sql_type(statement.sql_type().label())
                    .parse_succeeded(false)
                    .explain_succeeded(false)
                    .error(reason)
                    .build());
            }
        }

        let mut operations = Vec::new();
        for (position, statement) in
            StatementClassifier::retain_eligible(statements, RequestMode::ExplainBatch)
        {
            if statement.sql_type() == SqlType::Unknown {
                tracing::warn!(
                    "Statement #{} has an unknown declared type, explaining it anyway",
                    position + 1
                );
            }

            match self.parser.parse(statement.statement()) {
                Ok(parsed) => operations.extend(parsed),
                Err(e) => {
                    let error = format!(
                        "Exception in explaining SQL:\n{}\n{}",
                        add_line_numbers(statement.statement()),
                        e.at_position(position)
                    );
                    tracing::error!("{}", error);
                    return Ok(ExplainResult::builder()
                        .sql(statement.statement())
                        .sql_type(STATEMENT_SET_TYPE.label())
                        .parse_succeeded(false)
                        .explain_succeeded(false)
                        .error(error)
                        .build());
                }
            }
        }

        if operations.is_empty() {
            return Err(StatementError::empty_batch("None of the job in the statement set."));
        }

        let sql = statements
            .iter()
            .map(|s| s.statement().trim_end().trim_end_matches(';'))
            .collect::<Vec<_>>()
            .join(";\n");
        let builder = ExplainResult::builder()
            .sql(sql)
            .sql_type(STATEMENT_SET_TYPE.label())
            .parse_succeeded(true);

        Ok(match self.engine.explain(&operations, details).await {
            Ok(explain) => builder.explain_succeeded(true).explain(explain).build(),
            Err(e) => builder.explain_succeeded(false).error(e.to_string()).build(),
        })
    }

    /// Explain one statement
    ///
    /// Statement-content failures come back inside the record; only an arity
    /// violation is returned as an error.
    pub async fn explain_single(
        &self,
        sql: &str,
        details: &[ExplainDetail],
    ) -> Result<ExplainResult, StatementError> {
        let builder = ExplainResult::builder().sql(sql);
        let sql_type = SqlType::infer(sql);
        let policy = StatementClassifier::classify_type(sql_type, RequestMode::ExplainSingle);
        if sql_type == SqlType::Unknown {
            tracing::warn!("Explaining statement of unknown type: {}", sql);
        }
        tracing::debug!("Explaining {} statement with policy {:?}", sql_type.label(), policy);

        let operation = match self.parse_single(sql, SINGLE_EXPLAIN_EXPECTED) {
            Ok(operation) => operation,
            Err(e @ StatementError::MultiStatement { .. }) => return Err(e),
            Err(e) => {
                return Ok(builder
                    .sql_type(sql_type.label())
                    .parse_succeeded(false)
                    .explain_succeeded(false)
                    .error(e.to_string())
                    .build())
            }
        };

        let builder = builder.parse_succeeded(true);
        let builder = match &operation {
            Operation::Modify(_) => builder.sql_type("DML"),
            Operation::Query(_) => builder.sql_type("DQL"),
            // Extension statements explain themselves the same way DDL does
            Operation::Definition(_) | Operation::Custom(_) => {
                return Ok(builder
                    .sql_type("DDL")
                    .explain_succeeded(true)
                    .explain(operation.summary())
                    .build())
            }
        };

        Ok(
            match self
                .engine
                .explain(std::slice::from_ref(&operation), details)
                .await
            {
                Ok(explain) => builder.explain_succeeded(true).explain(explain).build(),
                Err(e) => builder.explain_succeeded(false).error(e.to_string()).build(),
            },
        )
    }
}
